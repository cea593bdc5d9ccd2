//! # rallocator - A Free-List Heap Allocator
//!
//! This crate provides a general-purpose allocator over a single arena
//! that grows through `sbrk`-style break extension. Freed blocks are kept
//! and handed out again; memory is never returned to the operating system.
//!
//! ## Overview
//!
//! Every block ever created sits in one chain, in address order, whether
//! it is busy or free:
//!
//! ```text
//!   Arena:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │   ┌────┬──────┬────┬────┬────┬────────────┬────┬──────┐             │
//!   │   │ H  │ busy │ H  │free│ H  │    busy    │ H  │ free │             │
//!   │   └────┴──────┴────┴────┴────┴────────────┴────┴──────┘             │
//!   │   ▲ head                                   ▲ tail      ▲            │
//!   │                                                        │            │
//!   │                                                 Program Break       │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `allocate(n)` rounds `n` up to 4 bytes and asks the fit policy for a free
//! block. An oversized hit is split and its tail becomes a new free block;
//! a miss grows the heap by one block. `deallocate(p)` marks the block free
//! and merges it with free neighbours.
//!
//! ## Crate Structure
//!
//! ```text
//!   rallocator
//!   ├── align      - Granule macros (align4!, align_to!)
//!   ├── block      - Block header layout
//!   ├── chain      - Address-ordered block chain
//!   ├── fit        - First, best, worst and next fit
//!   ├── heap       - Break sources (sbrk, fixed region) and heap growth
//!   ├── arena      - Arena: allocate / deallocate
//!   ├── stats      - Counters and the exit report
//!   ├── config     - ArenaConfig
//!   └── error      - ArenaError
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rallocator::{Arena, ArenaConfig, FitPolicy, FixedRegion};
//!
//! let config = ArenaConfig {
//!     report_at_exit: false,
//!     ..ArenaConfig::with_fit(FitPolicy::BestFit)
//! };
//! let mut arena = Arena::new(FixedRegion::new(4096), config);
//!
//! let ptr = arena.allocate(10) as *mut u16;
//! assert!(!ptr.is_null());
//!
//! unsafe { *ptr = 42 };
//! arena.deallocate(ptr as *mut u8).unwrap();
//!
//! assert_eq!(arena.stats().mallocs, 1);
//! assert_eq!(arena.stats().frees, 1);
//! ```
//!
//! Use [`Sbrk`] instead of [`FixedRegion`] to grow the real program break.
//!
//! ## Block Layout
//!
//! ```text
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │    Block Header       │         User Data              │
//!   │  ┌─────────────────┐  │                                │
//!   │  │ size: N         │  │  ┌──────────────────────────┐  │
//!   │  │ next: offset    │  │  │                          │  │
//!   │  │ free, dirty     │  │  │     N bytes usable       │  │
//!   │  └─────────────────┘  │  │                          │  │
//!   │      12 bytes         │  └──────────────────────────┘  │
//!   └───────────────────────┴────────────────────────────────┘
//!                           ▲
//!                           └── Pointer returned to user
//! ```
//!
//! ## Fit Policy
//!
//! The default policy is chosen at build time with one of the `first-fit`
//! (default), `best-fit`, `worst-fit` or `next-fit` features, and can be
//! overridden per arena through [`ArenaConfig`].
//!
//! ## Limitations
//!
//! - **Single-threaded only**: an arena has one owner and no locking
//! - **No shrinking**: freed memory stays in the arena
//! - **4-byte alignment**: nothing stronger is guaranteed
//! - **No reallocation**: blocks are never resized in place
//! - **4 GiB per arena**: block offsets are 32-bit
//!
//! ## Statistics
//!
//! Each arena counts mallocs, frees, reuses, grows, splits and coalesces.
//! Arenas with `report_at_exit` set also print the process-wide totals to
//! stdout when the process exits.

pub mod align;
mod arena;
mod block;
mod chain;
mod config;
mod error;
mod fit;
mod heap;
mod stats;

pub use arena::Arena;
pub use block::{BlockInfo, HEADER};
pub use config::ArenaConfig;
pub use error::ArenaError;
pub use fit::FitPolicy;
pub use heap::{BreakSource, FixedRegion, Sbrk};
pub use stats::{Statistics, exit_report_registered, process_totals};
