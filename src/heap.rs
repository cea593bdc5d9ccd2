//! Heap growth: where arena memory comes from.
//!
//! A [`BreakSource`] behaves like `sbrk(2)`: it has a current break and can
//! push it forward, handing back the old break as the start of the new
//! memory. [`HeapGrower`] turns each extension into a fresh block at the
//! tail of the chain.
//!
//! ```text
//!   before grow(n)                     after grow(n)
//!   ┌───────────────┐ ◄─ break         ┌───────────────┬────────┬─────────┐ ◄─ break
//!   │  arena blocks │                  │  arena blocks │ header │ n bytes │
//!   └───────────────┘                  └───────────────┴────────┴─────────┘
//! ```

use std::ptr::NonNull;

use libc::{c_void, intptr_t, sbrk};

use crate::{
  align::GRANULE,
  block::{Block, HEADER},
  chain::Chain,
  error::ArenaError,
};

/// A monotonic, contiguous supply of memory.
///
/// # Safety
///
/// When [`BreakSource::extend`] returns `Some(start)`, the `increment` bytes
/// at `start` must be valid for reads and writes, must not be used by
/// anything else, and must stay in place for as long as the source lives.
pub unsafe trait BreakSource {
  /// The current break, i.e. where the next extension should start.
  fn current(&mut self) -> *mut u8;

  /// Moves the break forward by `increment` bytes and returns the previous
  /// break, or `None` if the request is denied.
  fn extend(
    &mut self,
    increment: usize,
  ) -> Option<NonNull<u8>>;
}

/// The process data segment, extended with `sbrk(2)`.
///
/// Nothing else in the process may move the break while an arena built on
/// this source is growing; if it does, the next growth fails with
/// [`ArenaError::BreakMoved`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Sbrk;

unsafe impl BreakSource for Sbrk {
  fn current(&mut self) -> *mut u8 {
    unsafe { sbrk(0) as *mut u8 }
  }

  fn extend(
    &mut self,
    increment: usize,
  ) -> Option<NonNull<u8>> {
    let increment = intptr_t::try_from(increment).ok()?;
    let previous = unsafe { sbrk(increment) };

    if previous == usize::MAX as *mut c_void {
      return None;
    }

    NonNull::new(previous as *mut u8)
  }
}

/// A fixed-capacity region owned by the source, with a simulated break.
///
/// Extensions past the capacity are denied, which makes growth failure easy
/// to provoke and keeps arenas independent of the real program break.
pub struct FixedRegion {
  memory: NonNull<u32>,
  words: usize,
  brk: usize,
}

impl FixedRegion {
  /// Reserves `capacity` bytes, rounded up to the granule.
  pub fn new(capacity: usize) -> Self {
    let words = capacity.div_ceil(GRANULE);
    let memory: Box<[u32]> = vec![0; words].into_boxed_slice();
    let memory = NonNull::from(Box::leak(memory)).cast::<u32>();

    Self {
      memory,
      words,
      brk: 0,
    }
  }

  pub fn capacity(&self) -> usize {
    self.words * GRANULE
  }

  /// Bytes handed out so far.
  pub fn used(&self) -> usize {
    self.brk
  }
}

unsafe impl BreakSource for FixedRegion {
  fn current(&mut self) -> *mut u8 {
    unsafe { self.memory.cast::<u8>().as_ptr().add(self.brk) }
  }

  fn extend(
    &mut self,
    increment: usize,
  ) -> Option<NonNull<u8>> {
    if increment > self.capacity() - self.brk {
      return None;
    }

    let previous = self.current();
    self.brk += increment;
    NonNull::new(previous)
  }
}

impl Drop for FixedRegion {
  fn drop(&mut self) {
    let slice = std::ptr::slice_from_raw_parts_mut(self.memory.as_ptr(), self.words);
    drop(unsafe { Box::from_raw(slice) });
  }
}

/// Extends the arena through a [`BreakSource`] and formats each extension
/// as a new block.
pub struct HeapGrower<S> {
  source: S,
}

impl<S: BreakSource> HeapGrower<S> {
  pub fn new(source: S) -> Self {
    Self { source }
  }

  pub fn source(&self) -> &S {
    &self.source
  }

  /// Grows the arena by one block of `size` usable bytes and appends it to
  /// `chain`. Returns the new block's offset.
  ///
  /// On failure the chain is left untouched.
  pub fn grow(
    &mut self,
    chain: &mut Chain,
    size: u32,
  ) -> Result<u32, ArenaError> {
    let footprint = HEADER + size as usize;
    let requested = size as usize;

    let offset = chain.top();
    if offset + footprint > u32::MAX as usize {
      return Err(ArenaError::OutOfMemory { requested });
    }

    let expected = if chain.base().is_null() {
      self.align_break()?
    } else {
      chain.end()
    };

    let start = self.source.extend(footprint).ok_or_else(|| {
      tracing::debug!(requested, "break source denied growth");
      ArenaError::OutOfMemory { requested }
    })?;

    if start.as_ptr() != expected {
      tracing::debug!(
        expected = ?expected,
        found = ?start,
        "program break moved under the arena"
      );
      return Err(ArenaError::BreakMoved {
        expected: expected as usize,
        found: start.as_ptr() as usize,
      });
    }

    if chain.base().is_null() {
      chain.attach(start);
    }

    let offset = offset as u32;
    chain.extend_top(footprint);
    chain.write(offset, Block::new(size));
    chain.append(offset);

    tracing::debug!(offset, size, top = chain.top(), "grew heap");
    Ok(offset)
  }

  /// Pads the initial break up to the granule so that every header and data
  /// region in the arena is 4-byte aligned.
  fn align_break(&mut self) -> Result<*mut u8, ArenaError> {
    let start = self.source.current();
    let padding = start.align_offset(GRANULE);

    if padding == 0 {
      return Ok(start);
    }

    let found = self
      .source
      .extend(padding)
      .ok_or(ArenaError::OutOfMemory { requested: padding })?;

    if found.as_ptr() != start {
      return Err(ArenaError::BreakMoved {
        expected: start as usize,
        found: found.as_ptr() as usize,
      });
    }

    Ok(start.wrapping_add(padding))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::block::NIL;

  #[test]
  fn test_fixed_region_denies_past_capacity() {
    let mut region = FixedRegion::new(30);
    assert_eq!(region.capacity(), 32);

    let first = region.extend(16).unwrap();
    let second = region.extend(16).unwrap();
    assert_eq!(second.as_ptr(), first.as_ptr().wrapping_add(16));
    assert!(region.extend(4).is_none());
    assert_eq!(region.used(), 32);
  }

  #[test]
  fn test_grow_appends_in_address_order() {
    let mut grower = HeapGrower::new(FixedRegion::new(256));
    let mut chain = Chain::new();

    let a = grower.grow(&mut chain, 16).unwrap();
    let b = grower.grow(&mut chain, 8).unwrap();

    assert_eq!(a, 0);
    assert_eq!(b as usize, HEADER + 16);
    assert_eq!(chain.head(), a);
    assert_eq!(chain.iter().last().unwrap(), b);
    assert_eq!(chain.get(a).next, b);
    assert_eq!(chain.get(b).next, NIL);
    assert_eq!(chain.top(), 2 * HEADER + 24);
    assert_eq!(grower.source().used(), chain.top());

    let block = chain.get(b);
    assert_eq!(block.size, 8);
    assert!(!block.free);
    assert!(!block.dirty);
  }

  #[test]
  fn test_grow_failure_commits_nothing() {
    let mut grower = HeapGrower::new(FixedRegion::new(64));
    let mut chain = Chain::new();

    grower.grow(&mut chain, 16).unwrap();
    let err = grower.grow(&mut chain, 64).unwrap_err();

    assert_eq!(err, ArenaError::OutOfMemory { requested: 64 });
    assert_eq!(chain.iter().count(), 1);
    assert_eq!(chain.top(), HEADER + 16);
  }

  /// Hands out valid memory, but skips a granule before every second
  /// extension as if someone else had moved the break.
  struct Interloper {
    region: FixedRegion,
    calls: usize,
  }

  unsafe impl BreakSource for Interloper {
    fn current(&mut self) -> *mut u8 {
      self.region.current()
    }

    fn extend(
      &mut self,
      increment: usize,
    ) -> Option<NonNull<u8>> {
      self.calls += 1;
      if self.calls % 2 == 0 {
        self.region.extend(GRANULE)?;
      }
      self.region.extend(increment)
    }
  }

  #[test]
  fn test_grow_detects_moved_break() {
    let mut grower = HeapGrower::new(Interloper {
      region: FixedRegion::new(256),
      calls: 0,
    });
    let mut chain = Chain::new();

    grower.grow(&mut chain, 16).unwrap();
    let err = grower.grow(&mut chain, 16).unwrap_err();

    assert!(matches!(err, ArenaError::BreakMoved { expected, found } if found == expected + GRANULE));
    assert_eq!(chain.iter().count(), 1);
  }
}
