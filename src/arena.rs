use std::ptr::{self, NonNull};

use crate::{
  align::GRANULE,
  align4,
  block::{Block, BlockInfo, HEADER, NIL},
  chain::Chain,
  config::ArenaConfig,
  error::ArenaError,
  fit::{FitPolicy, FitStrategy},
  heap::{BreakSource, HeapGrower},
  stats::{self, Recorder, Statistics},
};

/// Largest request whose block still fits a header's `u32` size field.
const MAX_REQUEST: usize = (u32::MAX as usize - HEADER) & !(GRANULE - 1);

/// A general-purpose allocator over one monotonically growing arena.
///
/// Freed blocks stay in the arena and are handed out again by the
/// configured [`FitPolicy`]; memory is never returned to the source.
/// The arena has a single owner: every operation takes `&mut self`.
pub struct Arena<S: BreakSource> {
  grower: HeapGrower<S>,
  chain: Chain,
  fit: FitStrategy,
  stats: Recorder,
}

impl<S: BreakSource> Arena<S> {
  pub fn new(
    source: S,
    config: ArenaConfig,
  ) -> Self {
    tracing::debug!(fit = %config.fit, wrap = config.next_fit_wrap, "arena created");

    Self {
      grower: HeapGrower::new(source),
      chain: Chain::new(),
      fit: FitStrategy::new(config.fit, config.next_fit_wrap),
      stats: Recorder::new(config.report_at_exit),
    }
  }

  pub fn with_policy(
    source: S,
    policy: FitPolicy,
  ) -> Self {
    Self::new(source, ArenaConfig::with_fit(policy))
  }

  pub fn policy(&self) -> FitPolicy {
    self.fit.policy()
  }

  pub fn stats(&self) -> Statistics {
    self.stats.snapshot()
  }

  pub fn source(&self) -> &S {
    self.grower.source()
  }

  /// Every block in the arena, in address order.
  pub fn blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
    self.chain.iter().map(|offset| {
      let block = self.chain.get(offset);
      BlockInfo {
        offset,
        size: block.size as usize,
        free: block.free,
        dirty: block.dirty,
      }
    })
  }

  /// Allocates at least `size` bytes, 4-byte aligned.
  ///
  /// Returns null for zero-sized requests and whenever the arena cannot
  /// grow. See [`Arena::try_allocate`] for the reason.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> *mut u8 {
    self
      .try_allocate(size)
      .map_or(ptr::null_mut(), NonNull::as_ptr)
  }

  pub fn try_allocate(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>, ArenaError> {
    if size == 0 {
      return Err(ArenaError::ZeroSize);
    }

    if size > MAX_REQUEST {
      return Err(ArenaError::SizeOverflow { requested: size });
    }
    let size = align4!(size) as u32;

    if self.stats.publishes() {
      stats::register_exit_report();
    }

    let search = self.fit.find(&self.chain, size);
    self.stats.update(|s| s.record_search(search.scanned));

    let offset = match search.found {
      Some(offset) => {
        self.split(offset, size);
        offset
      }
      None => {
        let offset = self.grower.grow(&mut self.chain, size)?;
        self.stats.update(|s| s.record_grow(size as usize));
        offset
      }
    };

    let block = self.chain.get_mut(offset);
    let reused = block.dirty;
    block.free = false;
    block.dirty = true;

    if reused {
      self.stats.update(Statistics::record_reuse);
    }
    self.stats.update(|s| s.record_malloc(size as usize));

    Ok(self.chain.data_ptr(offset))
  }

  /// Shrinks the block at `offset` to `size` and turns the tail of its
  /// capacity into a free block, when the tail can hold a header and at
  /// least one granule.
  fn split(
    &mut self,
    offset: u32,
    size: u32,
  ) {
    let capacity = self.chain.get(offset).size;
    if capacity as usize <= size as usize + HEADER {
      return;
    }

    let carved = offset + HEADER as u32 + size;
    let mut remainder = Block::new(capacity - size - HEADER as u32);
    remainder.free = true;

    self.chain.get_mut(offset).size = size;
    self.chain.write(carved, remainder);
    self.chain.insert_after(offset, carved);
    self.stats.update(Statistics::record_split);

    tracing::debug!(offset, size, remainder = remainder.size, "split block");
  }

  /// Returns the block behind `data` to the arena and merges it with free
  /// neighbours. Null is accepted and ignored.
  ///
  /// Pointers that do not lead to a live block of this arena are rejected
  /// without touching any state: [`ArenaError::DoubleFree`] when the block
  /// is already free, [`ArenaError::ForeignPointer`] when no block starts
  /// there. A block merged into its predecessor by an earlier free no
  /// longer exists, so freeing it again reports `ForeignPointer`.
  pub fn deallocate(
    &mut self,
    data: *mut u8,
  ) -> Result<(), ArenaError> {
    if data.is_null() {
      return Ok(());
    }

    let offset = self.locate(data)?;
    if self.chain.get(offset).free {
      tracing::debug!(addr = ?data, "rejected double free");
      return Err(ArenaError::DoubleFree { addr: data as usize });
    }

    self.chain.get_mut(offset).free = true;
    self.stats.update(Statistics::record_free);

    let next = self.chain.get(offset).next;
    if next != NIL && self.chain.get(next).free {
      self.absorb_next(offset);
    }

    if let Some(prev) = self.chain.predecessor_of(offset) {
      if self.chain.get(prev).free {
        self.absorb_next(prev);
      }
    }

    Ok(())
  }

  /// Merges the successor of `offset` into it, reclaiming its header.
  fn absorb_next(
    &mut self,
    offset: u32,
  ) {
    let absorbed = self.chain.unlink_after(offset);
    let gained = HEADER as u32 + self.chain.get(absorbed).size;

    self.chain.get_mut(offset).size += gained;
    self.fit.merged(absorbed, offset);
    self.stats.update(Statistics::record_coalesce);

    tracing::debug!(offset, absorbed, size = self.chain.get(offset).size, "coalesced blocks");
  }

  /// Usable capacity of the live allocation behind `data`.
  pub fn usable_size(
    &self,
    data: *mut u8,
  ) -> Option<usize> {
    let offset = self.locate(data).ok()?;
    let block = self.chain.get(offset);
    (!block.free).then_some(block.size as usize)
  }

  fn locate(
    &self,
    data: *mut u8,
  ) -> Result<u32, ArenaError> {
    self
      .chain
      .offset_of(data)
      .filter(|&offset| self.chain.contains(offset))
      .ok_or_else(|| {
        tracing::debug!(addr = ?data, "rejected pointer outside the chain");
        ArenaError::ForeignPointer { addr: data as usize }
      })
  }
}
