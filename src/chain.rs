//! The block chain: every block the arena ever carved, linked in address
//! order.
//!
//! ```text
//!   base                                                         top
//!   ▼                                                              ▼
//!   ┌────────┬──────────┬────────┬──────┬────────┬────────────────┐
//!   │ hdr 0  │  data 0  │ hdr 1  │ data │ hdr 2  │     data 2     │
//!   └────────┴──────────┴────────┴──────┴────────┴────────────────┘
//!     │ next ───────────▶ │ next ────────▶ │ next = NIL
//! ```
//!
//! Growth always appends at `top`, so following `next` from `head` visits
//! blocks in increasing address order. Nodes leave the chain only by being
//! re-linked around during coalescing; their bytes stay in the arena.

use std::ptr::{self, NonNull};

use crate::block::{Block, HEADER, NIL};

pub struct Chain {
  base: *mut u8,
  top: usize,
  head: u32,
  tail: u32,
}

impl Chain {
  pub const fn new() -> Self {
    Self {
      base: ptr::null_mut(),
      top: 0,
      head: NIL,
      tail: NIL,
    }
  }

  pub fn head(&self) -> u32 {
    self.head
  }

  /// Start of the arena, or null before the first growth.
  pub fn base(&self) -> *mut u8 {
    self.base
  }

  /// Number of arena bytes covered by the chain.
  pub fn top(&self) -> usize {
    self.top
  }

  /// Address one past the last arena byte.
  pub fn end(&self) -> *mut u8 {
    self.base.wrapping_add(self.top)
  }

  /// Fixes the arena start. Called once, by the first growth.
  pub(crate) fn attach(
    &mut self,
    base: NonNull<u8>,
  ) {
    debug_assert!(self.base.is_null());
    self.base = base.as_ptr();
  }

  /// Accounts for `bytes` of freshly obtained memory at the top.
  pub(crate) fn extend_top(
    &mut self,
    bytes: usize,
  ) {
    self.top += bytes;
  }

  fn header(
    &self,
    offset: u32,
  ) -> *mut Block {
    debug_assert!(offset as usize + HEADER <= self.top);
    unsafe { self.base.add(offset as usize) as *mut Block }
  }

  /// Writes a header at `offset` without linking it.
  pub(crate) fn write(
    &mut self,
    offset: u32,
    block: Block,
  ) {
    unsafe { ptr::write(self.header(offset), block) }
  }

  pub fn get(
    &self,
    offset: u32,
  ) -> Block {
    unsafe { ptr::read(self.header(offset)) }
  }

  pub fn get_mut(
    &mut self,
    offset: u32,
  ) -> &mut Block {
    unsafe { &mut *self.header(offset) }
  }

  /// Pointer to the data region of the block at `offset`.
  pub fn data_ptr(
    &self,
    offset: u32,
  ) -> NonNull<u8> {
    unsafe { NonNull::new_unchecked(self.base.add(Block::data_offset(offset))) }
  }

  /// Maps a data pointer back to the offset its header would sit at.
  ///
  /// Only checks that the address falls inside the arena on a granule
  /// boundary. Whether a block actually lives there is [`Chain::contains`].
  pub fn offset_of(
    &self,
    data: *mut u8,
  ) -> Option<u32> {
    if self.base.is_null() {
      return None;
    }

    let addr = data as usize;
    let base = self.base as usize;

    if addr < base + HEADER || addr >= base + self.top {
      return None;
    }

    let offset = addr - base - HEADER;
    if offset % crate::align::GRANULE != 0 {
      return None;
    }

    u32::try_from(offset).ok()
  }

  /// Links the block at `offset` behind the current tail.
  pub fn append(
    &mut self,
    offset: u32,
  ) {
    self.get_mut(offset).next = NIL;

    if self.head == NIL {
      self.head = offset;
    } else {
      let tail = self.tail;
      self.get_mut(tail).next = offset;
    }

    self.tail = offset;
  }

  /// Splices the block at `offset` in directly behind `at`.
  pub fn insert_after(
    &mut self,
    at: u32,
    offset: u32,
  ) {
    let next = self.get(at).next;
    self.get_mut(offset).next = next;
    self.get_mut(at).next = offset;

    if self.tail == at {
      self.tail = offset;
    }
  }

  /// Unlinks the successor of `prev` and returns its offset.
  pub fn unlink_after(
    &mut self,
    prev: u32,
  ) -> u32 {
    let victim = self.get(prev).next;
    debug_assert_ne!(victim, NIL);

    let next = self.get(victim).next;
    self.get_mut(prev).next = next;

    if self.tail == victim {
      self.tail = prev;
    }

    victim
  }

  /// Linear scan for the block whose `next` is `offset`.
  pub fn predecessor_of(
    &self,
    offset: u32,
  ) -> Option<u32> {
    self.iter().find(|&current| self.get(current).next == offset)
  }

  pub fn contains(
    &self,
    offset: u32,
  ) -> bool {
    self.iter().any(|current| current == offset)
  }

  pub fn iter(&self) -> Offsets<'_> {
    self.iter_from(self.head)
  }

  pub fn iter_from(
    &self,
    start: u32,
  ) -> Offsets<'_> {
    Offsets {
      chain: self,
      current: start,
    }
  }
}

impl Default for Chain {
  fn default() -> Self {
    Self::new()
  }
}

/// Iterator over block offsets in chain order.
pub struct Offsets<'a> {
  chain: &'a Chain,
  current: u32,
}

impl Iterator for Offsets<'_> {
  type Item = u32;

  fn next(&mut self) -> Option<u32> {
    if self.current == NIL {
      return None;
    }

    let offset = self.current;
    self.current = self.chain.get(offset).next;
    Some(offset)
  }
}
