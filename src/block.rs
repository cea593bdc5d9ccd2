use std::mem;

/// Arena-relative offset marking the end of the chain.
pub const NIL: u32 = u32::MAX;

/// Bytes occupied by a [`Block`] header in front of every data region.
pub const HEADER: usize = mem::size_of::<Block>();

/// Block header, stored in the arena directly in front of its data region.
///
/// `next` is an offset from the arena base rather than a pointer so that a
/// header can live at any 4-byte boundary and split remainders can be
/// addressed purely as positions inside memory the arena already owns.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
  pub size: u32,
  pub next: u32,
  pub free: bool,
  pub dirty: bool,
}

const _: () = assert!(HEADER % crate::align::GRANULE == 0);
const _: () = assert!(mem::align_of::<Block>() <= crate::align::GRANULE);

impl Block {
  pub fn new(size: u32) -> Self {
    Self {
      size,
      next: NIL,
      free: false,
      dirty: false,
    }
  }

  /// Offset of the data region belonging to the header at `offset`.
  pub fn data_offset(offset: u32) -> usize {
    offset as usize + HEADER
  }
}

/// Read-only view of a block, handed out by [`crate::Arena::blocks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  pub offset: u32,
  pub size: usize,
  pub free: bool,
  pub dirty: bool,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_header_layout() {
    assert_eq!(HEADER, 12);
    assert_eq!(mem::align_of::<Block>(), 4);
  }

  #[test]
  fn test_offsets() {
    let block = Block::new(100);

    assert_eq!(Block::data_offset(0), HEADER);
    assert_eq!(Block::data_offset(24), 24 + HEADER);
    assert!(!block.free);
    assert!(!block.dirty);
    assert_eq!(block.next, NIL);
  }
}
