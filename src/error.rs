//! Error types for arena operations.

/// Errors reported by [`crate::Arena`].
///
/// [`crate::Arena::allocate`] folds every variant into a null return;
/// [`crate::Arena::try_allocate`] and [`crate::Arena::deallocate`] surface
/// them directly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArenaError {
  /// A zero-byte allocation was requested.
  #[error("cannot allocate zero bytes")]
  ZeroSize,

  /// The request cannot be described by a block header.
  #[error("requested {requested} bytes, more than a single block can hold")]
  SizeOverflow { requested: usize },

  /// The break source refused to extend the arena.
  #[error("break source denied {requested} more bytes")]
  OutOfMemory { requested: usize },

  /// The break moved between two growths, so the new memory is not
  /// contiguous with the arena.
  #[error("program break moved: expected extension at {expected:#x}, got {found:#x}")]
  BreakMoved { expected: usize, found: usize },

  /// The pointer was not handed out by this arena, or its block has since
  /// been merged into a neighbour.
  #[error("pointer {addr:#x} does not belong to a block of this arena")]
  ForeignPointer { addr: usize },

  /// The pointer refers to a block that is already free.
  #[error("double free of pointer {addr:#x}")]
  DoubleFree { addr: usize },

  /// An [`crate::ArenaConfig`] could not be parsed.
  #[error("invalid arena configuration: {0}")]
  Config(String),
}
