/// Smallest unit of arena memory. Every block capacity and every header
/// offset is a multiple of this.
pub const GRANULE: usize = 4;

/// Rounds `value` up to the next multiple of `alignment`, which must be a
/// power of two.
///
/// # Examples
///
/// ```rust
/// use rallocator::align_to;
///
/// assert_eq!(align_to!(13, 8), 16);
/// assert_eq!(align_to!(16, 8), 16);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $alignment:expr) => {
    ($value + $alignment - 1) & !($alignment - 1)
  };
}

/// Rounds `value` up to the allocator granule (4 bytes).
///
/// # Examples
///
/// ```rust
/// use rallocator::align4;
///
/// assert_eq!(align4!(1), 4);
/// assert_eq!(align4!(4), 4);
/// assert_eq!(align4!(5), 8);
/// ```
#[macro_export]
macro_rules! align4 {
  ($value:expr) => {
    $crate::align_to!($value, $crate::align::GRANULE)
  };
}
