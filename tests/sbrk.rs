//! Smoke test against the real program break.
//!
//! Kept to a single growth: anything else in the process that calls
//! `brk`/`sbrk` between two growths would make the second one fail with
//! `BreakMoved`, which is correct behaviour but not what this test checks.

use rallocator::{Arena, ArenaConfig, FitPolicy, Sbrk};

#[test]
fn grows_the_program_break_and_reuses_blocks() {
  let mut arena = Arena::new(
    Sbrk,
    ArenaConfig {
      fit: FitPolicy::FirstFit,
      next_fit_wrap: false,
      report_at_exit: false,
    },
  );

  let data = arena.allocate(256) as *mut u32;
  assert!(!data.is_null());
  assert_eq!(data as usize % 4, 0);

  unsafe {
    for i in 0..64 {
      data.add(i).write(i as u32);
    }
    for i in 0..64 {
      assert_eq!(data.add(i).read(), i as u32);
    }
  }

  arena.deallocate(data as *mut u8).unwrap();
  assert_eq!(arena.allocate(100) as *mut u32, data);

  let stats = arena.stats();
  assert_eq!(stats.grows, 1);
  assert_eq!(stats.splits, 1);
  assert_eq!(stats.reuses, 1);
}
