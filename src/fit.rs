//! Block selection policies.
//!
//! Every policy walks the chain looking for a free block of at least the
//! requested size; they differ in which candidate wins:
//!
//! | policy    | scans          | picks                                   |
//! |-----------|----------------|-----------------------------------------|
//! | first-fit | head → hit     | first candidate                         |
//! | best-fit  | whole chain    | smallest candidate, exact match stops   |
//! | worst-fit | whole chain    | largest surplus `size - request`        |
//! | next-fit  | cursor → hit   | first candidate after the last hit      |
//!
//! A miss is not an error: the arena falls back to growing the heap.

use std::{fmt, str::FromStr};

use crate::{
  block::{Block, NIL},
  chain::Chain,
  error::ArenaError,
};

/// Which free block satisfies a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitPolicy {
  FirstFit,
  BestFit,
  WorstFit,
  NextFit,
}

impl FitPolicy {
  pub const ALL: [FitPolicy; 4] = [
    FitPolicy::FirstFit,
    FitPolicy::BestFit,
    FitPolicy::WorstFit,
    FitPolicy::NextFit,
  ];

  pub fn name(&self) -> &'static str {
    match self {
      FitPolicy::FirstFit => "first-fit",
      FitPolicy::BestFit => "best-fit",
      FitPolicy::WorstFit => "worst-fit",
      FitPolicy::NextFit => "next-fit",
    }
  }
}

/// The policy picked at build time through the `*-fit` cargo features.
/// When several are enabled, next-fit beats worst-fit beats best-fit beats
/// first-fit.
impl Default for FitPolicy {
  fn default() -> Self {
    if cfg!(feature = "next-fit") {
      FitPolicy::NextFit
    } else if cfg!(feature = "worst-fit") {
      FitPolicy::WorstFit
    } else if cfg!(feature = "best-fit") {
      FitPolicy::BestFit
    } else {
      FitPolicy::FirstFit
    }
  }
}

impl fmt::Display for FitPolicy {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for FitPolicy {
  type Err = ArenaError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "first-fit" | "first" => Ok(FitPolicy::FirstFit),
      "best-fit" | "best" => Ok(FitPolicy::BestFit),
      "worst-fit" | "worst" => Ok(FitPolicy::WorstFit),
      "next-fit" | "next" => Ok(FitPolicy::NextFit),
      other => Err(ArenaError::Config(format!(
        "unknown fit policy '{other}'; expected 'first-fit', 'best-fit', 'worst-fit' or 'next-fit'"
      ))),
    }
  }
}

/// Outcome of one search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Search {
  pub found: Option<u32>,
  /// Blocks examined before the search stopped.
  pub scanned: usize,
}

fn fits(
  block: &Block,
  size: u32,
) -> bool {
  block.free && block.size >= size
}

/// A [`FitPolicy`] plus the state it carries between searches.
pub struct FitStrategy {
  policy: FitPolicy,
  wrap: bool,
  cursor: u32,
}

impl FitStrategy {
  /// `wrap` only affects next-fit: when set, a search that reaches the tail
  /// continues from the head up to where it started.
  pub fn new(
    policy: FitPolicy,
    wrap: bool,
  ) -> Self {
    Self {
      policy,
      wrap,
      cursor: NIL,
    }
  }

  pub fn policy(&self) -> FitPolicy {
    self.policy
  }

  /// Where the next next-fit search starts, if not at the head.
  pub fn cursor(&self) -> Option<u32> {
    (self.cursor != NIL).then_some(self.cursor)
  }

  pub fn find(
    &mut self,
    chain: &Chain,
    size: u32,
  ) -> Search {
    let search = match self.policy {
      FitPolicy::FirstFit => first_fit(chain, size),
      FitPolicy::BestFit => best_fit(chain, size),
      FitPolicy::WorstFit => worst_fit(chain, size),
      FitPolicy::NextFit => self.next_fit(chain, size),
    };

    tracing::trace!(
      policy = %self.policy,
      size,
      found = ?search.found,
      scanned = search.scanned,
      cursor = ?self.cursor(),
      "fit search"
    );

    search
  }

  /// Keeps the cursor on a live chain node when the block it points at is
  /// absorbed by `survivor`.
  pub(crate) fn merged(
    &mut self,
    absorbed: u32,
    survivor: u32,
  ) {
    if self.cursor == absorbed {
      self.cursor = survivor;
    }
  }

  fn next_fit(
    &mut self,
    chain: &Chain,
    size: u32,
  ) -> Search {
    let start = if self.cursor == NIL { chain.head() } else { self.cursor };

    let mut scanned = 0;
    let mut found = None;

    for offset in chain.iter_from(start) {
      scanned += 1;
      if fits(&chain.get(offset), size) {
        found = Some(offset);
        break;
      }
    }

    if found.is_none() && self.wrap && start != chain.head() {
      for offset in chain.iter().take_while(|&offset| offset != start) {
        scanned += 1;
        if fits(&chain.get(offset), size) {
          found = Some(offset);
          break;
        }
      }
    }

    // A miss leaves the search at the end of the chain, so the next one
    // starts over from the head.
    self.cursor = found.unwrap_or(NIL);

    Search { found, scanned }
  }
}

fn first_fit(
  chain: &Chain,
  size: u32,
) -> Search {
  let mut scanned = 0;

  for offset in chain.iter() {
    scanned += 1;
    if fits(&chain.get(offset), size) {
      return Search {
        found: Some(offset),
        scanned,
      };
    }
  }

  Search {
    found: None,
    scanned,
  }
}

fn best_fit(
  chain: &Chain,
  size: u32,
) -> Search {
  let mut scanned = 0;
  let mut best: Option<(u32, u32)> = None;

  for offset in chain.iter() {
    scanned += 1;

    let block = chain.get(offset);
    if !fits(&block, size) {
      continue;
    }

    if best.is_none_or(|(_, best_size)| block.size < best_size) {
      best = Some((offset, block.size));
      if block.size == size {
        break;
      }
    }
  }

  Search {
    found: best.map(|(offset, _)| offset),
    scanned,
  }
}

fn worst_fit(
  chain: &Chain,
  size: u32,
) -> Search {
  let mut scanned = 0;
  let mut worst: Option<(u32, u32)> = None;

  for offset in chain.iter() {
    scanned += 1;

    let block = chain.get(offset);
    if !block.free || block.size <= size {
      continue;
    }

    let surplus = block.size - size;
    if worst.is_none_or(|(_, best_surplus)| surplus > best_surplus) {
      worst = Some((offset, surplus));
    }
  }

  Search {
    found: worst.map(|(offset, _)| offset),
    scanned,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::chain::tests::build;

  #[test]
  fn test_parse_policy() {
    assert_eq!("first-fit".parse::<FitPolicy>().unwrap(), FitPolicy::FirstFit);
    assert_eq!("Best".parse::<FitPolicy>().unwrap(), FitPolicy::BestFit);
    assert_eq!("worst-fit".parse::<FitPolicy>().unwrap(), FitPolicy::WorstFit);
    assert_eq!("NEXT-FIT".parse::<FitPolicy>().unwrap(), FitPolicy::NextFit);
    assert!(matches!("buddy".parse::<FitPolicy>(), Err(ArenaError::Config(_))));

    for policy in FitPolicy::ALL {
      assert_eq!(policy.to_string().parse::<FitPolicy>().unwrap(), policy);
    }
  }

  #[test]
  #[cfg(not(any(feature = "best-fit", feature = "worst-fit", feature = "next-fit")))]
  fn test_default_policy() {
    assert_eq!(FitPolicy::default(), FitPolicy::FirstFit);
  }

  #[test]
  fn test_empty_chain_misses() {
    let mut memory = vec![0u32; 4];
    let (chain, _) = build(&mut memory, &[]);

    for policy in FitPolicy::ALL {
      let search = FitStrategy::new(policy, false).find(&chain, 4);
      assert_eq!(search, Search { found: None, scanned: 0 });
    }
  }

  #[test]
  fn test_first_fit() {
    let mut memory = vec![0u32; 128];
    let (chain, offsets) = build(
      &mut memory,
      &[(64, false), (8, true), (32, true), (16, true)],
    );

    let mut fit = FitStrategy::new(FitPolicy::FirstFit, false);
    assert_eq!(fit.find(&chain, 12), Search { found: Some(offsets[2]), scanned: 3 });
    assert_eq!(fit.find(&chain, 8).found, Some(offsets[1]));
    assert_eq!(fit.find(&chain, 36), Search { found: None, scanned: 4 });
  }

  #[test]
  fn test_best_fit_picks_smallest_candidate() {
    let mut memory = vec![0u32; 128];
    let (chain, offsets) = build(
      &mut memory,
      &[(12, true), (52, true), (4, true)],
    );

    let mut fit = FitStrategy::new(FitPolicy::BestFit, false);
    assert_eq!(fit.find(&chain, 8), Search { found: Some(offsets[0]), scanned: 3 });
  }

  #[test]
  fn test_best_fit_stops_on_exact_match() {
    let mut memory = vec![0u32; 128];
    let (chain, offsets) = build(
      &mut memory,
      &[(32, true), (16, true), (16, true), (20, true)],
    );

    let mut fit = FitStrategy::new(FitPolicy::BestFit, false);
    assert_eq!(fit.find(&chain, 16), Search { found: Some(offsets[1]), scanned: 2 });
  }

  #[test]
  fn test_best_fit_ties_keep_earliest() {
    let mut memory = vec![0u32; 128];
    let (chain, offsets) = build(
      &mut memory,
      &[(4, true), (24, true), (24, true)],
    );

    let mut fit = FitStrategy::new(FitPolicy::BestFit, false);
    assert_eq!(fit.find(&chain, 8).found, Some(offsets[1]));
  }

  #[test]
  fn test_worst_fit_maximizes_surplus() {
    let mut memory = vec![0u32; 512];
    let (chain, offsets) = build(
      &mut memory,
      &[(100, true), (400, false), (200, true), (200, true), (96, true)],
    );

    let mut fit = FitStrategy::new(FitPolicy::WorstFit, false);
    assert_eq!(fit.find(&chain, 96), Search { found: Some(offsets[2]), scanned: 5 });
  }

  #[test]
  fn test_worst_fit_needs_surplus() {
    let mut memory = vec![0u32; 64];
    let (chain, _) = build(&mut memory, &[(16, true), (16, true)]);

    let mut fit = FitStrategy::new(FitPolicy::WorstFit, false);
    assert_eq!(fit.find(&chain, 16).found, None);
  }

  #[test]
  fn test_next_fit_resumes_from_last_hit() {
    let mut memory = vec![0u32; 128];
    let (mut chain, offsets) = build(
      &mut memory,
      &[(16, true), (16, true), (16, true)],
    );

    let mut fit = FitStrategy::new(FitPolicy::NextFit, false);

    let first = fit.find(&chain, 16).found.unwrap();
    assert_eq!(first, offsets[0]);
    chain.get_mut(first).free = false;

    let second = fit.find(&chain, 16);
    assert_eq!(second, Search { found: Some(offsets[1]), scanned: 2 });
    assert_eq!(fit.cursor(), Some(offsets[1]));
    chain.get_mut(offsets[1]).free = false;

    // The head is free again but sits behind the cursor.
    chain.get_mut(first).free = true;
    assert_eq!(fit.find(&chain, 16).found, Some(offsets[2]));
  }

  #[test]
  fn test_next_fit_without_wrap_restarts_after_miss() {
    let mut memory = vec![0u32; 128];
    let (mut chain, offsets) = build(
      &mut memory,
      &[(16, true), (16, true), (16, false)],
    );

    let mut fit = FitStrategy::new(FitPolicy::NextFit, false);
    fit.find(&chain, 16);
    fit.find(&chain, 16);
    assert_eq!(fit.cursor(), Some(offsets[0]));

    chain.get_mut(offsets[0]).free = false;
    fit.find(&chain, 16);
    assert_eq!(fit.cursor(), Some(offsets[1]));

    // Only the head is free: the search runs off the tail and misses.
    chain.get_mut(offsets[0]).free = true;
    chain.get_mut(offsets[1]).free = false;
    assert_eq!(fit.find(&chain, 16), Search { found: None, scanned: 2 });
    assert_eq!(fit.cursor(), None);

    assert_eq!(fit.find(&chain, 16).found, Some(offsets[0]));
  }

  #[test]
  fn test_next_fit_with_wrap() {
    let mut memory = vec![0u32; 128];
    let (mut chain, offsets) = build(
      &mut memory,
      &[(16, true), (16, true), (16, false)],
    );

    let mut fit = FitStrategy::new(FitPolicy::NextFit, true);
    chain.get_mut(offsets[0]).free = false;
    assert_eq!(fit.find(&chain, 16).found, Some(offsets[1]));

    chain.get_mut(offsets[0]).free = true;
    chain.get_mut(offsets[1]).free = false;
    assert_eq!(fit.find(&chain, 16), Search { found: Some(offsets[0]), scanned: 3 });
  }

  #[test]
  fn test_cursor_follows_merge() {
    let mut memory = vec![0u32; 64];
    let (chain, offsets) = build(&mut memory, &[(16, true), (16, true)]);

    let mut fit = FitStrategy::new(FitPolicy::NextFit, false);
    let mut busy = chain;
    busy.get_mut(offsets[0]).free = false;
    fit.find(&busy, 16);
    assert_eq!(fit.cursor(), Some(offsets[1]));

    fit.merged(offsets[1], offsets[0]);
    assert_eq!(fit.cursor(), Some(offsets[0]));
  }
}
