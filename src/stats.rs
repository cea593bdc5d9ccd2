//! Heap management counters and the exit-time report.
//!
//! Every [`crate::Arena`] keeps its own [`Statistics`]. Arenas configured
//! with `report_at_exit` additionally fold each update into process-wide
//! totals, which a hook registered through `atexit(3)` prints to stdout
//! when the process terminates normally:
//!
//! ```text
//! heap management statistics
//! mallocs:	3
//! frees:		1
//! reuses:		1
//! ...
//! ```

use std::io::{self, Write};
use std::sync::{Mutex, Once};

/// Monotonic counters describing an arena's history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct Statistics {
  /// Successful allocations.
  pub mallocs: usize,
  /// Successful deallocations.
  pub frees: usize,
  /// Allocations served by a block that had been handed out before.
  pub reuses: usize,
  /// Successful heap growths.
  pub grows: usize,
  pub splits: usize,
  pub coalesces: usize,
  /// Blocks examined by the most recent fit search.
  pub blocks: usize,
  /// Bytes requested across all allocations, after rounding to the granule.
  pub requested: usize,
  /// Largest single growth, in usable bytes.
  pub max_heap: usize,
}

impl Statistics {
  pub const fn new() -> Self {
    Self {
      mallocs: 0,
      frees: 0,
      reuses: 0,
      grows: 0,
      splits: 0,
      coalesces: 0,
      blocks: 0,
      requested: 0,
      max_heap: 0,
    }
  }

  pub(crate) fn record_malloc(
    &mut self,
    size: usize,
  ) {
    self.mallocs += 1;
    self.requested += size;
  }

  pub(crate) fn record_free(&mut self) {
    self.frees += 1;
  }

  pub(crate) fn record_reuse(&mut self) {
    self.reuses += 1;
  }

  pub(crate) fn record_grow(
    &mut self,
    size: usize,
  ) {
    self.grows += 1;
    self.max_heap = self.max_heap.max(size);
  }

  pub(crate) fn record_split(&mut self) {
    self.splits += 1;
  }

  pub(crate) fn record_coalesce(&mut self) {
    self.coalesces += 1;
  }

  pub(crate) fn record_search(
    &mut self,
    scanned: usize,
  ) {
    self.blocks = scanned;
  }

  /// Label/value pairs in report order.
  pub fn entries(&self) -> [(&'static str, usize); 9] {
    [
      ("mallocs", self.mallocs),
      ("frees", self.frees),
      ("reuses", self.reuses),
      ("grows", self.grows),
      ("splits", self.splits),
      ("coalesces", self.coalesces),
      ("blocks", self.blocks),
      ("requested", self.requested),
      ("max heap", self.max_heap),
    ]
  }

  /// Writes the human-readable report, one `label:\tvalue` line per metric.
  pub fn write_report<W: Write>(
    &self,
    mut out: W,
  ) -> io::Result<()> {
    writeln!(out, "heap management statistics")?;
    for (label, value) in self.entries() {
      writeln!(out, "{label}:\t{value}")?;
    }
    Ok(())
  }
}

/// Per-arena counters, optionally mirrored into the process-wide totals.
pub(crate) struct Recorder {
  local: Statistics,
  publish: bool,
}

impl Recorder {
  pub(crate) fn new(publish: bool) -> Self {
    Self {
      local: Statistics::new(),
      publish,
    }
  }

  pub(crate) fn snapshot(&self) -> Statistics {
    self.local
  }

  pub(crate) fn publishes(&self) -> bool {
    self.publish
  }

  pub(crate) fn update(
    &mut self,
    apply: impl Fn(&mut Statistics),
  ) {
    apply(&mut self.local);

    if self.publish {
      let mut totals = PROCESS_TOTALS.lock().unwrap_or_else(|e| e.into_inner());
      apply(&mut totals);
    }
  }
}

static PROCESS_TOTALS: Mutex<Statistics> = Mutex::new(Statistics::new());
static EXIT_HOOK: Once = Once::new();

/// Counters folded in from every arena that reports at exit.
pub fn process_totals() -> Statistics {
  *PROCESS_TOTALS.lock().unwrap_or_else(|e| e.into_inner())
}

/// Registers the exit report. Only the first call has any effect.
pub(crate) fn register_exit_report() {
  EXIT_HOOK.call_once(|| {
    let status = unsafe { libc::atexit(print_at_exit) };
    if status != 0 {
      tracing::warn!(status, "failed to register heap statistics exit hook");
    } else {
      tracing::debug!("registered heap statistics exit hook");
    }
  });
}

/// Whether an arena has registered the exit report in this process.
pub fn exit_report_registered() -> bool {
  EXIT_HOOK.is_completed()
}

extern "C" fn print_at_exit() {
  let totals = process_totals();
  let stdout = io::stdout();
  let mut out = stdout.lock();

  let _ = writeln!(out);
  let _ = totals.write_report(&mut out);
  let _ = out.flush();
}
