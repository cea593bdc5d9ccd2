//! Arena configuration, constructed programmatically or parsed from TOML.
//!
//! # TOML Format
//! ```toml
//! fit = "best-fit"
//! next_fit_wrap = false
//! report_at_exit = true
//! ```
//!
//! Missing keys take their defaults; `fit` defaults to the policy selected
//! by the crate's `*-fit` features.

use serde::{Deserialize, Serialize};

use crate::{error::ArenaError, fit::FitPolicy};

/// Settings fixed when an [`crate::Arena`] is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
  /// Block selection policy.
  pub fit: FitPolicy,
  /// Whether a next-fit search that reaches the tail continues from the
  /// head. Off by default: blocks behind the cursor are only seen again
  /// after a search misses.
  pub next_fit_wrap: bool,
  /// Fold this arena's counters into the process-wide totals printed when
  /// the process exits.
  pub report_at_exit: bool,
}

impl Default for ArenaConfig {
  fn default() -> Self {
    Self {
      fit: FitPolicy::default(),
      next_fit_wrap: false,
      report_at_exit: true,
    }
  }
}

impl ArenaConfig {
  /// Default settings with the given policy.
  pub fn with_fit(fit: FitPolicy) -> Self {
    Self {
      fit,
      ..Default::default()
    }
  }

  /// Parses configuration from a TOML string.
  pub fn from_toml(toml_str: &str) -> Result<Self, ArenaError> {
    toml::from_str(toml_str).map_err(|e| ArenaError::Config(format!("TOML parse error: {e}")))
  }

  /// Serialises configuration to TOML.
  pub fn to_toml(&self) -> Result<String, ArenaError> {
    toml::to_string_pretty(self)
      .map_err(|e| ArenaError::Config(format!("TOML serialise error: {e}")))
  }
}
