//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!`, so it is always available
//! without runtime file I/O. Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  // Content sources
  pub default_source: String,
  pub manifest_name: String,
  pub profile_locator: String,
  pub default_schema: String,
  /// Profile file looked up inside a local source directory.
  pub local_profile_name: String,

  // Parsing
  pub sentinel_date: String,
  pub preview_lines: usize,

  // UI timing
  pub poll_interval_ms: u64,
  pub error_expiry_secs: u64,

  // Localized messages
  pub untitled: String,
  pub lookup_miss: String,
  pub missing_file_title: String,
  pub missing_file: String,
  pub load_error_title: String,
  pub no_results: String,
  pub loading_catalog: String,
  pub loading_profile: String,
  pub profile_retry_hint: String,
  pub catalog_task_failed: String,
  pub profile_task_failed: String,
  pub load_task_failed: String,
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed the first test run fails.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}
