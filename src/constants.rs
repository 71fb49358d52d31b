//! Tunables for the API client, paging and UI, embedded from `constants.ron`
//! and parsed once on first access.

use serde::Deserialize;
use std::sync::LazyLock;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  // YouTube Data API
  pub api_base_url: String,
  pub default_region_code: String,

  // Listing
  pub page_size: u32,
  pub detail_batch_limit: usize,
  pub detail_batch_concurrency: usize,
  pub search_order: String,

  // Watch surface
  pub watch_url_base: String,
  pub embed_url_base: String,

  // UI
  pub error_display_secs: u64,

  // Logging
  pub log_file_prefix: String,
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed this is a build-time error.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}
