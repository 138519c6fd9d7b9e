//! Query and maintenance tools for ipwatch
//!
//! Three binaries ride on this crate: `ipwatch-query` (history reports),
//! `ipwatch-query-ma` (single vendor lookups) and `ipwatch-update-ma`
//! (download and load of the IEEE MAC assignment files).

pub mod download;
pub mod malist;

use tracing_subscriber::EnvFilter;

/// Initialize logging for a tool binary
pub fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
