//! Logging configuration.
//!
//! Library code logs through the `log` facade and `tracing`; both end up in a
//! single `tracing-subscriber` fmt layer installed here.

use log::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding an `EnvFilter` directive, e.g.
/// `SIGNALOPS_LOG=signalops=debug,reqwest=warn`.
pub const LOG_ENV: &str = "SIGNALOPS_LOG";

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the logging system. Safe to call more than once; only the first
/// call installs a subscriber.
pub fn init_logging(level: &str) {
    let installed = fmt()
        .with_env_filter(build_filter(level))
        .with_target(true)
        .try_init()
        .is_ok();

    if installed {
        info!("Logging initialized at level: {}", level);
    }
}

/// Initialize test logging (output captured by the test harness)
pub fn init_test_logging() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
