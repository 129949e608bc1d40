//! Utility functions and types shared across the engine.

pub mod clock;
pub mod error;
mod logging;

pub use clock::{system_clock, Clock, ManualClock, SystemClock};
pub use error::Error;
pub use logging::{init_logging, init_test_logging, LOG_ENV};

/// Re-export of commonly used types
pub mod prelude {
    pub use super::{
        clock::{Clock, ManualClock, SystemClock},
        error::{Error, Result},
        logging::init_logging,
    };
}

/// Common result type for utility functions
pub type Result<T> = std::result::Result<T, Error>;

/// Case-insensitive substring match against a keyword list.
pub fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    let lower = haystack.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}

/// Mean of a slice, `None` when empty.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
