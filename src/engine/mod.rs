//! Engine: runs agents over fused records.

pub mod arena;

pub use arena::{Arena, RoundResult, Standing};
