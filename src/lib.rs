//! # SignalOps
//!
//! Multi-source trading-signal engine. Source adapters pull valuation data,
//! prediction-market odds, chain TVL and prices; [`fusion::MultiSourceDataFeed`]
//! merges them concurrently into one [`fusion::UnifiedMarketRecord`], flags
//! contradictions between sources and votes a consensus. Rule-based agents in
//! [`strategies`] turn records into [`trading::Signal`]s and the
//! [`engine::Arena`] picks a winner per round.
//!
//! ```no_run
//! # async fn run() -> signalops::Result<()> {
//! use signalops::{config::Config, fusion::MultiSourceDataFeed, sources::SourceSet};
//!
//! let config = Config::load()?;
//! let sources = SourceSet::from_config(&config)?;
//! let market = sources.prices.snapshot("AAPL").await?;
//! let feed = MultiSourceDataFeed::with_sources(&sources, &config);
//! let record = feed.get_unified_data("AAPL", market, &config.fusion.events).await;
//! println!("{} {:.2}", record.consensus.action, record.consensus.confidence);
//! # Ok(())
//! # }
//! ```

pub use crate::utils::error::{Error, Result};

pub mod cache;
pub mod config;
pub mod engine;
pub mod fusion;
pub mod indicators;
pub mod metrics;
pub mod persistence;
pub mod rules;
pub mod sources;
pub mod strategies;
pub mod trading;
pub mod utils;
