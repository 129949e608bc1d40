//! Multi-source fusion.
//!
//! [`MultiSourceDataFeed`] fans one request out to the event, on-chain,
//! fundamentals and technical sources concurrently, bounded by a shared
//! semaphore and a single deadline. Whatever has not finished by the deadline
//! is aborted and replaced by the slot's neutral value, so a request always
//! yields a complete [`UnifiedMarketRecord`].

pub mod audit;
pub mod conflicts;
pub mod consensus;
pub mod record;

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::{Config, SourcesConfig};
use crate::indicators::TechnicalReading;
use crate::metrics::{record_fusion, record_source_failure, record_timeout};
use crate::sources::{EventSource, FundamentalsSource, OnChainSource, PriceHistorySource, SourceSet};
use crate::utils::clock::{system_clock, Clock};
use crate::utils::error::Result;

pub use audit::{audit_trail, AuditTrail};
pub use conflicts::{detect_conflicts, Conflict, ConflictKind, Recommendation, Severity};
pub use consensus::{calculate_consensus, Consensus, VoteCounts};
pub use record::{
    EventOdds, FundamentalMetrics, Fundamentals, MarketSnapshot, OnChain, OnChainHealth, Sentiment, SourceTag,
    UnifiedMarketRecord,
};

/// Fusion orchestrator.
pub struct MultiSourceDataFeed {
    fundamentals: Arc<dyn FundamentalsSource>,
    events: Arc<dyn EventSource>,
    onchain: Arc<dyn OnChainSource>,
    history: Arc<dyn PriceHistorySource>,
    sources: SourcesConfig,
    semaphore: Arc<Semaphore>,
    timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl MultiSourceDataFeed {
    /// Build the production feeds from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::with_sources(&SourceSet::from_config(config)?, config))
    }

    /// Share already built feeds, and with them their caches.
    pub fn with_sources(set: &SourceSet, config: &Config) -> Self {
        Self::new(set.fundamentals.clone(), set.events.clone(), set.onchain.clone(), set.history.clone(), config)
    }

    pub fn new(
        fundamentals: Arc<dyn FundamentalsSource>,
        events: Arc<dyn EventSource>,
        onchain: Arc<dyn OnChainSource>,
        history: Arc<dyn PriceHistorySource>,
        config: &Config,
    ) -> Self {
        Self {
            fundamentals,
            events,
            onchain,
            history,
            sources: config.sources.clone(),
            semaphore: Arc::new(Semaphore::new(config.fusion.max_workers.max(1))),
            timeout: config.fusion.timeout(),
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_crypto(&self, symbol: &str) -> bool {
        self.sources.is_crypto(symbol)
    }

    /// Run one task under a worker permit.
    fn spawn_bounded<F, T>(&self, fut: F) -> JoinHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let semaphore = self.semaphore.clone();
        tokio::spawn(async move {
            // the semaphore is never closed
            let _permit = semaphore.acquire_owned().await.ok();
            fut.await
        })
    }

    /// Fetch, merge and analyse every source for `symbol`.
    ///
    /// `event_config` maps event names to prediction-market ids. Never fails:
    /// missing or late sources leave neutral values behind.
    pub async fn get_unified_data(
        &self,
        symbol: &str,
        market: MarketSnapshot,
        event_config: &BTreeMap<String, String>,
    ) -> UnifiedMarketRecord {
        let started = Instant::now();
        let deadline = started + self.timeout;
        let crypto = self.is_crypto(symbol);

        let events_task = (!event_config.is_empty()).then(|| {
            let src = self.events.clone();
            let cfg = event_config.clone();
            self.spawn_bounded(async move { src.events(&cfg).await })
        });

        let onchain_task = crypto.then(|| {
            let src = self.onchain.clone();
            let sym = symbol.to_string();
            self.spawn_bounded(async move { src.market_health(&sym).await })
        });

        let fundamentals_task = {
            let src = self.fundamentals.clone();
            let sym = symbol.to_string();
            self.spawn_bounded(async move { src.value_metrics(&sym).await })
        };

        let technical_task = {
            let src = self.history.clone();
            let sym = symbol.to_string();
            let history = market.history.clone();
            self.spawn_bounded(async move {
                let closes = if history.is_empty() { src.daily_closes(&sym).await } else { history };
                TechnicalReading::from_closes(&closes)
            })
        };

        let events = match events_task {
            Some(task) => join_by(deadline, task, "events").await.unwrap_or_default(),
            None => BTreeMap::new(),
        };
        let onchain = match onchain_task {
            Some(task) => join_by(deadline, task, "onchain").await.unwrap_or_default(),
            None => OnChain::Empty,
        };
        let fundamentals = join_by(deadline, fundamentals_task, "fundamentals").await.unwrap_or_default();
        let technical = join_by(deadline, technical_task, "technical").await;

        let conflicts = detect_conflicts(&events, &onchain, &fundamentals, technical.as_ref(), &market);
        let consensus = calculate_consensus(&events, &onchain, &fundamentals, technical.as_ref());

        let elapsed = started.elapsed();
        record_fusion(elapsed);
        info!(
            "fused {}: {} {:.2} from {} votes, {} conflicts in {:?}",
            symbol,
            consensus.action,
            consensus.confidence,
            consensus.sources_count,
            conflicts.len(),
            elapsed
        );

        UnifiedMarketRecord {
            symbol: symbol.to_string(),
            timestamp: self.clock.now(),
            market,
            fundamentals,
            events,
            onchain,
            technical,
            conflicts,
            consensus,
        }
    }

    pub fn audit_trail(&self, record: &UnifiedMarketRecord) -> AuditTrail {
        audit_trail(record)
    }
}

/// Await `handle` until `deadline`; abort it on expiry.
async fn join_by<T>(deadline: Instant, mut handle: JoinHandle<T>, slot: &'static str) -> Option<T> {
    match tokio::time::timeout_at(deadline, &mut handle).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            warn!("{} task failed: {}", slot, e);
            record_source_failure(slot);
            None
        }
        Err(_) => {
            handle.abort();
            debug!("{} task missed the fusion deadline", slot);
            record_timeout(slot);
            None
        }
    }
}
