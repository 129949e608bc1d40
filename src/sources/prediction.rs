//! Prediction-market feed over the Polymarket client.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use log::warn;

use super::{EventSource, PolymarketClient};
use crate::cache::TtlCache;
use crate::fusion::EventOdds;
use crate::metrics::record_source_failure;

/// [`EventSource`] with a per-(event, market) TTL cache.
pub struct PolymarketFeed {
    client: PolymarketClient,
    cache: TtlCache<(String, String), EventOdds>,
    concurrency: usize,
}

impl PolymarketFeed {
    pub fn new(client: PolymarketClient, ttl: Duration, concurrency: usize) -> Self {
        Self { client, cache: TtlCache::new("events", ttl), concurrency: concurrency.max(1) }
    }

    async fn fetch_one(&self, name: &str, market_id: &str) -> Option<EventOdds> {
        let key = (name.to_string(), market_id.to_string());
        if let Some(odds) = self.cache.get(&key) {
            return Some(odds);
        }
        match self.client.market_odds(market_id).await {
            Ok(odds) => {
                self.cache.insert(key, odds.clone());
                Some(odds)
            }
            Err(e) => {
                warn!("dropping event {} ({}): {}", name, market_id, e);
                record_source_failure("polymarket");
                None
            }
        }
    }
}

#[async_trait]
impl EventSource for PolymarketFeed {
    async fn events(&self, config: &BTreeMap<String, String>) -> BTreeMap<String, EventOdds> {
        stream::iter(config.clone())
            .map(|(name, market_id)| async move {
                self.fetch_one(&name, &market_id).await.map(|odds| (name, odds))
            })
            .buffer_unordered(self.concurrency)
            .filter_map(|entry| async move { entry })
            .collect()
            .await
    }
}
