//! On-chain feed: chain TVL momentum from DeFiLlama.

use std::time::Duration;

use async_trait::async_trait;
use log::warn;

use super::defillama::tvl_change;
use super::{chain_for_symbol, DefiLlamaClient, OnChainSource, TvlPoint};
use crate::cache::TtlCache;
use crate::fusion::{OnChain, OnChainHealth, Sentiment, SourceTag};
use crate::metrics::record_source_failure;

/// Interpret a chain's TVL history for `symbol`.
pub fn interpret(symbol: &str, chain: &str, points: &[TvlPoint]) -> Option<OnChainHealth> {
    let (current, change) = tvl_change(points)?;
    let (sentiment, confidence) = Sentiment::from_tvl_change(change);
    let reason = match sentiment {
        Sentiment::Bullish => format!("TVL up {change:.1}%"),
        Sentiment::Bearish => format!("TVL down {change:.1}%"),
        Sentiment::Neutral => format!("TVL flat ({change:+.1}%)"),
    };
    Some(OnChainHealth {
        source: SourceTag::Defillama,
        symbol: symbol.to_string(),
        chain: chain.to_string(),
        current_tvl: current,
        tvl_change_1d: change,
        sentiment,
        confidence,
        reason,
    })
}

/// [`OnChainSource`] with a per-chain TTL cache of the TVL history.
pub struct DefiLlamaOnChainFeed {
    client: DefiLlamaClient,
    cache: TtlCache<String, Vec<TvlPoint>>,
}

impl DefiLlamaOnChainFeed {
    pub fn new(client: DefiLlamaClient, ttl: Duration) -> Self {
        Self { client, cache: TtlCache::new("onchain", ttl) }
    }
}

#[async_trait]
impl OnChainSource for DefiLlamaOnChainFeed {
    async fn market_health(&self, symbol: &str) -> OnChain {
        let chain = chain_for_symbol(symbol);
        let points = match self.cache.get(&chain.to_string()) {
            Some(points) => points,
            None => match self.client.chain_tvl_history(chain).await {
                Ok(points) => {
                    self.cache.insert(chain.to_string(), points.clone());
                    points
                }
                Err(e) => {
                    warn!("on-chain data unavailable for {} ({}): {}", symbol, chain, e);
                    record_source_failure("defillama");
                    return OnChain::Empty;
                }
            },
        };
        interpret(symbol, chain, &points).map_or(OnChain::Empty, OnChain::Available)
    }
}
