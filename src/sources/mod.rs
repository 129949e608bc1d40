//! Data sources.
//!
//! `yahoo`, `polymarket`, `defillama` and `binance` are thin HTTP clients that
//! return `Result`. The feeds built on them (`fundamentals`, `prediction`,
//! `onchain`, `prices`) implement the source traits below and never fail: a
//! transport or parse error is logged, counted, and turned into the
//! unavailable/empty value of the slot.

pub mod binance;
pub mod defillama;
pub mod fundamentals;
pub mod onchain;
pub mod polymarket;
pub mod prediction;
pub mod prices;
pub mod yahoo;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::{CacheConfig, Config, SourcesConfig};
use crate::fusion::{EventOdds, Fundamentals, OnChain};
use crate::utils::error::Result;

pub use binance::BinanceClient;
pub use defillama::{DefiLlamaClient, TvlPoint};
pub use fundamentals::{crypto_proxy_metrics, value_score, NcavAnalysis, YahooFundamentalsFeed};
pub use onchain::DefiLlamaOnChainFeed;
pub use polymarket::{MarketSummary, PolymarketClient};
pub use prediction::PolymarketFeed;
pub use prices::PriceFeed;
pub use yahoo::YahooClient;

/// Valuation metrics per symbol.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FundamentalsSource: Send + Sync {
    async fn value_metrics(&self, symbol: &str) -> Fundamentals;
}

/// YES/NO odds for configured events. Failed events are absent.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn events(&self, config: &BTreeMap<String, String>) -> BTreeMap<String, EventOdds>;
}

/// Chain capital-flow health for a crypto symbol.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OnChainSource: Send + Sync {
    async fn market_health(&self, symbol: &str) -> OnChain;
}

/// Daily closing prices, oldest first. Empty on failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceHistorySource: Send + Sync {
    async fn daily_closes(&self, symbol: &str) -> Vec<f64>;
}

/// Base asset of a crypto symbol: `BTC-USD`, `BTCUSDT` and `BTCUSD` all give `BTC`.
pub fn base_asset(symbol: &str) -> String {
    let upper = symbol.to_ascii_uppercase();
    for suffix in ["-USDT", "-USD", "USDT", "USD"] {
        if let Some(base) = upper.strip_suffix(suffix) {
            if !base.is_empty() {
                return base.to_string();
            }
        }
    }
    upper
}

/// DeFiLlama chain name backing a crypto symbol.
pub fn chain_for_symbol(symbol: &str) -> &'static str {
    match base_asset(symbol).as_str() {
        "ETH" => "Ethereum",
        "SOL" => "Solana",
        "AVAX" => "Avalanche",
        "BTC" => "Bitcoin",
        _ => "Ethereum",
    }
}

/// Shared HTTP client with the configured timeout and user agent.
pub fn http_client(cfg: &SourcesConfig) -> Result<Client> {
    Ok(Client::builder()
        .timeout(cfg.request_timeout())
        .user_agent(cfg.user_agent.clone())
        .build()?)
}

/// The four production feeds sharing one HTTP client.
pub struct SourceSet {
    pub fundamentals: Arc<dyn FundamentalsSource>,
    pub events: Arc<dyn EventSource>,
    pub onchain: Arc<dyn OnChainSource>,
    pub history: Arc<dyn PriceHistorySource>,
    pub prices: Arc<PriceFeed>,
}

impl SourceSet {
    pub fn from_config(config: &Config) -> Result<Self> {
        let sources: &SourcesConfig = &config.sources;
        let cache: &CacheConfig = &config.cache;
        let client = http_client(sources)?;

        let yahoo = YahooClient::new(client.clone(), &sources.yahoo_url);
        let llama = DefiLlamaClient::new(client.clone(), &sources.defillama_url);
        let poly = PolymarketClient::new(client.clone(), &sources.polymarket_url);
        let binance = BinanceClient::new(client, &sources.binance_url);

        let prices = Arc::new(PriceFeed::new(yahoo.clone(), binance, sources.clone()));
        Ok(Self {
            fundamentals: Arc::new(YahooFundamentalsFeed::new(
                yahoo,
                llama.clone(),
                sources.clone(),
                cache.fundamentals_ttl(),
            )),
            events: Arc::new(PolymarketFeed::new(poly, cache.events_ttl(), config.fusion.max_workers)),
            onchain: Arc::new(DefiLlamaOnChainFeed::new(llama, cache.onchain_ttl())),
            history: prices.clone(),
            prices,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_asset_strips_quote() {
        assert_eq!(base_asset("btc-usd"), "BTC");
        assert_eq!(base_asset("ETHUSDT"), "ETH");
        assert_eq!(base_asset("SOLUSD"), "SOL");
        assert_eq!(base_asset("AAPL"), "AAPL");
        assert_eq!(base_asset("USD"), "USD");
    }

    #[test]
    fn chain_mapping_defaults_to_ethereum() {
        assert_eq!(chain_for_symbol("SOL"), "Solana");
        assert_eq!(chain_for_symbol("AVAX-USD"), "Avalanche");
        assert_eq!(chain_for_symbol("BTC"), "Bitcoin");
        assert_eq!(chain_for_symbol("ARB"), "Ethereum");
    }
}
