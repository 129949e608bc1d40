//! Price data: daily closes for indicators and current market snapshots.

use async_trait::async_trait;
use log::{debug, warn};

use super::{base_asset, BinanceClient, PriceHistorySource, YahooClient};
use crate::config::SourcesConfig;
use crate::fusion::MarketSnapshot;
use crate::metrics::record_source_failure;
use crate::utils::error::Result;

/// Days of history requested for RSI-14.
const HISTORY_DAYS: u16 = 30;

/// Binance for crypto (Yahoo `-USD` pairs as fallback), Yahoo for equities.
pub struct PriceFeed {
    yahoo: YahooClient,
    binance: BinanceClient,
    sources: SourcesConfig,
}

impl PriceFeed {
    pub fn new(yahoo: YahooClient, binance: BinanceClient, sources: SourcesConfig) -> Self {
        Self { yahoo, binance, sources }
    }

    /// Current market state of `symbol`.
    pub async fn snapshot(&self, symbol: &str) -> Result<MarketSnapshot> {
        if self.sources.is_crypto(symbol) {
            match self.binance.ticker_24h(symbol).await {
                Ok(snap) => return Ok(snap),
                Err(e) => debug!("binance ticker failed for {}: {}, trying yahoo", symbol, e),
            }
            return self.yahoo_snapshot(symbol, &format!("{}-USD", base_asset(symbol))).await;
        }
        self.yahoo_snapshot(symbol, symbol).await
    }

    async fn yahoo_snapshot(&self, symbol: &str, ticker: &str) -> Result<MarketSnapshot> {
        let q = self.yahoo.quote(ticker).await?;
        let change = match q.previous_close {
            Some(prev) if prev > 0.0 => (q.price - prev) / prev * 100.0,
            _ => 0.0,
        };
        Ok(MarketSnapshot {
            symbol: symbol.to_string(),
            price: q.price,
            volume: q.volume,
            price_change_pct: change,
            high_24h: q.high,
            low_24h: q.low,
            history: Vec::new(),
        })
    }

    async fn fetch_closes(&self, symbol: &str) -> Result<Vec<f64>> {
        if self.sources.is_crypto(symbol) {
            match self.binance.closes(symbol, "1d", HISTORY_DAYS).await {
                Ok(closes) if !closes.is_empty() => return Ok(closes),
                Ok(_) => debug!("binance returned no klines for {}", symbol),
                Err(e) => debug!("binance klines failed for {}: {}", symbol, e),
            }
            return self.yahoo.closes(&format!("{}-USD", base_asset(symbol)), "1mo", "1d").await;
        }
        self.yahoo.closes(symbol, "1mo", "1d").await
    }
}

#[async_trait]
impl PriceHistorySource for PriceFeed {
    async fn daily_closes(&self, symbol: &str) -> Vec<f64> {
        match self.fetch_closes(symbol).await {
            Ok(closes) => closes,
            Err(e) => {
                warn!("price history unavailable for {}: {}", symbol, e);
                record_source_failure("price_history");
                Vec::new()
            }
        }
    }
}
