//! Hand-written source stubs shared by the integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use signalops::config::Config;
use signalops::fusion::{
    EventOdds, FundamentalMetrics, Fundamentals, MultiSourceDataFeed, OnChain, OnChainHealth, Sentiment, SourceTag,
};
use signalops::sources::{EventSource, FundamentalsSource, OnChainSource, PriceHistorySource};
use signalops::utils::ManualClock;

pub struct StaticFundamentals(pub Fundamentals);

#[async_trait]
impl FundamentalsSource for StaticFundamentals {
    async fn value_metrics(&self, _symbol: &str) -> Fundamentals {
        self.0.clone()
    }
}

pub struct StaticEvents(pub BTreeMap<String, EventOdds>);

#[async_trait]
impl EventSource for StaticEvents {
    async fn events(&self, config: &BTreeMap<String, String>) -> BTreeMap<String, EventOdds> {
        self.0.iter().filter(|(k, _)| config.contains_key(*k)).map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

/// Counts calls so tests can tell whether fusion asked at all.
pub struct CountingOnChain {
    pub value: OnChain,
    pub calls: AtomicUsize,
}

impl CountingOnChain {
    pub fn new(value: OnChain) -> Arc<Self> {
        Arc::new(Self { value, calls: AtomicUsize::new(0) })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OnChainSource for CountingOnChain {
    async fn market_health(&self, _symbol: &str) -> OnChain {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.value.clone()
    }
}

/// On-chain adapter whose task dies mid-fetch.
pub struct PanickingOnChain;

#[async_trait]
impl OnChainSource for PanickingOnChain {
    async fn market_health(&self, symbol: &str) -> OnChain {
        panic!("decoder blew up on {symbol}");
    }
}

pub struct StaticHistory(pub Vec<f64>);

#[async_trait]
impl PriceHistorySource for StaticHistory {
    async fn daily_closes(&self, _symbol: &str) -> Vec<f64> {
        self.0.clone()
    }
}

/// Never answers within any reasonable deadline.
pub struct SlowHistory(pub Duration);

#[async_trait]
impl PriceHistorySource for SlowHistory {
    async fn daily_closes(&self, _symbol: &str) -> Vec<f64> {
        tokio::time::sleep(self.0).await;
        vec![100.0; 30]
    }
}

pub fn equity(pb: f64, pe: f64, de: f64, score: f64) -> Fundamentals {
    let mut m = FundamentalMetrics::new(SourceTag::YahooFinance, "XYZ");
    m.price_to_book = Some(pb);
    m.price_to_earnings = Some(pe);
    m.debt_to_equity = Some(de);
    m.value_score = score;
    Fundamentals::Available(m)
}

pub fn odds(title: &str, yes: f64) -> EventOdds {
    EventOdds {
        source: SourceTag::Polymarket,
        market_id: "1".to_string(),
        title: title.to_string(),
        description: String::new(),
        yes_probability: yes,
        no_probability: 1.0 - yes,
        volume: 0.0,
        liquidity: 0.0,
        close_time: None,
        active: true,
    }
}

pub fn health(change: f64) -> OnChain {
    let (sentiment, confidence) = Sentiment::from_tvl_change(change);
    OnChain::Available(OnChainHealth {
        source: SourceTag::Defillama,
        symbol: "BTC".to_string(),
        chain: "Bitcoin".to_string(),
        current_tvl: 1.0e9,
        tvl_change_1d: change,
        sentiment,
        confidence,
        reason: format!("TVL {change:+.1}%"),
    })
}

/// Strictly falling closes: RSI 0, oversold BUY.
pub fn falling(n: usize) -> Vec<f64> {
    (0..n).map(|i| 200.0 - i as f64).collect()
}

/// Strictly rising closes: RSI 100, overbought SELL.
pub fn rising(n: usize) -> Vec<f64> {
    (0..n).map(|i| 100.0 + i as f64).collect()
}

pub fn fixed_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()))
}

pub fn feed(
    fundamentals: Fundamentals,
    events: BTreeMap<String, EventOdds>,
    onchain: Arc<CountingOnChain>,
    history: Arc<dyn PriceHistorySource>,
    config: &Config,
) -> MultiSourceDataFeed {
    MultiSourceDataFeed::new(
        Arc::new(StaticFundamentals(fundamentals)),
        Arc::new(StaticEvents(events)),
        onchain,
        history,
        config,
    )
    .with_clock(fixed_clock())
}

pub fn event_config(names: &[&str]) -> BTreeMap<String, String> {
    names.iter().map(|n| (n.to_string(), format!("{n}-market"))).collect()
}
