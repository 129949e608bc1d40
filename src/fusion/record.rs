//! The unified record produced by one fusion request.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::conflicts::{Conflict, Severity};
use super::consensus::Consensus;
use crate::indicators::TechnicalReading;

/// Provider that produced a sub-record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    YahooFinance,
    /// TVL/market-cap valuation for crypto assets.
    CryptoProxy,
    Polymarket,
    Defillama,
    Binance,
    /// Derived locally from price history.
    Calculated,
}

impl SourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::YahooFinance => "yahoo_finance",
            SourceTag::CryptoProxy => "crypto_proxy",
            SourceTag::Polymarket => "polymarket",
            SourceTag::Defillama => "defillama",
            SourceTag::Binance => "binance",
            SourceTag::Calculated => "calculated",
        }
    }
}

/// Caller-supplied market state for the symbol being fused.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub price: f64,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub price_change_pct: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_24h: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_24h: Option<f64>,
    /// Closing prices, oldest first. Empty means "fetch daily closes".
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<f64>,
}

impl MarketSnapshot {
    pub fn new(symbol: impl Into<String>, price: f64) -> Self {
        Self { symbol: symbol.into(), price, ..Default::default() }
    }

    pub fn with_change(mut self, price_change_pct: f64) -> Self {
        self.price_change_pct = price_change_pct;
        self
    }

    pub fn with_history(mut self, history: Vec<f64>) -> Self {
        self.history = history;
        self
    }
}

/// Valuation metrics for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalMetrics {
    pub source: SourceTag,
    pub symbol: String,
    pub price: Option<f64>,
    pub market_cap: Option<f64>,
    pub price_to_book: Option<f64>,
    pub price_to_earnings: Option<f64>,
    pub forward_pe: Option<f64>,
    pub ncav_per_share: Option<f64>,
    /// price / NCAV per share, only when NCAV per share is positive.
    pub ncav_ratio: Option<f64>,
    pub graham_threshold: Option<f64>,
    #[serde(default)]
    pub is_net_net: bool,
    pub debt_to_equity: Option<f64>,
    pub current_ratio: Option<f64>,
    pub profit_margin: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub dividend_yield: Option<f64>,
    /// Chain TVL used as book value by the crypto proxy.
    pub tvl: Option<f64>,
    /// 0-100, higher is cheaper.
    pub value_score: f64,
}

impl FundamentalMetrics {
    /// Empty metrics with a neutral score.
    pub fn new(source: SourceTag, symbol: impl Into<String>) -> Self {
        Self {
            source,
            symbol: symbol.into(),
            price: None,
            market_cap: None,
            price_to_book: None,
            price_to_earnings: None,
            forward_pe: None,
            ncav_per_share: None,
            ncav_ratio: None,
            graham_threshold: None,
            is_net_net: false,
            debt_to_equity: None,
            current_ratio: None,
            profit_margin: None,
            return_on_equity: None,
            free_cash_flow: None,
            dividend_yield: None,
            tvl: None,
            value_score: 50.0,
        }
    }
}

/// Fundamentals slot of the record.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Fundamentals {
    Available(FundamentalMetrics),
    #[default]
    Unavailable,
}

impl Fundamentals {
    pub fn as_available(&self) -> Option<&FundamentalMetrics> {
        match self {
            Fundamentals::Available(m) => Some(m),
            Fundamentals::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Fundamentals::Available(_))
    }
}

impl Serialize for Fundamentals {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Fundamentals::Available(m) => m.serialize(serializer),
            Fundamentals::Unavailable => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("source", "unavailable")?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Fundamentals {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        if value.get("source").and_then(|s| s.as_str()) == Some("unavailable") {
            return Ok(Fundamentals::Unavailable);
        }
        serde_json::from_value(value).map(Fundamentals::Available).map_err(serde::de::Error::custom)
    }
}

/// YES/NO odds of one prediction market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventOdds {
    pub source: SourceTag,
    pub market_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub yes_probability: f64,
    pub no_probability: f64,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub liquidity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_time: Option<String>,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

impl Sentiment {
    /// Classify a 1-day TVL change in percent.
    pub fn from_tvl_change(change_pct: f64) -> (Self, f64) {
        if change_pct > 5.0 {
            (Sentiment::Bullish, 0.7)
        } else if change_pct < -5.0 {
            (Sentiment::Bearish, 0.7)
        } else {
            (Sentiment::Neutral, 0.5)
        }
    }
}

/// Capital-flow health of the chain behind a crypto symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnChainHealth {
    pub source: SourceTag,
    pub symbol: String,
    pub chain: String,
    pub current_tvl: f64,
    pub tvl_change_1d: f64,
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub reason: String,
}

/// On-chain slot of the record.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum OnChain {
    Available(OnChainHealth),
    #[default]
    Empty,
}

impl OnChain {
    pub fn as_available(&self) -> Option<&OnChainHealth> {
        match self {
            OnChain::Available(h) => Some(h),
            OnChain::Empty => None,
        }
    }

    pub fn sentiment(&self) -> Option<Sentiment> {
        self.as_available().map(|h| h.sentiment)
    }

    pub fn is_available(&self) -> bool {
        matches!(self, OnChain::Available(_))
    }
}

impl Serialize for OnChain {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            OnChain::Available(h) => h.serialize(serializer),
            OnChain::Empty => serializer.serialize_map(Some(0))?.end(),
        }
    }
}

impl<'de> Deserialize<'de> for OnChain {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        if value.as_object().map_or(true, |m| m.is_empty()) {
            return Ok(OnChain::Empty);
        }
        serde_json::from_value(value).map(OnChain::Available).map_err(serde::de::Error::custom)
    }
}

/// Everything known about one symbol at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedMarketRecord {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub market: MarketSnapshot,
    pub fundamentals: Fundamentals,
    pub events: BTreeMap<String, EventOdds>,
    pub onchain: OnChain,
    pub technical: Option<TechnicalReading>,
    pub conflicts: Vec<Conflict>,
    pub consensus: Consensus,
}

impl UnifiedMarketRecord {
    pub fn price(&self) -> f64 {
        self.market.price
    }

    pub fn rsi(&self) -> Option<f64> {
        self.technical.as_ref().and_then(|t| t.rsi_14)
    }

    pub fn has_conflict(&self, severity: Severity) -> bool {
        self.conflicts.iter().any(|c| c.severity == severity)
    }

    pub fn event_probability(&self, name: &str) -> Option<f64> {
        self.events.get(name).map(|e| e.yes_probability)
    }

    /// Flatten the record into named metrics for rule evaluation.
    ///
    /// Event probabilities are keyed as `event.<name>`. Absent values are
    /// omitted rather than defaulted.
    pub fn metrics(&self) -> BTreeMap<String, f64> {
        let mut out = BTreeMap::new();
        out.insert("price".to_string(), self.market.price);
        out.insert("volume".to_string(), self.market.volume);
        out.insert("price_change_pct".to_string(), self.market.price_change_pct);

        if let Some(f) = self.fundamentals.as_available() {
            let optional = [
                ("price_to_book", f.price_to_book),
                ("price_to_earnings", f.price_to_earnings),
                ("forward_pe", f.forward_pe),
                ("ncav_ratio", f.ncav_ratio),
                ("debt_to_equity", f.debt_to_equity),
                ("current_ratio", f.current_ratio),
                ("dividend_yield", f.dividend_yield),
                ("market_cap", f.market_cap),
            ];
            for (name, value) in optional {
                if let Some(v) = value {
                    out.insert(name.to_string(), v);
                }
            }
            out.insert("value_score".to_string(), f.value_score);
        }

        if let Some(h) = self.onchain.as_available() {
            out.insert("tvl".to_string(), h.current_tvl);
            out.insert("tvl_change_1d".to_string(), h.tvl_change_1d);
        }

        if let Some(t) = &self.technical {
            if let Some(rsi) = t.rsi_14 {
                out.insert("rsi_14".to_string(), rsi);
            }
            out.insert("technical_confidence".to_string(), t.confidence);
        }

        for (name, odds) in &self.events {
            out.insert(format!("event.{name}"), odds.yes_probability);
        }

        out.insert("consensus_confidence".to_string(), self.consensus.confidence);
        out
    }
}
