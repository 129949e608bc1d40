//! Fundamentals feed: Yahoo Finance for equities, a TVL proxy for crypto.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};

use super::yahoo::QuoteSummary;
use super::{base_asset, chain_for_symbol, DefiLlamaClient, FundamentalsSource, YahooClient};
use crate::cache::TtlCache;
use crate::config::SourcesConfig;
use crate::fusion::{FundamentalMetrics, Fundamentals, SourceTag};
use crate::metrics::record_source_failure;
use crate::utils::error::Result;

/// Share of NCAV per share below which a stock is a net-net.
pub const NET_NET_FACTOR: f64 = 0.67;
/// Multiple of P/B used as the crypto P/E proxy (5% notional yield on TVL).
pub const CRYPTO_PE_MULTIPLE: f64 = 20.0;
/// P/B assumed for crypto when the market cap is unknown.
pub const CRYPTO_DEFAULT_PB: f64 = 5.0;

/// Net current asset value analysis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NcavAnalysis {
    pub ncav: f64,
    pub ncav_per_share: f64,
    /// price / NCAV per share; only defined for positive NCAV.
    pub ncav_ratio: Option<f64>,
    pub graham_threshold: f64,
    pub is_net_net: bool,
}

impl NcavAnalysis {
    pub fn compute(current_assets: f64, total_liabilities: f64, shares: f64, price: f64) -> Option<Self> {
        if shares <= 0.0 {
            return None;
        }
        let ncav = current_assets - total_liabilities;
        let per_share = ncav / shares;
        let threshold = per_share * NET_NET_FACTOR;
        Some(Self {
            ncav,
            ncav_per_share: per_share,
            ncav_ratio: (per_share > 0.0).then(|| price / per_share),
            graham_threshold: threshold,
            is_net_net: per_share > 0.0 && price < threshold,
        })
    }
}

/// 0-100 value score. Starts at 50; each known ratio adds a bonus or penalty.
pub fn value_score(pb: Option<f64>, pe: Option<f64>, ncav_ratio: Option<f64>, de: Option<f64>) -> f64 {
    let mut score = 50.0;

    if let Some(pb) = pb {
        if pb < 1.0 {
            score += 20.0;
        } else if pb < 1.5 {
            score += 10.0;
        } else if pb > 3.0 {
            score -= 10.0;
        }
    }

    if let Some(pe) = pe.filter(|pe| *pe > 0.0) {
        if pe < 10.0 {
            score += 15.0;
        } else if pe < 15.0 {
            score += 10.0;
        } else if pe > 25.0 {
            score -= 10.0;
        }
    }

    if let Some(r) = ncav_ratio {
        if r < 0.67 {
            score += 25.0;
        } else if r < 1.0 {
            score += 10.0;
        }
    }

    if let Some(de) = de {
        if de < 0.3 {
            score += 10.0;
        } else if de < 0.5 {
            score += 5.0;
        } else if de > 1.0 {
            score -= 15.0;
        }
    }

    f64::clamp(score, 0.0, 100.0)
}

/// Equity metrics from a quoteSummary response.
pub fn equity_metrics(symbol: &str, q: &QuoteSummary) -> FundamentalMetrics {
    let ncav = match (q.total_current_assets, q.total_liabilities, q.shares_outstanding, q.price) {
        (Some(ca), Some(tl), Some(shares), Some(price)) => NcavAnalysis::compute(ca, tl, shares, price),
        _ => None,
    };
    let ncav_ratio = ncav.and_then(|n| n.ncav_ratio);

    FundamentalMetrics {
        price: q.price,
        market_cap: q.market_cap,
        price_to_book: q.price_to_book,
        price_to_earnings: q.trailing_pe,
        forward_pe: q.forward_pe,
        ncav_per_share: ncav.map(|n| n.ncav_per_share),
        ncav_ratio,
        graham_threshold: ncav.map(|n| n.graham_threshold),
        is_net_net: ncav.is_some_and(|n| n.is_net_net),
        debt_to_equity: q.debt_to_equity,
        current_ratio: q.current_ratio,
        profit_margin: q.profit_margin,
        return_on_equity: q.return_on_equity,
        free_cash_flow: q.free_cash_flow,
        dividend_yield: q.dividend_yield,
        value_score: value_score(q.price_to_book, q.trailing_pe, ncav_ratio, q.debt_to_equity),
        ..FundamentalMetrics::new(SourceTag::YahooFinance, symbol)
    }
}

/// Crypto valuation proxy: TVL as book value, market cap as price.
///
/// This is a heuristic placeholder, not an accounting figure: P/E is a fixed
/// multiple of P/B, D/E is zero and the NCAV ratio is pinned to neutral.
pub fn crypto_proxy_metrics(symbol: &str, tvl: f64, market_cap: Option<f64>, price: Option<f64>) -> FundamentalMetrics {
    let pb = match market_cap {
        Some(mc) if mc > 0.0 && tvl > 0.0 => mc / tvl,
        _ => CRYPTO_DEFAULT_PB,
    };
    let pe = pb * CRYPTO_PE_MULTIPLE;
    FundamentalMetrics {
        price,
        market_cap,
        price_to_book: Some(pb),
        price_to_earnings: Some(pe),
        ncav_ratio: Some(1.0),
        debt_to_equity: Some(0.0),
        tvl: Some(tvl),
        value_score: value_score(Some(pb), Some(pe), Some(1.0), Some(0.0)),
        ..FundamentalMetrics::new(SourceTag::CryptoProxy, symbol)
    }
}

/// Graham checklist verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct GrahamCheck {
    pub is_value: bool,
    pub criteria_met: Vec<String>,
    pub criteria_failed: Vec<String>,
}

/// Graham criteria over available metrics. Strict mode needs three passes and
/// no failures; lenient mode needs two passes.
pub fn graham_check(m: &FundamentalMetrics, strict: bool) -> GrahamCheck {
    let mut met = Vec::new();
    let mut failed = Vec::new();

    if let Some(pb) = m.price_to_book {
        if pb < 1.5 {
            met.push(format!("P/B {pb:.2} < 1.5"));
        } else {
            failed.push(format!("P/B {pb:.2} >= 1.5"));
        }
    }
    if let Some(pe) = m.price_to_earnings.filter(|pe| *pe > 0.0) {
        if pe < 15.0 {
            met.push(format!("P/E {pe:.2} < 15"));
        } else {
            failed.push(format!("P/E {pe:.2} >= 15"));
        }
    }
    if let Some(r) = m.ncav_ratio {
        if r < NET_NET_FACTOR {
            met.push(format!("Price/NCAV {r:.2} < 0.67 (net-net)"));
        } else if r < 1.0 {
            met.push(format!("Price/NCAV {r:.2} < 1.0"));
        }
    }
    if let Some(de) = m.debt_to_equity {
        if de < 0.5 {
            met.push(format!("D/E {de:.2} < 0.5"));
        } else {
            failed.push(format!("D/E {de:.2} >= 0.5"));
        }
    }

    let is_value = if strict { met.len() >= 3 && failed.is_empty() } else { met.len() >= 2 };
    GrahamCheck { is_value, criteria_met: met, criteria_failed: failed }
}

/// [`FundamentalsSource`] backed by Yahoo Finance and DeFiLlama.
pub struct YahooFundamentalsFeed {
    yahoo: YahooClient,
    llama: DefiLlamaClient,
    sources: SourcesConfig,
    cache: TtlCache<String, FundamentalMetrics>,
}

impl YahooFundamentalsFeed {
    pub fn new(yahoo: YahooClient, llama: DefiLlamaClient, sources: SourcesConfig, ttl: Duration) -> Self {
        Self { yahoo, llama, sources, cache: TtlCache::new("fundamentals", ttl) }
    }

    async fn fetch(&self, symbol: &str) -> Result<FundamentalMetrics> {
        if self.sources.is_crypto(symbol) {
            let base = base_asset(symbol);
            let tvl = self.llama.current_tvl(chain_for_symbol(symbol)).await?;
            // market cap is optional; the proxy falls back to a default P/B
            let quote = match self.yahoo.quote_summary(&format!("{base}-USD")).await {
                Ok(q) => Some(q),
                Err(e) => {
                    debug!("no market cap for {}: {}", base, e);
                    None
                }
            };
            let market_cap = quote.as_ref().and_then(|q| q.market_cap);
            let price = quote.as_ref().and_then(|q| q.price);
            Ok(crypto_proxy_metrics(symbol, tvl, market_cap, price))
        } else {
            let summary = self.yahoo.quote_summary(symbol).await?;
            Ok(equity_metrics(symbol, &summary))
        }
    }
}

#[async_trait]
impl FundamentalsSource for YahooFundamentalsFeed {
    async fn value_metrics(&self, symbol: &str) -> Fundamentals {
        let key = symbol.to_ascii_uppercase();
        if let Some(m) = self.cache.get(&key) {
            return Fundamentals::Available(m);
        }
        match self.fetch(symbol).await {
            Ok(m) => {
                self.cache.insert(key, m.clone());
                Fundamentals::Available(m)
            }
            Err(e) => {
                warn!("fundamentals unavailable for {}: {}", symbol, e);
                record_source_failure("fundamentals");
                Fundamentals::Unavailable
            }
        }
    }
}
