//! Defensive value screening and banking-crisis detection.
//!
//! Both agents read the whole fused record. The defensive value agent needs
//! two of three independent confirmations (valuation, macro odds, oversold
//! RSI) before it enters. Missing event or RSI data passes the risk filters;
//! missing fundamentals mean no entry at all.

use async_trait::async_trait;
use tracing::debug;

use super::{Agent, PerformanceTracker};
use crate::fusion::{FundamentalMetrics, Sentiment, Severity, UnifiedMarketRecord};
use crate::sources::fundamentals::NET_NET_FACTOR;
use crate::trading::{Action, Signal};
use crate::utils::contains_any;
use crate::utils::error::Result;

const RECESSION_KEYWORDS: &[&str] = &["recession"];
const CONFLICT_KEYWORDS: &[&str] = &["war", "conflict", "crisis"];
const BANKING_KEYWORDS: &[&str] = &["bank", "svb", "credit", "crisis"];

#[derive(Debug, Clone, PartialEq)]
pub struct DefensiveValueParams {
    pub pb_threshold: f64,
    pub pe_threshold: f64,
    pub debt_threshold: f64,
    pub recession_threshold: f64,
    pub conflict_threshold: f64,
    pub rsi_threshold: f64,
    /// Fraction of capital per entry
    pub position_pct: f64,
    pub capital: f64,
}

impl Default for DefensiveValueParams {
    fn default() -> Self {
        Self {
            pb_threshold: 1.5,
            pe_threshold: 15.0,
            debt_threshold: 0.5,
            recession_threshold: 0.25,
            conflict_threshold: 0.15,
            rsi_threshold: 35.0,
            position_pct: 0.02,
            capital: super::DEFAULT_CAPITAL,
        }
    }
}

/// Outcome of one confirmation group.
struct Check {
    passed: bool,
    reason: String,
}

impl Check {
    fn new(passed: bool, reason: impl Into<String>) -> Self {
        Self { passed, reason: reason.into() }
    }

    fn mark(&self) -> String {
        if self.passed {
            format!("✓ {}", self.reason)
        } else {
            format!("✗ {}", self.reason)
        }
    }
}

/// Graham-style defensive value with event and technical confirmation.
#[derive(Debug, Clone)]
pub struct DefensiveValueAgent {
    name: String,
    params: DefensiveValueParams,
    performance: PerformanceTracker,
}

impl DefensiveValueAgent {
    pub fn new(name: &str, params: DefensiveValueParams) -> Self {
        Self { name: name.to_string(), params, performance: PerformanceTracker::new() }
    }

    fn check_value(&self, f: &FundamentalMetrics) -> Check {
        let p = &self.params;
        let mut passed = Vec::new();
        let mut failed = Vec::new();

        if let Some(pb) = f.price_to_book {
            if pb < p.pb_threshold {
                passed.push(format!("P/B {pb:.2}"));
            } else {
                failed.push(format!("P/B {pb:.2} >= {}", p.pb_threshold));
            }
        }

        match (f.ncav_ratio, f.price_to_earnings) {
            (Some(ncav), _) if ncav < NET_NET_FACTOR => passed.push(format!("NCAV {ncav:.2} (net-net)")),
            (_, Some(pe)) if pe > 0.0 && pe < p.pe_threshold => passed.push(format!("P/E {pe:.1}")),
            _ => failed.push("neither NCAV nor P/E criteria met".to_string()),
        }

        if let Some(de) = f.debt_to_equity {
            if de < p.debt_threshold {
                passed.push(format!("D/E {de:.2}"));
            } else {
                failed.push(format!("D/E {de:.2} >= {}", p.debt_threshold));
            }
        }

        if passed.len() >= 2 {
            Check::new(true, format!("Value: {}", passed.join(", ")))
        } else {
            Check::new(false, format!("Value FAIL: {}", failed.join(", ")))
        }
    }

    fn check_macro(&self, record: &UnifiedMarketRecord) -> Check {
        if record.events.is_empty() {
            return Check::new(true, "Macro: no event data");
        }
        let mut risks = Vec::new();
        for (name, odds) in &record.events {
            let prob = odds.yes_probability;
            if contains_any(name, RECESSION_KEYWORDS) && prob >= self.params.recession_threshold {
                risks.push(format!("recession {:.0}%", prob * 100.0));
            }
            if contains_any(name, CONFLICT_KEYWORDS) && prob >= self.params.conflict_threshold {
                risks.push(format!("{} {:.0}%", name, prob * 100.0));
            }
        }
        if risks.is_empty() {
            Check::new(true, "Macro: low risk environment")
        } else {
            Check::new(false, format!("Macro RISK: {}", risks.join(", ")))
        }
    }

    fn check_technical(&self, record: &UnifiedMarketRecord) -> Check {
        match record.rsi() {
            None => Check::new(true, "Technical: no data"),
            Some(rsi) if rsi < self.params.rsi_threshold => {
                Check::new(true, format!("Technical: RSI {rsi:.1} oversold"))
            }
            Some(rsi) => Check::new(false, format!("Technical: RSI {rsi:.1} not oversold")),
        }
    }
}

#[async_trait]
impl Agent for DefensiveValueAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn evaluate(&mut self, record: &UnifiedMarketRecord) -> Result<Option<Signal>> {
        let price = record.price();

        if let Some(conflict) = record.conflicts.iter().find(|c| c.severity == Severity::High) {
            debug!("{}: blocked by {:?}", self.name, conflict.kind);
            let reason = format!("BLOCKED: {}", conflict.description);
            return Ok(Some(Signal::hold(&self.name, &record.symbol, 0.0, price, reason)));
        }

        let Some(fundamentals) = record.fundamentals.as_available() else {
            debug!("{}: no fundamentals for {}, no entry", self.name, record.symbol);
            return Ok(None);
        };

        let checks = [
            self.check_value(fundamentals),
            self.check_macro(record),
            self.check_technical(record),
        ];
        let passed = checks.iter().filter(|c| c.passed).count();

        if passed < 2 {
            let reason = format!("Only {passed}/3 conditions met");
            return Ok(Some(Signal::hold(&self.name, &record.symbol, 0.5, price, reason)));
        }

        let mut confidence = 0.6 + 0.1 * passed as f64;
        if record.consensus.is_buy_with(2) {
            confidence = (confidence + 0.1).min(0.95);
        }
        let marks: Vec<String> = checks.iter().map(Check::mark).collect();
        let reason = format!("BUY ({passed}/3 checks): {}", marks.join(" | "));
        debug!("{}: {}", self.name, reason);

        Ok(Some(Signal::new(
            &self.name,
            &record.symbol,
            Action::Buy,
            confidence,
            self.params.capital * self.params.position_pct,
            price,
            reason,
        )))
    }

    fn performance(&self) -> &PerformanceTracker {
        &self.performance
    }

    fn performance_mut(&mut self) -> &mut PerformanceTracker {
        &mut self.performance
    }
}

/// Sells when banking-crisis odds are high and capital is leaving the chain.
#[derive(Debug, Clone)]
pub struct CrisisDetectorAgent {
    name: String,
    threshold: f64,
    capital: f64,
    performance: PerformanceTracker,
}

impl CrisisDetectorAgent {
    pub fn new(name: &str, threshold: f64, capital: f64) -> Self {
        Self { name: name.to_string(), threshold, capital, performance: PerformanceTracker::new() }
    }
}

#[async_trait]
impl Agent for CrisisDetectorAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn evaluate(&mut self, record: &UnifiedMarketRecord) -> Result<Option<Signal>> {
        let crisis = record
            .events
            .iter()
            .find(|(name, odds)| contains_any(name, BANKING_KEYWORDS) && odds.yes_probability > self.threshold);
        let Some((event, odds)) = crisis else {
            return Ok(None);
        };
        if record.onchain.sentiment() != Some(Sentiment::Bearish) {
            debug!("{}: {} elevated but no on-chain outflows", self.name, event);
            return Ok(None);
        }
        let reason = format!(
            "CRISIS DETECTED: {} at {:.0}% with on-chain outflows",
            event,
            odds.yes_probability * 100.0
        );
        Ok(Some(Signal::new(
            &self.name,
            &record.symbol,
            Action::Sell,
            0.9,
            self.capital * 0.5,
            record.price(),
            reason,
        )))
    }

    fn performance(&self) -> &PerformanceTracker {
        &self.performance
    }

    fn performance_mut(&mut self) -> &mut PerformanceTracker {
        &mut self.performance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::test_support::{event, record, value_metrics, with_onchain};

    fn agent() -> DefensiveValueAgent {
        DefensiveValueAgent::new("defensive_value", DefensiveValueParams::default())
    }

    #[tokio::test]
    async fn cheap_quiet_oversold_buys() {
        let mut rec = record("XYZ", 10.0);
        rec.fundamentals = value_metrics(Some(1.0), Some(10.0), Some(0.3));
        rec.technical = Some(crate::indicators::TechnicalReading::from_closes(
            &(1..=30).rev().map(f64::from).collect::<Vec<_>>(),
        ));

        let signal = agent().evaluate(&rec).await.unwrap().unwrap();
        assert_eq!(signal.action, Action::Buy);
        // three groups pass
        assert!((signal.confidence - 0.9).abs() < 1e-9);
        assert!((signal.size - 200.0).abs() < 1e-9);
        assert!(signal.reason.starts_with("BUY (3/3 checks)"));
    }

    #[tokio::test]
    async fn missing_rsi_and_events_pass_filters() {
        let mut rec = record("XYZ", 10.0);
        rec.fundamentals = value_metrics(Some(1.2), None, Some(0.2));
        let signal = agent().evaluate(&rec).await.unwrap().unwrap();
        assert_eq!(signal.action, Action::Buy);
        assert!(signal.confidence >= 0.6);
    }

    #[tokio::test]
    async fn recession_odds_and_expensive_book_hold() {
        let mut rec = record("XYZ", 10.0);
        rec.fundamentals = value_metrics(Some(4.0), Some(40.0), Some(1.0));
        rec.events.insert("recession_2025".into(), event("recession_2025", "US recession", 0.4));
        let signal = agent().evaluate(&rec).await.unwrap().unwrap();
        assert_eq!(signal.action, Action::Hold);
        assert_eq!(signal.reason, "Only 1/3 conditions met");
        assert!((signal.confidence - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn unavailable_fundamentals_never_enter() {
        // events and RSI missing too: both risk filters would pass
        let rec = record("XYZ", 10.0);
        assert!(agent().evaluate(&rec).await.unwrap().is_none());

        let mut oversold = record("XYZ", 10.0);
        oversold.technical = Some(crate::indicators::TechnicalReading::from_closes(
            &(1..=30).rev().map(f64::from).collect::<Vec<_>>(),
        ));
        assert!(agent().evaluate(&oversold).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn crisis_needs_odds_and_outflows() {
        let mut detector = CrisisDetectorAgent::new("crisis_detector", 0.7, 10_000.0);
        let mut rec = record("ETH", 3000.0);
        rec.events.insert("banking_crisis".into(), event("banking_crisis", "Bank failure", 0.76));
        assert!(detector.evaluate(&rec).await.unwrap().is_none());

        let rec = with_onchain(rec, -8.0);
        let signal = detector.evaluate(&rec).await.unwrap().unwrap();
        assert_eq!(signal.action, Action::Sell);
        assert!((signal.confidence - 0.9).abs() < 1e-9);
        assert!((signal.size - 5_000.0).abs() < 1e-9);
    }
}
