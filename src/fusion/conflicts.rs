//! Cross-source contradiction rules.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::record::{EventOdds, Fundamentals, MarketSnapshot, OnChain, Sentiment};
use crate::indicators::TechnicalReading;
use crate::trading::Action;
use crate::utils::contains_any;

/// Event-name keywords that mark macro risk for rule 1.
pub const MACRO_RISK_KEYWORDS: &[&str] = &["recession", "crash", "crisis", "war"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictKind {
    MacroRiskVsTechnical,
    ValuationVsTechnical,
    OnchainVsPrice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Block,
    Caution,
    Investigate,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Recommendation::Block => "BLOCK",
            Recommendation::Caution => "CAUTION",
            Recommendation::Investigate => "INVESTIGATE",
        };
        f.write_str(s)
    }
}

/// One detected contradiction between sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    #[serde(rename = "type")]
    pub kind: ConflictKind,
    pub severity: Severity,
    pub description: String,
    pub recommendation: Recommendation,
    pub sources: Vec<String>,
}

/// Run every rule and concatenate the results in rule order.
pub fn detect_conflicts(
    events: &BTreeMap<String, EventOdds>,
    onchain: &OnChain,
    fundamentals: &Fundamentals,
    technical: Option<&TechnicalReading>,
    market: &MarketSnapshot,
) -> Vec<Conflict> {
    let technical_signal = technical.map(|t| t.signal).unwrap_or(Action::Hold);
    let mut conflicts = Vec::new();

    // 1. macro risk events against a technical BUY
    if technical_signal == Action::Buy {
        for (name, odds) in events {
            if contains_any(name, MACRO_RISK_KEYWORDS) && odds.yes_probability > 0.6 {
                conflicts.push(Conflict {
                    kind: ConflictKind::MacroRiskVsTechnical,
                    severity: Severity::High,
                    description: format!(
                        "Technical says {} but {} odds at {:.1}%",
                        technical_signal,
                        name,
                        odds.yes_probability * 100.0
                    ),
                    recommendation: Recommendation::Block,
                    sources: vec!["technical".into(), "prediction_markets".into()],
                });
            }
        }
    }

    // 2. rich valuation against a technical BUY; either ratio alone is enough, a missing one never fires
    if let (Some(f), Action::Buy) = (fundamentals.as_available(), technical_signal) {
        let pb_rich = f.price_to_book.is_some_and(|pb| pb > 3.0);
        let pe_rich = f.price_to_earnings.is_some_and(|pe| pe > 30.0);
        if pb_rich || pe_rich {
            conflicts.push(Conflict {
                kind: ConflictKind::ValuationVsTechnical,
                severity: Severity::Medium,
                description: format!(
                    "Overvalued (P/B={}, P/E={}) but technical says BUY",
                    fmt_ratio(f.price_to_book),
                    fmt_ratio(f.price_to_earnings)
                ),
                recommendation: Recommendation::Caution,
                sources: vec!["fundamentals".into(), "technical".into()],
            });
        }
    }

    // 3. capital outflows while price rallies
    if onchain.sentiment() == Some(Sentiment::Bearish) && market.price_change_pct > 5.0 {
        conflicts.push(Conflict {
            kind: ConflictKind::OnchainVsPrice,
            severity: Severity::Medium,
            description: format!(
                "Price up {:.1}% but on-chain shows capital outflows",
                market.price_change_pct
            ),
            recommendation: Recommendation::Investigate,
            sources: vec!["onchain".into(), "market".into()],
        });
    }

    conflicts
}

fn fmt_ratio(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.1}")).unwrap_or_else(|| "n/a".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::record::{FundamentalMetrics, OnChainHealth, SourceTag};

    fn event(prob: f64) -> EventOdds {
        EventOdds {
            source: SourceTag::Polymarket,
            market_id: "m".into(),
            title: "t".into(),
            description: String::new(),
            yes_probability: prob,
            no_probability: 1.0 - prob,
            volume: 0.0,
            liquidity: 0.0,
            close_time: None,
            active: true,
        }
    }

    fn technical(signal: Action) -> TechnicalReading {
        TechnicalReading {
            source: SourceTag::Calculated,
            rsi_14: Some(25.0),
            signal,
            confidence: 0.7,
            note: String::new(),
        }
    }

    fn bearish() -> OnChain {
        OnChain::Available(OnChainHealth {
            source: SourceTag::Defillama,
            symbol: "ETH".into(),
            chain: "Ethereum".into(),
            current_tvl: 1.0,
            tvl_change_1d: -8.0,
            sentiment: Sentiment::Bearish,
            confidence: 0.7,
            reason: String::new(),
        })
    }

    #[test]
    fn macro_risk_blocks_technical_buy() {
        let events: BTreeMap<_, _> = [("recession_2025".to_string(), event(0.65))].into_iter().collect();
        let t = technical(Action::Buy);
        let out = detect_conflicts(&events, &OnChain::Empty, &Fundamentals::Unavailable, Some(&t), &MarketSnapshot::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, ConflictKind::MacroRiskVsTechnical);
        assert_eq!(out[0].severity, Severity::High);
        assert_eq!(out[0].recommendation, Recommendation::Block);
    }

    #[test]
    fn one_conflict_per_matching_event() {
        let events: BTreeMap<_, _> = [
            ("recession".to_string(), event(0.9)),
            ("war".to_string(), event(0.61)),
            ("crash".to_string(), event(0.6)),
        ]
        .into_iter()
        .collect();
        let t = technical(Action::Buy);
        let out = detect_conflicts(&events, &OnChain::Empty, &Fundamentals::Unavailable, Some(&t), &MarketSnapshot::default());
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn rich_valuation_flags_caution() {
        let f = Fundamentals::Available(FundamentalMetrics {
            price_to_earnings: Some(45.0),
            ..FundamentalMetrics::new(SourceTag::YahooFinance, "X")
        });
        let t = technical(Action::Buy);
        let out = detect_conflicts(&BTreeMap::new(), &OnChain::Empty, &f, Some(&t), &MarketSnapshot::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].recommendation, Recommendation::Caution);

        let hold = technical(Action::Hold);
        assert!(detect_conflicts(&BTreeMap::new(), &OnChain::Empty, &f, Some(&hold), &MarketSnapshot::default()).is_empty());
    }

    #[test]
    fn single_rich_ratio_is_enough() {
        let t = technical(Action::Buy);
        let rich_book = Fundamentals::Available(FundamentalMetrics {
            price_to_book: Some(3.5),
            price_to_earnings: Some(12.0),
            ..FundamentalMetrics::new(SourceTag::YahooFinance, "X")
        });
        let out = detect_conflicts(&BTreeMap::new(), &OnChain::Empty, &rich_book, Some(&t), &MarketSnapshot::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].description, "Overvalued (P/B=3.5, P/E=12.0) but technical says BUY");

        let no_ratios = Fundamentals::Available(FundamentalMetrics::new(SourceTag::YahooFinance, "X"));
        assert!(detect_conflicts(&BTreeMap::new(), &OnChain::Empty, &no_ratios, Some(&t), &MarketSnapshot::default()).is_empty());
    }

    #[test]
    fn bearish_onchain_with_rally_needs_investigation() {
        let market = MarketSnapshot::new("ETH", 3000.0).with_change(6.0);
        let out = detect_conflicts(&BTreeMap::new(), &bearish(), &Fundamentals::Unavailable, None, &market);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, ConflictKind::OnchainVsPrice);

        let flat = MarketSnapshot::new("ETH", 3000.0).with_change(5.0);
        assert!(detect_conflicts(&BTreeMap::new(), &bearish(), &Fundamentals::Unavailable, None, &flat).is_empty());
    }

    #[test]
    fn kind_serializes_screaming() {
        let s = serde_json::to_string(&ConflictKind::MacroRiskVsTechnical).unwrap();
        assert_eq!(s, "\"MACRO_RISK_VS_TECHNICAL\"");
    }
}
