//! Majority vote across sources with a macro-risk veto.
//!
//! Each source casts at most one vote. A high-probability crash/crisis/
//! recession event turns every BUY vote into HOLD before counting. An action
//! wins with at least two votes; BUY and SELL both reaching two is a tie and
//! resolves to HOLD.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::record::{EventOdds, Fundamentals, OnChain, Sentiment};
use crate::indicators::TechnicalReading;
use crate::trading::Action;
use crate::utils::{contains_any, mean};

/// Event keywords (name or title) that can veto BUY votes.
pub const VETO_KEYWORDS: &[&str] = &["crash", "crisis", "recession"];
/// Event probability above which the veto applies.
pub const VETO_PROBABILITY: f64 = 0.7;

const MIN_VOTES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoteCounts {
    pub buy: usize,
    pub sell: usize,
    pub hold: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consensus {
    pub action: Action,
    pub confidence: f64,
    pub sources_count: usize,
    pub votes: VoteCounts,
    pub vetoed: bool,
    pub reason: String,
}

impl Default for Consensus {
    fn default() -> Self {
        Self {
            action: Action::Hold,
            confidence: 0.0,
            sources_count: 0,
            votes: VoteCounts::default(),
            vetoed: false,
            reason: "no source produced a vote".to_string(),
        }
    }
}

impl Consensus {
    pub fn is_buy_with(&self, min_sources: usize) -> bool {
        self.action == Action::Buy && self.sources_count >= min_sources
    }
}

/// Collect one vote per contributing source.
pub fn collect_votes(
    fundamentals: &Fundamentals,
    onchain: &OnChain,
    technical: Option<&TechnicalReading>,
) -> Vec<(Action, f64)> {
    let mut votes = Vec::with_capacity(3);

    if let Some(t) = technical {
        votes.push((t.signal, t.confidence));
    }

    if let Some(f) = fundamentals.as_available() {
        if f.value_score > 70.0 {
            votes.push((Action::Buy, 0.7));
        } else if f.value_score < 30.0 {
            votes.push((Action::Sell, 0.6));
        }
    }

    match onchain.sentiment() {
        Some(Sentiment::Bullish) => votes.push((Action::Buy, 0.6)),
        Some(Sentiment::Bearish) => votes.push((Action::Sell, 0.6)),
        _ => {}
    }

    votes
}

/// True when any event matches the veto keywords above the veto probability.
pub fn macro_veto(events: &BTreeMap<String, EventOdds>) -> bool {
    events.iter().any(|(name, odds)| {
        odds.yes_probability > VETO_PROBABILITY
            && (contains_any(name, VETO_KEYWORDS) || contains_any(&odds.title, VETO_KEYWORDS))
    })
}

/// Tally votes into a consensus.
pub fn tally(mut votes: Vec<(Action, f64)>, vetoed: bool) -> Consensus {
    if votes.is_empty() {
        return Consensus::default();
    }

    if vetoed {
        for (action, _) in votes.iter_mut() {
            if *action == Action::Buy {
                *action = Action::Hold;
            }
        }
    }

    let count = |a: Action| votes.iter().filter(|(v, _)| *v == a).count();
    let counts = VoteCounts { buy: count(Action::Buy), sell: count(Action::Sell), hold: count(Action::Hold) };

    let winner = match (counts.buy >= MIN_VOTES, counts.sell >= MIN_VOTES) {
        (true, false) => Some(Action::Buy),
        (false, true) => Some(Action::Sell),
        _ => None,
    };

    let (action, confidence, reason) = match winner {
        Some(action) => {
            let confs: Vec<f64> = votes.iter().filter(|(v, _)| *v == action).map(|(_, c)| *c).collect();
            let n = confs.len();
            let conf = mean(&confs).unwrap_or(0.0);
            (action, conf, format!("{n} of {} sources agree on {action}", votes.len()))
        }
        None if counts.buy >= MIN_VOTES && counts.sell >= MIN_VOTES => {
            (Action::Hold, 0.5, "BUY and SELL tied".to_string())
        }
        None => (Action::Hold, 0.5, "no majority".to_string()),
    };

    Consensus {
        action,
        confidence: confidence.clamp(0.0, 1.0),
        sources_count: votes.len(),
        votes: counts,
        vetoed,
        reason,
    }
}

/// Full consensus computation for one record's inputs.
pub fn calculate_consensus(
    events: &BTreeMap<String, EventOdds>,
    onchain: &OnChain,
    fundamentals: &Fundamentals,
    technical: Option<&TechnicalReading>,
) -> Consensus {
    let votes = collect_votes(fundamentals, onchain, technical);
    let vetoed = !votes.is_empty() && macro_veto(events);
    tally(votes, vetoed)
}
