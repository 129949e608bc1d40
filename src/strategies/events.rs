//! Prediction-market driven agents.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::debug;

use super::{Agent, PerformanceTracker};
use crate::fusion::UnifiedMarketRecord;
use crate::trading::{Action, Signal};
use crate::utils::error::Result;

/// Event name the rate agents watch.
pub const FED_HIKE_EVENT: &str = "fed_hike";

/// Notional size of event-driven entries.
const EVENT_SIZE: f64 = 100.0;

/// Trades Fed hike odds and regime shifts across all configured events.
#[derive(Debug, Clone)]
pub struct EventDrivenAgent {
    name: String,
    fed_threshold: f64,
    shift_threshold: f64,
    prev_probs: BTreeMap<String, f64>,
    performance: PerformanceTracker,
}

impl EventDrivenAgent {
    pub fn new(name: &str, fed_threshold: f64, shift_threshold: f64) -> Self {
        Self {
            name: name.to_string(),
            fed_threshold,
            shift_threshold,
            prev_probs: BTreeMap::new(),
            performance: PerformanceTracker::new(),
        }
    }

    /// Last seen probability and the shift to `prob`; first sightings have no shift.
    fn observe(&mut self, event: &str, prob: f64) -> (f64, f64) {
        let prev = self.prev_probs.insert(event.to_string(), prob).unwrap_or(prob);
        (prev, (prob - prev).abs())
    }
}

#[async_trait]
impl Agent for EventDrivenAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn evaluate(&mut self, record: &UnifiedMarketRecord) -> Result<Option<Signal>> {
        if record.events.is_empty() {
            return Ok(None);
        }

        let mut action = Action::Hold;
        let mut confidence: f64 = 0.5;
        let mut reason = String::from("No significant event triggers");

        if let Some(fed) = record.events.get(FED_HIKE_EVENT) {
            let prob = fed.yes_probability;
            let (prev, shift) = self.observe(FED_HIKE_EVENT, prob);
            if prob > self.fed_threshold {
                action = Action::Sell;
                confidence = prob;
                reason = format!(
                    "Fed hike at {:.1}% (threshold {:.1}%), rate-sensitive positioning",
                    prob * 100.0,
                    self.fed_threshold * 100.0
                );
            } else if shift > self.shift_threshold {
                action = if prob > prev { Action::Sell } else { Action::Buy };
                confidence = 0.6 + shift;
                reason = format!(
                    "Fed odds shifted {:.1}% ({:.1}% -> {:.1}%), regime change",
                    shift * 100.0,
                    prev * 100.0,
                    prob * 100.0
                );
            }
        }

        for (name, odds) in record.events.iter().filter(|(n, _)| n.as_str() != FED_HIKE_EVENT) {
            let prob = odds.yes_probability;
            let (prev, shift) = self.observe(name, prob);
            if shift > self.shift_threshold {
                action = if prob > prev { Action::Buy } else { Action::Sell };
                confidence = confidence.max(0.7);
                reason.push_str(&format!(" | {}: {:.1}% shift", name, shift * 100.0));
            }
        }

        if action == Action::Hold {
            return Ok(None);
        }
        debug!("{}: {} {:.2} ({})", self.name, action, confidence, reason);
        Ok(Some(Signal::new(&self.name, &record.symbol, action, confidence, EVENT_SIZE, record.price(), reason)))
    }

    fn performance(&self) -> &PerformanceTracker {
        &self.performance
    }

    fn performance_mut(&mut self) -> &mut PerformanceTracker {
        &mut self.performance
    }
}

/// Trades only crossings of the Fed hike probability through one threshold.
#[derive(Debug, Clone)]
pub struct FedHikeAgent {
    name: String,
    threshold: f64,
    last_prob: f64,
    performance: PerformanceTracker,
}

impl FedHikeAgent {
    pub fn new(name: &str, threshold: f64) -> Self {
        Self { name: name.to_string(), threshold, last_prob: 0.5, performance: PerformanceTracker::new() }
    }
}

#[async_trait]
impl Agent for FedHikeAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn evaluate(&mut self, record: &UnifiedMarketRecord) -> Result<Option<Signal>> {
        let Some(prob) = record.event_probability(FED_HIKE_EVENT) else {
            return Ok(None);
        };
        let last = std::mem::replace(&mut self.last_prob, prob);

        let (action, confidence, reason) = if prob > self.threshold && last <= self.threshold {
            (
                Action::Sell,
                prob,
                format!("Fed hike odds crossed {:.1}% (now {:.1}%)", self.threshold * 100.0, prob * 100.0),
            )
        } else if prob < self.threshold && last >= self.threshold {
            (
                Action::Buy,
                1.0 - prob,
                format!("Fed hike odds fell below {:.1}% (now {:.1}%)", self.threshold * 100.0, prob * 100.0),
            )
        } else {
            return Ok(None);
        };

        Ok(Some(Signal::new(&self.name, &record.symbol, action, confidence, EVENT_SIZE, record.price(), reason)))
    }

    fn performance(&self) -> &PerformanceTracker {
        &self.performance
    }

    fn performance_mut(&mut self) -> &mut PerformanceTracker {
        &mut self.performance
    }
}
