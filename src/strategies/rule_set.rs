//! Declarative rule agent: BUY once enough configured rules pass.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Agent, PerformanceTracker};
use crate::fusion::UnifiedMarketRecord;
use crate::rules::{Rule, TriggerCondition};
use crate::trading::{Action, Signal};
use crate::utils::error::Result;

/// Outcome of the last evaluation, kept for decision logs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleEvaluation {
    pub rules_passed: usize,
    pub rules_total: usize,
    pub confirmations_required: usize,
    pub triggers: Vec<TriggerCondition>,
}

#[derive(Debug, Clone)]
pub struct RuleSetAgent {
    name: String,
    rules: Vec<Rule>,
    require_confirmations: usize,
    position_size: f64,
    last: Option<RuleEvaluation>,
    performance: PerformanceTracker,
}

impl RuleSetAgent {
    pub fn new(name: &str, rules: Vec<Rule>, require_confirmations: usize, position_size: f64) -> Self {
        Self {
            name: name.to_string(),
            rules,
            require_confirmations,
            position_size,
            last: None,
            performance: PerformanceTracker::new(),
        }
    }

    pub fn last_evaluation(&self) -> Option<&RuleEvaluation> {
        self.last.as_ref()
    }
}

#[async_trait]
impl Agent for RuleSetAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn evaluate(&mut self, record: &UnifiedMarketRecord) -> Result<Option<Signal>> {
        let metrics = record.metrics();
        let mut passed = 0;
        let mut triggers = Vec::new();
        let mut passed_ids = Vec::new();
        for rule in &self.rules {
            let (ok, mut t) = rule.evaluate(&metrics);
            if ok {
                passed += 1;
                passed_ids.push(rule.id.as_str());
            }
            triggers.append(&mut t);
        }

        let total = self.rules.len();
        let confidence = if total == 0 { 0.0 } else { passed as f64 / total as f64 };
        let signal = if passed >= self.require_confirmations {
            let reason = format!("{passed}/{total} rules passed: {}", passed_ids.join(", "));
            Signal::new(&self.name, &record.symbol, Action::Buy, confidence, self.position_size, record.price(), reason)
        } else {
            let reason = format!("{passed}/{total} rules passed, {} required", self.require_confirmations);
            Signal::hold(&self.name, &record.symbol, confidence, record.price(), reason)
        };
        debug!("{}: {}", self.name, signal.reason);

        self.last = Some(RuleEvaluation {
            rules_passed: passed,
            rules_total: total,
            confirmations_required: self.require_confirmations,
            triggers,
        });
        Ok(Some(signal))
    }

    fn performance(&self) -> &PerformanceTracker {
        &self.performance
    }

    fn performance_mut(&mut self) -> &mut PerformanceTracker {
        &mut self.performance
    }
}
