//! Decision log records and the store abstraction behind them.
//!
//! A [`DecisionLog`] captures one agent decision with the trigger conditions
//! that produced it. Durable backends live outside this crate; they plug in
//! through [`DecisionStore`]. [`InMemoryDecisionStore`] backs the CLI and tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::rules::TriggerCondition;
use crate::trading::{Action, Signal};
use crate::utils::error::Result;

/// Lifecycle of a logged decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Executed,
}

/// Complete decision record with its audit context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionLog {
    pub decision_log_id: String,
    pub timestamp: DateTime<Utc>,
    pub strategy_name: String,
    pub asset: String,
    pub decision: Action,
    pub confidence: f64,
    pub position_size: Option<f64>,
    pub triggers_met: Vec<TriggerCondition>,
    pub metadata: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub execution_status: ExecutionStatus,
}

/// Random 128-bit id, hex encoded.
pub fn new_decision_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

impl DecisionLog {
    /// Log entry for `signal`; HOLD decisions carry no position size.
    pub fn from_signal(signal: &Signal, triggers: Vec<TriggerCondition>) -> Self {
        Self {
            decision_log_id: new_decision_id(),
            timestamp: signal.timestamp,
            strategy_name: signal.agent_name.clone(),
            asset: signal.symbol.clone(),
            decision: signal.action,
            confidence: signal.confidence,
            position_size: signal.action.is_actionable().then_some(signal.size),
            triggers_met: triggers,
            metadata: BTreeMap::from([("reason".to_string(), serde_json::Value::from(signal.reason.clone()))]),
            execution_status: ExecutionStatus::Pending,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DecisionStore: Send + Sync {
    /// Persist a decision, returning its id.
    async fn log_decision(&self, log: &DecisionLog) -> Result<String>;

    async fn get_decision(&self, id: &str) -> Result<Option<DecisionLog>>;

    /// Most recent decisions first, optionally for one strategy.
    async fn recent_decisions<'a>(&self, strategy: Option<&'a str>, limit: usize) -> Result<Vec<DecisionLog>>;

    /// Returns false when `id` is unknown.
    async fn update_status(&self, id: &str, status: ExecutionStatus) -> Result<bool>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct InMemoryDecisionStore {
    logs: RwLock<Vec<DecisionLog>>,
}

impl InMemoryDecisionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.logs.read().await.len()
    }
}

#[async_trait]
impl DecisionStore for InMemoryDecisionStore {
    async fn log_decision(&self, log: &DecisionLog) -> Result<String> {
        self.logs.write().await.push(log.clone());
        Ok(log.decision_log_id.clone())
    }

    async fn get_decision(&self, id: &str) -> Result<Option<DecisionLog>> {
        Ok(self.logs.read().await.iter().find(|l| l.decision_log_id == id).cloned())
    }

    async fn recent_decisions<'a>(&self, strategy: Option<&'a str>, limit: usize) -> Result<Vec<DecisionLog>> {
        let logs = self.logs.read().await;
        Ok(logs
            .iter()
            .rev()
            .filter(|l| strategy.map_or(true, |s| l.strategy_name == s))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update_status(&self, id: &str, status: ExecutionStatus) -> Result<bool> {
        let mut logs = self.logs.write().await;
        match logs.iter_mut().find(|l| l.decision_log_id == id) {
            Some(log) => {
                log.execution_status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{DataSource, Operator, TriggerStatus};

    fn trigger() -> TriggerCondition {
        TriggerCondition {
            source: DataSource::Fundamental,
            metric: "price_to_book".into(),
            value: 1.2,
            threshold_operator: Operator::Lt,
            threshold_value: 1.5,
            status: TriggerStatus::Pass,
            reasoning: None,
        }
    }

    #[test]
    fn ids_are_random_hex() {
        let a = new_decision_id();
        let b = new_decision_id();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn json_carries_status_and_triggers() {
        let signal = Signal::new("rule_set", "XYZ", Action::Buy, 0.5, 200.0, 10.0, "1/2 rules passed");
        let log = DecisionLog::from_signal(&signal, vec![trigger()]).with_metadata("rules_passed", 1);
        let json: serde_json::Value = serde_json::from_str(&log.to_json().unwrap()).unwrap();
        assert_eq!(json["execution_status"], "PENDING");
        assert_eq!(json["decision"], "BUY");
        assert_eq!(json["position_size"], 200.0);
        assert_eq!(json["triggers_met"][0]["threshold_operator"], "<");
        assert_eq!(json["metadata"]["rules_passed"], 1);
    }

    #[test]
    fn hold_has_no_position_size() {
        let signal = Signal::hold("defensive_value", "XYZ", 0.5, 10.0, "Only 1/3 conditions met");
        assert_eq!(DecisionLog::from_signal(&signal, Vec::new()).position_size, None);
    }

    #[tokio::test]
    async fn in_memory_store_round_trip() {
        let store = InMemoryDecisionStore::new();
        let a = DecisionLog::from_signal(&Signal::hold("a", "X", 0.5, 1.0, "r"), Vec::new());
        let b = DecisionLog::from_signal(&Signal::new("b", "X", Action::Sell, 0.6, 0.0, 1.0, "r"), Vec::new());
        let id = store.log_decision(&a).await.unwrap();
        store.log_decision(&b).await.unwrap();

        assert_eq!(store.get_decision(&id).await.unwrap(), Some(a.clone()));
        assert!(store.update_status(&id, ExecutionStatus::Approved).await.unwrap());
        assert!(!store.update_status("missing", ExecutionStatus::Approved).await.unwrap());

        let recent = store.recent_decisions(None, 10).await.unwrap();
        assert_eq!(recent[0].strategy_name, "b");
        assert_eq!(recent[1].execution_status, ExecutionStatus::Approved);
        assert_eq!(store.recent_decisions(Some("a"), 10).await.unwrap().len(), 1);
    }
}
