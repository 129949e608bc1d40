//! Audit trail summarising why a record resolved the way it did.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::conflicts::Conflict;
use super::record::UnifiedMarketRecord;
use crate::rules::{DataSource, Operator, TriggerCondition, TriggerStatus};
use crate::trading::Action;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditTrail {
    pub timestamp: DateTime<Utc>,
    pub asset: String,
    pub decision: Action,
    pub confidence: f64,
    pub triggers_met: Vec<TriggerCondition>,
    pub conflicts_detected: Vec<Conflict>,
    pub sources_used: usize,
}

/// Build the audit trail for a fused record.
pub fn audit_trail(record: &UnifiedMarketRecord) -> AuditTrail {
    AuditTrail {
        timestamp: record.timestamp,
        asset: record.symbol.clone(),
        decision: record.consensus.action,
        confidence: record.consensus.confidence,
        triggers_met: extract_triggers(record),
        conflicts_detected: record.conflicts.clone(),
        sources_used: count_sources(record),
    }
}

fn extract_triggers(record: &UnifiedMarketRecord) -> Vec<TriggerCondition> {
    let mut triggers = Vec::new();

    if let Some(pb) = record.fundamentals.as_available().and_then(|f| f.price_to_book) {
        triggers.push(TriggerCondition {
            source: DataSource::Fundamental,
            metric: "price_to_book".into(),
            value: pb,
            threshold_operator: Operator::Lt,
            threshold_value: 1.5,
            status: TriggerStatus::from_bool(pb < 1.5),
            reasoning: None,
        });
    }

    for (name, odds) in &record.events {
        triggers.push(TriggerCondition {
            source: DataSource::Polymarket,
            metric: name.clone(),
            value: odds.yes_probability,
            threshold_operator: Operator::Gte,
            threshold_value: 0.0,
            status: TriggerStatus::Monitored,
            reasoning: Some(odds.title.clone()),
        });
    }

    if let Some(t) = &record.technical {
        if let Some(rsi) = t.rsi_14 {
            let status = if t.signal == Action::Hold { TriggerStatus::Neutral } else { TriggerStatus::Pass };
            triggers.push(TriggerCondition {
                source: DataSource::Technical,
                metric: "rsi_14".into(),
                value: rsi,
                threshold_operator: Operator::Lt,
                threshold_value: 35.0,
                status,
                reasoning: Some("< 35 or > 65".into()),
            });
        }
    }

    triggers
}

fn count_sources(record: &UnifiedMarketRecord) -> usize {
    [
        !record.events.is_empty(),
        record.onchain.is_available(),
        record.fundamentals.is_available(),
        record.technical.is_some(),
    ]
    .into_iter()
    .filter(|used| *used)
    .count()
}
