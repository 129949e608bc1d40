//! Declarative rule evaluation.
//!
//! A [`Rule`] is a set of threshold [`Condition`]s over named metrics (see
//! `UnifiedMarketRecord::metrics`). Evaluating a rule yields one
//! [`TriggerCondition`] per condition so the outcome can be audited.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Data category a rule or trigger reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Fundamental,
    Polymarket,
    Onchain,
    Technical,
    News,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Fundamental => "fundamental",
            DataSource::Polymarket => "polymarket",
            DataSource::Onchain => "onchain",
            DataSource::Technical => "technical",
            DataSource::News => "news",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Neq,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Lte => "<=",
            Operator::Gte => ">=",
            Operator::Eq => "==",
            Operator::Neq => "!=",
        }
    }

    pub fn apply(&self, value: f64, threshold: f64) -> bool {
        match self {
            Operator::Lt => value < threshold,
            Operator::Gt => value > threshold,
            Operator::Lte => value <= threshold,
            Operator::Gte => value >= threshold,
            Operator::Eq => value == threshold,
            Operator::Neq => value != threshold,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one evaluated condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerStatus {
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "FAIL")]
    Fail,
    #[serde(rename = "N/A")]
    NotAvailable,
    #[serde(rename = "MONITORED")]
    Monitored,
    #[serde(rename = "NEUTRAL")]
    Neutral,
}

impl TriggerStatus {
    pub fn from_bool(passed: bool) -> Self {
        if passed {
            TriggerStatus::Pass
        } else {
            TriggerStatus::Fail
        }
    }
}

/// A single evaluated condition, as recorded in audit trails and decision logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerCondition {
    pub source: DataSource,
    pub metric: String,
    pub value: f64,
    pub threshold_operator: Operator,
    pub threshold_value: f64,
    pub status: TriggerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub metric: String,
    pub operator: Operator,
    pub threshold: f64,
}

impl Condition {
    pub fn new(metric: impl Into<String>, operator: Operator, threshold: f64) -> Self {
        Self { metric: metric.into(), operator, threshold }
    }

    pub fn evaluate(&self, value: f64) -> bool {
        self.operator.apply(value, self.threshold)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub source: DataSource,
    pub conditions: Vec<Condition>,
}

impl Rule {
    /// Evaluate every condition against `metrics`.
    ///
    /// The rule passes only when all conditions pass. A missing metric fails
    /// the rule and is reported as `N/A`.
    pub fn evaluate(&self, metrics: &BTreeMap<String, f64>) -> (bool, Vec<TriggerCondition>) {
        let mut all_passed = true;
        let mut triggers = Vec::with_capacity(self.conditions.len());

        for cond in &self.conditions {
            let Some(&value) = metrics.get(&cond.metric) else {
                all_passed = false;
                triggers.push(TriggerCondition {
                    source: self.source,
                    metric: cond.metric.clone(),
                    value: 0.0,
                    threshold_operator: cond.operator,
                    threshold_value: cond.threshold,
                    status: TriggerStatus::NotAvailable,
                    reasoning: Some(format!("Metric {} not available", cond.metric)),
                });
                continue;
            };

            let passed = cond.evaluate(value);
            all_passed &= passed;
            triggers.push(TriggerCondition {
                source: self.source,
                metric: cond.metric.clone(),
                value,
                threshold_operator: cond.operator,
                threshold_value: cond.threshold,
                status: TriggerStatus::from_bool(passed),
                reasoning: Some(format!("{} {:.4} {} {}", cond.metric, value, cond.operator, cond.threshold)),
            });
        }

        (all_passed, triggers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Operator::Lt, 1.0, 2.0, true)]
    #[case(Operator::Lt, 2.0, 2.0, false)]
    #[case(Operator::Lte, 2.0, 2.0, true)]
    #[case(Operator::Gt, 3.0, 2.0, true)]
    #[case(Operator::Gte, 2.0, 2.0, true)]
    #[case(Operator::Eq, 2.0, 2.0, true)]
    #[case(Operator::Neq, 2.0, 2.0, false)]
    fn operators(#[case] op: Operator, #[case] v: f64, #[case] t: f64, #[case] expected: bool) {
        assert_eq!(op.apply(v, t), expected);
    }

    #[test]
    fn rule_reports_each_condition() {
        let rule = Rule {
            id: "cheap".into(),
            source: DataSource::Fundamental,
            conditions: vec![
                Condition::new("pb_ratio", Operator::Lt, 1.5),
                Condition::new("debt_to_equity", Operator::Lt, 0.5),
                Condition::new("ncav_ratio", Operator::Lt, 0.67),
            ],
        };
        let metrics: BTreeMap<String, f64> =
            [("pb_ratio".to_string(), 1.2), ("debt_to_equity".to_string(), 0.8)].into_iter().collect();

        let (passed, triggers) = rule.evaluate(&metrics);
        assert!(!passed);
        let statuses: Vec<_> = triggers.iter().map(|t| t.status).collect();
        assert_eq!(statuses, vec![TriggerStatus::Pass, TriggerStatus::Fail, TriggerStatus::NotAvailable]);
    }

    #[test]
    fn rule_deserializes_from_symbolic_operators() {
        let rule: Rule = serde_json::from_value(serde_json::json!({
            "id": "oversold",
            "source": "technical",
            "conditions": [{"metric": "rsi_14", "operator": "<=", "threshold": 30}]
        }))
        .unwrap();
        assert_eq!(rule.conditions[0].operator, Operator::Lte);

        let status = serde_json::to_string(&TriggerStatus::NotAvailable).unwrap();
        assert_eq!(status, "\"N/A\"");
    }
}
