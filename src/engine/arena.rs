//! Agent arena: every agent sees the same record, one signal wins the round.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::fusion::UnifiedMarketRecord;
use crate::metrics::record_agent_error;
use crate::persistence::{DecisionLog, DecisionStore};
use crate::strategies::{Agent, AgentFactory, AgentStats};
use crate::trading::Signal;
use crate::utils::error::Result;

/// Leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    #[serde(flatten)]
    pub stats: AgentStats,
    pub epoch_wins: usize,
}

/// Result of one round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundResult {
    pub epoch: u64,
    pub winner: Option<Signal>,
    /// Winner picked at random rather than by score
    pub explored: bool,
    pub signals: Vec<Signal>,
    /// (agent, error) for agents that failed this round
    pub errors: Vec<(String, String)>,
    pub explanation: String,
    pub decision_log_id: Option<String>,
}

pub struct Arena {
    agents: Vec<Box<dyn Agent>>,
    epsilon: f64,
    epoch: u64,
    epoch_wins: BTreeMap<String, usize>,
    rng: StdRng,
    store: Option<Arc<dyn DecisionStore>>,
}

impl Arena {
    pub fn new(agents: Vec<Box<dyn Agent>>, epsilon: f64) -> Self {
        let epoch_wins = agents.iter().map(|a| (a.name().to_string(), 0)).collect();
        Self {
            agents,
            epsilon: epsilon.clamp(0.0, 1.0),
            epoch: 0,
            epoch_wins,
            rng: StdRng::from_entropy(),
            store: None,
        }
    }

    /// Arena over every enabled agent of `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(AgentFactory::create_enabled(config)?, config.arena.epsilon))
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Log every round winner to `store`.
    pub fn with_store(mut self, store: Arc<dyn DecisionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn agent_names(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.name()).collect()
    }

    /// Run every agent against `record` and pick a winner among actionable signals.
    pub async fn run_round(&mut self, record: &UnifiedMarketRecord) -> Result<RoundResult> {
        self.epoch += 1;

        let outcomes = join_all(self.agents.iter_mut().map(|a| a.evaluate(record))).await;

        let mut signals = Vec::new();
        let mut errors = Vec::new();
        for (agent, outcome) in self.agents.iter().zip(outcomes) {
            match outcome {
                Ok(Some(signal)) if signal.action.is_actionable() => {
                    debug!("{}: {} @ {:.2}", agent.name(), signal.action, signal.confidence);
                    signals.push(signal);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("agent {} failed in epoch {}: {}", agent.name(), self.epoch, e);
                    record_agent_error(agent.name().to_string());
                    errors.push((agent.name().to_string(), e.to_string()));
                }
            }
        }

        if signals.is_empty() {
            return Ok(RoundResult {
                epoch: self.epoch,
                winner: None,
                explored: false,
                signals,
                errors,
                explanation: "No agents produced signals".to_string(),
                decision_log_id: None,
            });
        }

        let (idx, explored) = self.select_winner(&signals);
        let winner = signals[idx].clone();
        *self.epoch_wins.entry(winner.agent_name.clone()).or_default() += 1;
        let explanation = explain(&winner, record);
        info!("epoch {} winner {}{}", self.epoch, winner.agent_name, if explored { " (explore)" } else { "" });

        // a store failure loses the log entry, not the round
        let decision_log_id = match &self.store {
            Some(store) => {
                let log = DecisionLog::from_signal(&winner, Vec::new())
                    .with_metadata("epoch", self.epoch)
                    .with_metadata("explored", explored)
                    .with_metadata("competing_signals", signals.len());
                match store.log_decision(&log).await {
                    Ok(id) => Some(id),
                    Err(e) => {
                        warn!("could not log epoch {} decision for {}: {}", self.epoch, winner.agent_name, e);
                        None
                    }
                }
            }
            None => None,
        };

        Ok(RoundResult { epoch: self.epoch, winner: Some(winner), explored, signals, errors, explanation, decision_log_id })
    }

    /// Epsilon-greedy over `0.5*confidence + 0.3*win_rate + 0.2*epoch_win_share`.
    fn select_winner(&mut self, signals: &[Signal]) -> (usize, bool) {
        if self.rng.gen::<f64>() < self.epsilon {
            return (self.rng.gen_range(0..signals.len()), true);
        }
        let epochs = self.epoch.max(1) as f64;
        let score = |s: &Signal| {
            let win_rate = self.agents.iter().find(|a| a.name() == s.agent_name).map_or(0.0, |a| a.stats().win_rate);
            let wins = self.epoch_wins.get(&s.agent_name).copied().unwrap_or(0) as f64;
            0.5 * s.confidence + 0.3 * win_rate + 0.2 * wins / epochs
        };
        let best = signals
            .iter()
            .enumerate()
            .map(|(i, s)| (i, score(s)))
            .fold((0, f64::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });
        (best.0, false)
    }

    /// Feed a realized trade result back to `agent`. Returns false for unknown agents.
    pub fn record_outcome(&mut self, agent: &str, pnl: f64) -> bool {
        match self.agents.iter_mut().find(|a| a.name() == agent) {
            Some(a) => {
                a.record_outcome(pnl);
                true
            }
            None => false,
        }
    }

    /// Agents by total PnL, best first.
    pub fn leaderboard(&self) -> Vec<Standing> {
        let mut board: Vec<Standing> = self
            .agents
            .iter()
            .map(|a| Standing {
                stats: a.stats(),
                epoch_wins: self.epoch_wins.get(a.name()).copied().unwrap_or(0),
            })
            .collect();
        board.sort_by(|a, b| b.stats.pnl.total_cmp(&a.stats.pnl));
        board
    }
}

fn explain(winner: &Signal, record: &UnifiedMarketRecord) -> String {
    let mut out = format!(
        "{} selected ({:.0}% confidence). {}",
        winner.agent_name,
        winner.confidence * 100.0,
        winner.reason
    );
    if !record.events.is_empty() {
        let context: Vec<String> = record
            .events
            .iter()
            .map(|(name, odds)| format!("{}: {:.1}%", name, odds.yes_probability * 100.0))
            .collect();
        out.push_str(&format!(" Event context: {}.", context.join(", ")));
    }
    out
}
