//! Thompson-sampling meta agent over a set of sub-agents.

use std::collections::BTreeMap;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Beta, Distribution};
use tracing::{debug, warn};

use super::{Agent, PerformanceTracker};
use crate::fusion::UnifiedMarketRecord;
use crate::metrics::record_agent_error;
use crate::trading::Signal;
use crate::utils::error::{Error, Result};

/// One sub-agent with its Beta posterior over "a trade on its signal wins".
struct Arm {
    agent: Box<dyn Agent>,
    alpha: f64,
    beta: f64,
}

pub struct MetaBanditAgent {
    name: String,
    arms: Vec<Arm>,
    rng: StdRng,
    last_selected: Option<String>,
    selections: BTreeMap<String, usize>,
    performance: PerformanceTracker,
}

impl MetaBanditAgent {
    pub fn new(name: &str, sub_agents: Vec<Box<dyn Agent>>) -> Self {
        let arms = sub_agents.into_iter().map(|agent| Arm { agent, alpha: 1.0, beta: 1.0 }).collect();
        Self {
            name: name.to_string(),
            arms,
            rng: StdRng::from_entropy(),
            last_selected: None,
            selections: BTreeMap::new(),
            performance: PerformanceTracker::new(),
        }
    }

    /// Replace the sampling RNG, e.g. with a seeded one.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn sub_agent_names(&self) -> Vec<&str> {
        self.arms.iter().map(|a| a.agent.name()).collect()
    }

    /// Sub-agent chosen by the last evaluation that produced a signal.
    pub fn last_selected(&self) -> Option<&str> {
        self.last_selected.as_deref()
    }

    pub fn selections(&self) -> &BTreeMap<String, usize> {
        &self.selections
    }

    /// Mean of the Beta posterior of `agent`.
    pub fn posterior_mean(&self, agent: &str) -> Option<f64> {
        self.arm(agent).map(|a| a.alpha / (a.alpha + a.beta))
    }

    fn arm(&self, agent: &str) -> Option<&Arm> {
        self.arms.iter().find(|a| a.agent.name() == agent)
    }

    /// Update the posterior of `agent` with a trade result. Returns false for
    /// unknown agents.
    pub fn update_from_result(&mut self, agent: &str, pnl: f64) -> bool {
        let Some(arm) = self.arms.iter_mut().find(|a| a.agent.name() == agent) else {
            return false;
        };
        if pnl > 0.0 {
            arm.alpha += 1.0;
        } else {
            arm.beta += 1.0;
        }
        arm.agent.record_outcome(pnl);
        true
    }

    fn sample(&mut self, idx: usize) -> Result<f64> {
        let arm = &self.arms[idx];
        let dist = Beta::new(arm.alpha, arm.beta)
            .map_err(|e| Error::StrategyError(format!("{}: invalid posterior: {e}", arm.agent.name())))?;
        Ok(dist.sample(&mut self.rng))
    }
}

#[async_trait]
impl Agent for MetaBanditAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn evaluate(&mut self, record: &UnifiedMarketRecord) -> Result<Option<Signal>> {
        let mut candidates = Vec::new();
        for (idx, arm) in self.arms.iter_mut().enumerate() {
            match arm.agent.evaluate(record).await {
                Ok(Some(signal)) if signal.action.is_actionable() => candidates.push((idx, signal)),
                Ok(_) => {}
                Err(e) => {
                    warn!("{}: sub-agent {} failed: {}", self.name, arm.agent.name(), e);
                    record_agent_error(arm.agent.name().to_string());
                }
            }
        }

        let mut best: Option<(f64, usize, Signal)> = None;
        for (idx, signal) in candidates {
            let draw = self.sample(idx)?;
            if best.as_ref().map_or(true, |(b, _, _)| draw > *b) {
                best = Some((draw, idx, signal));
            }
        }
        let Some((draw, idx, mut signal)) = best else {
            return Ok(None);
        };

        let selected = self.arms[idx].agent.name().to_string();
        debug!("{}: selected {} with draw {:.3}", self.name, selected, draw);
        signal.reason = format!("[META] Selected {} (confidence {:.1}%). {}", selected, draw * 100.0, signal.reason);
        signal.agent_name = self.name.clone();
        *self.selections.entry(selected.clone()).or_default() += 1;
        self.last_selected = Some(selected);
        Ok(Some(signal))
    }

    fn performance(&self) -> &PerformanceTracker {
        &self.performance
    }

    fn performance_mut(&mut self) -> &mut PerformanceTracker {
        &mut self.performance
    }

    /// Also credits the posterior of the sub-agent picked last.
    fn record_outcome(&mut self, pnl: f64) {
        self.performance.record(pnl);
        if let Some(selected) = self.last_selected.clone() {
            self.update_from_result(&selected, pnl);
        }
    }
}
