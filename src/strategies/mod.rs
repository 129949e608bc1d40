//! Agents that turn a [`UnifiedMarketRecord`] into trading signals.

mod config_impls;
mod events;
mod mean_reversion;
mod meta;
mod onchain_flow;
mod performance;
mod rule_set;
mod trend_following;
mod value;

pub use events::{EventDrivenAgent, FedHikeAgent};
pub use mean_reversion::MeanReversionAgent;
pub use meta::MetaBanditAgent;
pub use onchain_flow::OnChainFlowAgent;
pub use performance::{AgentStats, PerformanceTracker};
pub use rule_set::{RuleEvaluation, RuleSetAgent};
pub use trend_following::TrendFollowingAgent;
pub use value::{CrisisDetectorAgent, DefensiveValueAgent};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::fusion::UnifiedMarketRecord;
use crate::trading::Signal;
use crate::utils::error::{Error, Result};

/// Notional capital assumed when an agent configuration does not carry one.
pub const DEFAULT_CAPITAL: f64 = 10_000.0;

/// A rule-based evaluator over the fused record.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Unique name of the agent instance
    fn name(&self) -> &str;

    /// Evaluate one record. `Ok(None)` means the agent has nothing to say.
    async fn evaluate(&mut self, record: &UnifiedMarketRecord) -> Result<Option<Signal>>;

    fn performance(&self) -> &PerformanceTracker;

    fn performance_mut(&mut self) -> &mut PerformanceTracker;

    /// Feed back the realized PnL of a trade taken on this agent's signal.
    fn record_outcome(&mut self, pnl: f64) {
        self.performance_mut().record(pnl);
    }

    fn stats(&self) -> AgentStats {
        self.performance().stats(self.name())
    }
}

/// Agent configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Registry name of the agent
    pub name: String,
    /// Whether the agent is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Agent-specific parameters
    #[serde(default = "empty_params")]
    pub params: serde_json::Value,
}

fn default_enabled() -> bool {
    true
}

fn empty_params() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl AgentConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), enabled: true, params: empty_params() }
    }

    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = params;
        self
    }
}

/// Builds agents from configuration.
pub struct AgentFactory;

impl AgentFactory {
    /// Create one agent. Unknown names and malformed params are configuration errors.
    pub fn create_agent(config: &AgentConfig) -> Result<Box<dyn Agent>> {
        let agent: Box<dyn Agent> = match config.name.as_str() {
            "defensive_value" => Box::new(DefensiveValueAgent::try_from(config)?),
            "crisis_detector" => Box::new(CrisisDetectorAgent::try_from(config)?),
            "event_driven" => Box::new(EventDrivenAgent::try_from(config)?),
            "fed_hike" => Box::new(FedHikeAgent::try_from(config)?),
            "trend_following" => Box::new(TrendFollowingAgent::try_from(config)?),
            "mean_reversion" => Box::new(MeanReversionAgent::try_from(config)?),
            "onchain_flow" => Box::new(OnChainFlowAgent::try_from(config)?),
            "rule_set" => Box::new(RuleSetAgent::try_from(config)?),
            "meta_bandit" => Box::new(MetaBanditAgent::try_from(config)?),
            other => return Err(Error::ConfigError(format!("Unknown agent: {other}"))),
        };
        Ok(agent)
    }

    /// Every enabled agent of `config`, sized against the arena capital.
    pub fn create_enabled(config: &Config) -> Result<Vec<Box<dyn Agent>>> {
        config
            .enabled_agents()
            .map(|agent| {
                let mut agent = agent.clone();
                if let Some(params) = agent.params.as_object_mut() {
                    params.entry("capital").or_insert_with(|| serde_json::json!(config.arena.capital));
                }
                Self::create_agent(&agent)
            })
            .collect()
    }
}
