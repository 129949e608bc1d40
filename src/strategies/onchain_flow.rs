use async_trait::async_trait;

use super::{Agent, PerformanceTracker};
use crate::fusion::{Sentiment, UnifiedMarketRecord};
use crate::trading::{Action, Signal};
use crate::utils::error::Result;

/// Sells on bearish chain capital flows.
#[derive(Debug, Clone)]
pub struct OnChainFlowAgent {
    name: String,
    confidence: f64,
    performance: PerformanceTracker,
}

impl OnChainFlowAgent {
    pub fn new(name: &str, confidence: f64) -> Self {
        Self { name: name.to_string(), confidence, performance: PerformanceTracker::new() }
    }
}

#[async_trait]
impl Agent for OnChainFlowAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn evaluate(&mut self, record: &UnifiedMarketRecord) -> Result<Option<Signal>> {
        let Some(health) = record.onchain.as_available() else {
            return Ok(None);
        };
        if health.sentiment != Sentiment::Bearish {
            return Ok(None);
        }
        let reason = format!("On-chain outflows on {}: {}", health.chain, health.reason);
        Ok(Some(Signal::new(&self.name, &record.symbol, Action::Sell, self.confidence, 0.0, record.price(), reason)))
    }

    fn performance(&self) -> &PerformanceTracker {
        &self.performance
    }

    fn performance_mut(&mut self) -> &mut PerformanceTracker {
        &mut self.performance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::test_support::{record, with_onchain};

    #[tokio::test]
    async fn only_bearish_flows_signal() {
        let mut agent = OnChainFlowAgent::new("onchain_flow", 0.6);
        assert!(agent.evaluate(&record("ETH", 3000.0)).await.unwrap().is_none());
        assert!(agent.evaluate(&with_onchain(record("ETH", 3000.0), 2.0)).await.unwrap().is_none());

        let signal = agent.evaluate(&with_onchain(record("ETH", 3000.0), -7.5)).await.unwrap().unwrap();
        assert_eq!(signal.action, Action::Sell);
        assert!((signal.confidence - 0.6).abs() < 1e-9);
    }
}
