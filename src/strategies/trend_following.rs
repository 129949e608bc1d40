use async_trait::async_trait;
use ta::{indicators::SimpleMovingAverage, Next};
use tracing::debug;

use super::{Agent, PerformanceTracker};
use crate::fusion::UnifiedMarketRecord;
use crate::trading::{Action, Signal};
use crate::utils::error::{Error, Result};

const POSITION_SIZE: f64 = 100.0;

/// Fast/slow simple moving average crossover over successive evaluations.
#[derive(Debug, Clone)]
pub struct TrendFollowingAgent {
    name: String,
    fast: SimpleMovingAverage,
    slow: SimpleMovingAverage,
    slow_period: usize,
    seen: usize,
    // (fast, slow) after the previous price
    prev: Option<(f64, f64)>,
    performance: PerformanceTracker,
}

impl TrendFollowingAgent {
    pub fn new(name: &str, fast_period: usize, slow_period: usize) -> Result<Self> {
        if fast_period == 0 || fast_period >= slow_period {
            return Err(Error::ConfigError(format!(
                "{name}: fast period {fast_period} must be > 0 and below slow period {slow_period}"
            )));
        }
        let sma = |period| {
            SimpleMovingAverage::new(period)
                .map_err(|e| Error::ConfigError(format!("{name}: invalid SMA period {period}: {e:?}")))
        };
        Ok(Self {
            name: name.to_string(),
            fast: sma(fast_period)?,
            slow: sma(slow_period)?,
            slow_period,
            seen: 0,
            prev: None,
            performance: PerformanceTracker::new(),
        })
    }
}

#[async_trait]
impl Agent for TrendFollowingAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn evaluate(&mut self, record: &UnifiedMarketRecord) -> Result<Option<Signal>> {
        let price = record.price();
        let fast = self.fast.next(price);
        let slow = self.slow.next(price);
        self.seen += 1;
        let prev = self.prev.replace((fast, slow));

        // both windows must be full for the current and the previous bar
        if self.seen <= self.slow_period || slow <= 0.0 {
            return Ok(None);
        }
        let Some((prev_fast, prev_slow)) = prev else {
            return Ok(None);
        };

        let action = if prev_fast <= prev_slow && fast > slow {
            Action::Buy
        } else if prev_fast >= prev_slow && fast < slow {
            Action::Sell
        } else {
            return Ok(None);
        };

        let gap = (fast - slow).abs() / slow;
        let confidence = (gap * 10.0).min(0.9).max(0.5);
        let relation = if action == Action::Buy { ">" } else { "<" };
        let reason = format!("MA crossover: fast {fast:.2} {relation} slow {slow:.2}");
        debug!("{}: {}", self.name, reason);

        Ok(Some(Signal::new(&self.name, &record.symbol, action, confidence, POSITION_SIZE, price, reason)))
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
    use crate::strategies::test_support::record;

    async fn feed(agent: &mut TrendFollowingAgent, prices: &[f64]) -> Vec<Signal> {
        let mut out = Vec::new();
        for &p in prices {
            if let Some(s) = agent.evaluate(&record("BTC", p)).await.unwrap() {
                out.push(s);
            }
        }
        out
    }

    #[tokio::test]
    async fn bullish_crossover_after_flat_window() {
        let mut agent = TrendFollowingAgent::new("trend_following", 5, 15).unwrap();
        let mut prices = vec![10.0; 15];
        prices.push(20.0);
        let signals = feed(&mut agent, &prices).await;
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].action, Action::Buy);
        assert!((signals[0].confidence - 0.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn small_gap_floors_confidence() {
        let mut agent = TrendFollowingAgent::new("trend_following", 5, 15).unwrap();
        let mut prices = vec![100.0; 15];
        prices.push(99.0);
        let signals = feed(&mut agent, &prices).await;
        assert_eq!(signals[0].action, Action::Sell);
        assert!((signals[0].confidence - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn silent_until_windows_fill() {
        let mut agent = TrendFollowingAgent::new("trend_following", 5, 15).unwrap();
        let prices: Vec<f64> = (1..=15).map(f64::from).collect();
        assert!(feed(&mut agent, &prices).await.is_empty());
    }

    #[test]
    fn rejects_inverted_periods() {
        assert!(TrendFollowingAgent::new("t", 15, 5).is_err());
        assert!(TrendFollowingAgent::new("t", 0, 5).is_err());
    }
}
