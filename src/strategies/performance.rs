//! Per-agent trade outcome tracking.

use serde::{Deserialize, Serialize};

/// Trading days per year used to annualize the Sharpe ratio.
const TRADING_DAYS: f64 = 252.0;

/// Performance summary of one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStats {
    pub name: String,
    pub pnl: f64,
    pub win_rate: f64,
    pub total_trades: usize,
    pub sharpe: f64,
}

/// Realized PnL per closed trade.
#[derive(Debug, Clone, Default)]
pub struct PerformanceTracker {
    trades: Vec<f64>,
}

impl PerformanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, pnl: f64) {
        self.trades.push(pnl);
    }

    pub fn total_pnl(&self) -> f64 {
        self.trades.iter().sum()
    }

    pub fn total_trades(&self) -> usize {
        self.trades.len()
    }

    /// Share of trades with positive PnL, 0 without trades.
    pub fn win_rate(&self) -> f64 {
        if self.trades.is_empty() {
            return 0.0;
        }
        self.trades.iter().filter(|&&p| p > 0.0).count() as f64 / self.trades.len() as f64
    }

    /// Annualized Sharpe ratio of per-trade PnL (population std).
    pub fn sharpe(&self) -> f64 {
        let n = self.trades.len();
        if n == 0 {
            return 0.0;
        }
        let mean = self.total_pnl() / n as f64;
        let variance = self.trades.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n as f64;
        let std = variance.sqrt();
        if std == 0.0 {
            return 0.0;
        }
        mean / std * TRADING_DAYS.sqrt()
    }

    pub fn stats(&self, name: &str) -> AgentStats {
        AgentStats {
            name: name.to_string(),
            pnl: self.total_pnl(),
            win_rate: self.win_rate(),
            total_trades: self.total_trades(),
            sharpe: self.sharpe(),
        }
    }
}
