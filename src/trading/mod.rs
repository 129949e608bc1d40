//! Trading vocabulary shared by the fusion layer and the agents.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::error::Error;

/// Direction of a recommendation or vote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
    #[default]
    Hold,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
        }
    }

    /// Returns true for BUY/SELL.
    pub fn is_actionable(&self) -> bool {
        !matches!(self, Action::Hold)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BUY" => Ok(Action::Buy),
            "SELL" => Ok(Action::Sell),
            "HOLD" => Ok(Action::Hold),
            other => Err(Error::InvalidArgument(format!("unknown action: {other}"))),
        }
    }
}

/// One agent's decision for one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub action: Action,
    /// Confidence score 0-1.
    pub confidence: f64,
    /// Suggested position size in quote currency (0 for HOLD).
    pub size: f64,
    /// Human-readable rationale.
    pub reason: String,
    pub agent_name: String,
    pub price: f64,
}

impl Signal {
    pub fn new(
        agent_name: impl Into<String>,
        symbol: impl Into<String>,
        action: Action,
        confidence: f64,
        size: f64,
        price: f64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            symbol: symbol.into(),
            action,
            confidence: confidence.clamp(0.0, 1.0),
            size,
            reason: reason.into(),
            agent_name: agent_name.into(),
            price,
        }
    }

    /// Zero-size HOLD.
    pub fn hold(
        agent_name: impl Into<String>,
        symbol: impl Into<String>,
        confidence: f64,
        price: f64,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(agent_name, symbol, Action::Hold, confidence, 0.0, price, reason)
    }

    pub fn is_buy(&self) -> bool {
        self.action == Action::Buy
    }

    pub fn is_sell(&self) -> bool {
        self.action == Action::Sell
    }

    /// Realized PnL of acting on this signal if the price moves to `exit_price`.
    /// `size` is in quote currency, so PnL scales with the relative move.
    pub fn pnl_at(&self, exit_price: f64) -> f64 {
        if self.price <= 0.0 {
            return 0.0;
        }
        let units = self.size / self.price;
        match self.action {
            Action::Buy => (exit_price - self.price) * units,
            Action::Sell => (self.price - exit_price) * units,
            Action::Hold => 0.0,
        }
    }
}
