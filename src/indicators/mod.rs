//! Technical indicators computed from closing prices.
//!
//! RSI uses Wilder's smoothing: the first average covers the first `period`
//! deltas, every later delta is folded in with weight `1/period`.

use serde::{Deserialize, Serialize};

use crate::fusion::SourceTag;
use crate::trading::Action;

/// Default RSI lookback.
pub const RSI_PERIOD: usize = 14;
/// RSI below this maps to BUY.
pub const RSI_OVERSOLD: f64 = 30.0;
/// RSI above this maps to SELL.
pub const RSI_OVERBOUGHT: f64 = 70.0;

/// Relative Strength Index over `prices` (oldest first).
///
/// Returns 50.0 when fewer than `period + 1` prices are given and 100.0 when
/// the smoothed average loss is exactly zero.
pub fn rsi(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period + 1 {
        return 50.0;
    }

    let deltas: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
    let (seed, rest) = deltas.split_at(period);

    let p = period as f64;
    let mut avg_gain = seed.iter().map(|d| d.max(0.0)).sum::<f64>() / p;
    let mut avg_loss = seed.iter().map(|d| (-d).max(0.0)).sum::<f64>() / p;

    for d in rest {
        avg_gain = (avg_gain * (p - 1.0) + d.max(0.0)) / p;
        avg_loss = (avg_loss * (p - 1.0) + (-d).max(0.0)) / p;
    }

    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// Map an RSI value to an action and confidence.
pub fn rsi_signal(value: f64) -> (Action, f64) {
    if value < RSI_OVERSOLD {
        (Action::Buy, 0.7)
    } else if value > RSI_OVERBOUGHT {
        (Action::Sell, 0.7)
    } else {
        (Action::Hold, 0.5)
    }
}

/// Output of the technical task of a fusion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalReading {
    pub source: SourceTag,
    pub rsi_14: Option<f64>,
    pub signal: Action,
    pub confidence: f64,
    pub note: String,
}

impl TechnicalReading {
    /// Evaluate RSI-14 over daily closes.
    pub fn from_closes(closes: &[f64]) -> Self {
        if closes.len() < RSI_PERIOD + 1 {
            return Self {
                source: SourceTag::Calculated,
                rsi_14: None,
                signal: Action::Hold,
                confidence: 0.0,
                note: format!("insufficient history ({} closes)", closes.len()),
            };
        }

        let value = rsi(closes, RSI_PERIOD);
        let (signal, confidence) = rsi_signal(value);
        let note = match signal {
            Action::Buy => "oversold",
            Action::Sell => "overbought",
            Action::Hold => "neutral",
        };
        Self {
            source: SourceTag::Calculated,
            rsi_14: Some(value),
            signal,
            confidence,
            note: format!("RSI {value:.1} {note}"),
        }
    }
}
