use async_trait::async_trait;
use ta::{indicators::BollingerBands, Next};
use tracing::debug;

use super::{Agent, PerformanceTracker};
use crate::fusion::UnifiedMarketRecord;
use crate::trading::{Action, Signal};
use crate::utils::error::{Error, Result};

const POSITION_SIZE: f64 = 100.0;
/// Band width below this fraction of price counts as a flat window.
const MIN_BAND_WIDTH: f64 = 1e-9;

/// Bollinger band mean reversion: buy the lower band, sell the upper.
#[derive(Debug, Clone)]
pub struct MeanReversionAgent {
    name: String,
    bands: BollingerBands,
    period: usize,
    seen: usize,
    performance: PerformanceTracker,
}

impl MeanReversionAgent {
    pub fn new(name: &str, period: usize, std_dev: f64) -> Result<Self> {
        if period < 2 || std_dev <= 0.0 {
            return Err(Error::ConfigError(format!(
                "{name}: period must be >= 2 and std_dev > 0, got {period} / {std_dev}"
            )));
        }
        let bands = BollingerBands::new(period, std_dev)
            .map_err(|e| Error::ConfigError(format!("{name}: invalid Bollinger bands: {e:?}")))?;
        Ok(Self { name: name.to_string(), bands, period, seen: 0, performance: PerformanceTracker::new() })
    }
}

/// Relative distance beyond a band, as confidence.
fn band_confidence(distance: f64) -> f64 {
    (0.5 + distance * 5.0).min(0.9)
}

#[async_trait]
impl Agent for MeanReversionAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn evaluate(&mut self, record: &UnifiedMarketRecord) -> Result<Option<Signal>> {
        let price = record.price();
        let out = self.bands.next(price);
        self.seen += 1;
        if self.seen < self.period {
            return Ok(None);
        }
        if out.upper - out.lower <= MIN_BAND_WIDTH * price.abs().max(1.0) {
            return Ok(None);
        }

        let (action, confidence, reason) = if price <= out.lower {
            let distance = if out.lower > 0.0 { (out.lower - price) / out.lower } else { 0.0 };
            (Action::Buy, band_confidence(distance), format!("Price {price:.2} at lower band {:.2}", out.lower))
        } else if price >= out.upper {
            let distance = if out.upper > 0.0 { (price - out.upper) / out.upper } else { 0.0 };
            (Action::Sell, band_confidence(distance), format!("Price {price:.2} at upper band {:.2}", out.upper))
        } else {
            return Ok(None);
        };
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
