//! Bar: the fundamental market data unit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV bar for a single symbol at a single timestamp.
///
/// The cadence (daily, 4-hour, ...) is a property of the series, not the bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Returns true if any OHLC field is not finite.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite())
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }

    /// Absolute size of the candle body.
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn upper_shadow(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_shadow(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    /// Green candle: close above open.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Red candle: close below open.
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// Violations of the series contract at the market-data boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("bar {index} has non-finite OHLC values")]
    NonFinite { index: usize },

    #[error("bar {index} timestamp {timestamp} is not after the previous bar")]
    OutOfOrder {
        index: usize,
        timestamp: NaiveDateTime,
    },
}

/// Check the series contract: finite prices, strictly increasing timestamps.
///
/// Data providers are responsible for delivering sorted, de-duplicated bars;
/// this is the check a caller runs before handing a series to the engine.
pub fn validate_series(bars: &[Bar]) -> Result<(), BarError> {
    for (index, bar) in bars.iter().enumerate() {
        if bar.is_void() {
            return Err(BarError::NonFinite { index });
        }
        if index > 0 && bar.timestamp <= bars[index - 1].timestamp {
            return Err(BarError::OutOfOrder {
                index,
                timestamp: bar.timestamp,
            });
        }
    }
    Ok(())
}
