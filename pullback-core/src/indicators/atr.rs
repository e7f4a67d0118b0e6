//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|)
//! ATR is the simple rolling mean of TR with minimum-periods 1.

use super::sma::rolling_mean;
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }
}

/// Compute the True Range series from bars.
/// TR[0] = high[0] - low[0] (no previous close).
/// TR[t] = max(high[t]-low[t], |high[t]-close[t-1]|, |low[t]-close[t-1]|).
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let high_low = bar.high - bar.low;
            match i.checked_sub(1).map(|p| bars[p].close) {
                Some(pc) => high_low
                    .max((bar.high - pc).abs())
                    .max((bar.low - pc).abs()),
                None => high_low,
            }
        })
        .collect()
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        rolling_mean(&true_range(bars), self.period)
    }
}
