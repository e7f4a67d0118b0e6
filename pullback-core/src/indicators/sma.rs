//! Simple rolling mean with minimum-periods 1.
//!
//! mean[t] = mean(values[max(0, t-period+1)..=t])
//!
//! Shared by the volume moving average, RSI gain/loss averaging and ATR.

use super::Indicator;
use crate::domain::Bar;

/// Rolling mean of bar volume.
#[derive(Debug, Clone)]
pub struct VolumeSma {
    period: usize,
    name: String,
}

impl VolumeSma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "volume SMA period must be >= 1");
        Self {
            period,
            name: format!("volume_sma_{period}"),
        }
    }
}

impl Indicator for VolumeSma {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume as f64).collect();
        rolling_mean(&volumes, self.period)
    }
}

/// Rolling mean over at most `period` trailing values.
///
/// The window is summed directly rather than rolled, so a constant input
/// yields exactly that constant.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 {
        return vec![f64::NAN; values.len()];
    }
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(period);
            let window = &values[start..=i];
            window.iter().sum::<f64>() / window.len() as f64
        })
        .collect()
}
