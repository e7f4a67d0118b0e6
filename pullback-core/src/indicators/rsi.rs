//! Relative Strength Index (RSI).
//!
//! Simple rolling means (minimum-periods 1) of gains and losses:
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//!
//! The first bar has no previous close and contributes a zero change.
//! Edge case: avg_loss == 0 → RSI = 50 (neutral), never a division.

use super::sma::rolling_mean;
use super::Indicator;
use crate::domain::Bar;

/// RSI value used when the average loss is zero.
pub const NEUTRAL_RSI: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        rsi_of_series(&closes, self.period)
    }
}

pub fn rsi_of_series(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut gains = vec![0.0; n];
    let mut losses = vec![0.0; n];
    for i in 1..n {
        let change = closes[i] - closes[i - 1];
        if change > 0.0 {
            gains[i] = change;
        } else if change < 0.0 {
            losses[i] = -change;
        }
    }

    let avg_gain = rolling_mean(&gains, period);
    let avg_loss = rolling_mean(&losses, period);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(&g, &l)| compute_rsi(g, l))
        .collect()
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        NEUTRAL_RSI
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
