//! Exponential Moving Average (EMA).
//!
//! Span-parameterised, bias-adjusted form with minimum-periods 1:
//!
//! ```text
//! alpha  = 2 / (span + 1)
//! EMA[t] = sum_i (1-alpha)^i * close[t-i]  /  sum_i (1-alpha)^i     (i = 0..=t)
//! ```
//!
//! EMA[0] equals the first close; early values are not dragged toward zero
//! because the weights are renormalised over the available history.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Ema {
    span: usize,
    name: String,
}

impl Ema {
    pub fn new(span: usize) -> Self {
        assert!(span >= 1, "EMA span must be >= 1");
        Self {
            span,
            name: format!("ema_{span}"),
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        ema_of_series(&closes, self.span)
    }
}

/// Compute EMA values from a pre-extracted f64 slice.
/// Used by MACD, which smooths the MACD line itself.
pub fn ema_of_series(values: &[f64], span: usize) -> Vec<f64> {
    if span == 0 {
        return vec![f64::NAN; values.len()];
    }

    let decay = 1.0 - 2.0 / (span as f64 + 1.0);
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;

    values
        .iter()
        .map(|&v| {
            weighted_sum = v + decay * weighted_sum;
            weight_total = 1.0 + decay * weight_total;
            weighted_sum / weight_total
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn ema_span_1_equals_close() {
        let bars = make_bars(&[100.0, 200.0, 300.0]);
        let result = Ema::new(1).compute(&bars);
        assert_approx(result[0], 100.0, DEFAULT_EPSILON);
        assert_approx(result[1], 200.0, DEFAULT_EPSILON);
        assert_approx(result[2], 300.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_3_known_values() {
        // alpha = 0.5, decay = 0.5
        // EMA[0] = 10
        // EMA[1] = (11 + 0.5*10) / 1.5 = 10.666..
        // EMA[2] = (12 + 0.5*11 + 0.25*10) / 1.75 = 11.428571..
        let bars = make_bars(&[10.0, 11.0, 12.0]);
        let result = Ema::new(3).compute(&bars);
        assert_approx(result[0], 10.0, DEFAULT_EPSILON);
        assert_approx(result[1], 16.0 / 1.5, DEFAULT_EPSILON);
        assert_approx(result[2], 20.0 / 1.75, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_of_constant_is_constant() {
        let values = vec![100.0; 300];
        for v in ema_of_series(&values, 200) {
            assert_approx(v, 100.0, 1e-9);
        }
    }

    #[test]
    fn ema_empty_input() {
        assert!(ema_of_series(&[], 50).is_empty());
    }

    #[test]
    fn ema_lags_a_rising_series() {
        let closes: Vec<f64> = (0..100).map(|i| 100.0 + i as f64).collect();
        let fast = ema_of_series(&closes, 12);
        let slow = ema_of_series(&closes, 26);
        assert!(fast[99] < closes[99]);
        assert!(slow[99] < fast[99]);
    }

    #[test]
    fn ema_of_series_matches_indicator() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        assert_eq!(Ema::new(3).compute(&bars), ema_of_series(&closes, 3));
    }
}
