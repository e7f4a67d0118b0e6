//! Concrete indicator implementations.
//!
//! Every indicator here uses minimum-periods-1 semantics: a value exists from
//! the first bar onward, computed over whatever history is available. That is
//! what lets the calculator guarantee a derived value for every bar.
//!
//! MACD produces three series and is exposed as separate named instances per
//! band, keeping the single-series `Indicator` trait unchanged.

pub mod atr;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use atr::Atr;
pub use ema::Ema;
pub use macd::{Macd, MacdBand, MacdSeries};
pub use rsi::Rsi;
pub use sma::VolumeSma;

use crate::domain::Bar;

/// Trait for indicators.
///
/// Indicators take a full bar series and produce a numeric output series of
/// the same length.
///
/// # Look-ahead contamination guard
/// No indicator value at bar t may depend on price data from bar t+1 or later.
/// Every indicator must pass the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "ema_50", "atr_14").
    fn name(&self) -> &str;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: base + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
