//! Swing point detection: local extrema over a symmetric window.
//!
//! Index `i` is a swing high when `high[i]` equals the maximum high over
//! `[i-w, i+w]`, a swing low when `low[i]` equals the minimum low over the
//! same window. Ties are not broken: every index that attains the extremum
//! is recorded. Only interior indices (`w <= i < len-w`) are considered.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::Bar;

/// Default half-width of the swing window.
pub const DEFAULT_SWING_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwingKind {
    High,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    /// Index into the slice passed to the detector.
    pub index: usize,
    pub price: f64,
    pub timestamp: NaiveDateTime,
    pub kind: SwingKind,
}

/// Swing highs and lows, each in chronological order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwingPoints {
    pub highs: Vec<SwingPoint>,
    pub lows: Vec<SwingPoint>,
}

impl SwingPoints {
    pub fn is_empty(&self) -> bool {
        self.highs.is_empty() && self.lows.is_empty()
    }

    /// Prices of the last `n` swing lows.
    pub fn recent_low_prices(&self, n: usize) -> impl Iterator<Item = f64> + '_ {
        let start = self.lows.len().saturating_sub(n);
        self.lows[start..].iter().map(|p| p.price)
    }
}

/// Detect swing highs and lows with half-window `window`.
///
/// Fewer than `2*window + 1` bars yields no swing points.
pub fn detect_swing_points(bars: &[Bar], window: usize) -> SwingPoints {
    let mut points = SwingPoints::default();
    let n = bars.len();
    if n < 2 * window + 1 {
        return points;
    }

    for i in window..n - window {
        let span = &bars[i - window..=i + window];
        let bar = &bars[i];

        let max_high = span.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        if bar.high == max_high {
            points.highs.push(SwingPoint {
                index: i,
                price: bar.high,
                timestamp: bar.timestamp,
                kind: SwingKind::High,
            });
        }

        let min_low = span.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        if bar.low == min_low {
            points.lows.push(SwingPoint {
                index: i,
                price: bar.low,
                timestamp: bar.timestamp,
                kind: SwingKind::Low,
            });
        }
    }

    points
}
