//! Tunable thresholds of the six-criteria evaluation.
//!
//! Defaults reproduce the reference pullback rule exactly; every field can be
//! overridden from a `[strategy]` table in a run config file.

use serde::{Deserialize, Serialize};

use crate::swing::DEFAULT_SWING_WINDOW;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Half-width of the swing detection window.
    pub swing_window: usize,
    /// Number of trailing daily bars searched for swing structure.
    pub structure_lookback: usize,
    /// How many of the latest swing lows bound the stop.
    pub stop_swing_lows: usize,
    /// Stop as a fraction of close when no swing low exists.
    pub fallback_stop_fraction: f64,
    /// Close must stay at or above this fraction of EMA50.
    pub pullback_floor_fraction: f64,
    /// Pattern confidence must exceed this.
    pub min_pattern_confidence: u8,
    /// Intraday RSI must exceed this.
    pub rsi_threshold: f64,
    /// Risk per share, as percent of price, must exceed this.
    pub min_risk_pct: f64,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            swing_window: DEFAULT_SWING_WINDOW,
            structure_lookback: 50,
            stop_swing_lows: 3,
            fallback_stop_fraction: 0.95,
            pullback_floor_fraction: 0.98,
            min_pattern_confidence: 60,
            rsi_threshold: 50.0,
            min_risk_pct: 0.5,
        }
    }
}
