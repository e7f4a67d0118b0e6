//! One-glance strategy status for a single indicated series.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::calculator::IndicatedSeries;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MacdBias {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyStatus {
    pub daily_trend: TrendDirection,
    pub ema50: f64,
    pub ema200: f64,
    pub rsi: f64,
    pub macd: MacdBias,
    /// Volume above its moving average (no spike factor applied).
    pub volume_above_average: bool,
    pub last_update: NaiveDateTime,
}

impl StrategyStatus {
    /// Summarise the latest bar. `None` for empty or degraded series.
    pub fn from_series(series: &IndicatedSeries) -> Option<Self> {
        let (bar, row) = series.view().latest()?;
        Some(Self {
            daily_trend: if row.ema50 > row.ema200 {
                TrendDirection::Up
            } else {
                TrendDirection::Down
            },
            ema50: row.ema50,
            ema200: row.ema200,
            rsi: row.rsi,
            macd: if row.macd > row.macd_signal {
                MacdBias::Bullish
            } else {
                MacdBias::Bearish
            },
            volume_above_average: bar.volume as f64 > row.volume_ma,
            last_update: bar.timestamp,
        })
    }
}
