//! Indicator calculator: derives the per-bar feature set the criteria use.
//!
//! `compute_indicators` never fails. Internally the computation runs through
//! `try_compute_indicators`; any error is logged and the bars are returned
//! with indicators absent, which downstream code treats as degraded data.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::domain::Bar;
use crate::indicators::atr::true_range;
use crate::indicators::ema::ema_of_series;
use crate::indicators::macd::macd_of_series;
use crate::indicators::rsi::rsi_of_series;
use crate::indicators::sma::rolling_mean;

pub const EMA_FAST_SPAN: usize = 50;
pub const EMA_SLOW_SPAN: usize = 200;
pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const VOLUME_MA_PERIOD: usize = 20;
/// Volume above this multiple of its moving average is a spike.
pub const VOLUME_SPIKE_FACTOR: f64 = 1.5;
pub const ATR_PERIOD: usize = 14;
/// Close within this percentage of EMA50 counts as "near".
pub const NEAR_EMA_PCT: f64 = 2.0;

/// Derived values for one bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub ema50: f64,
    pub ema200: f64,
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_histogram: f64,
    pub volume_ma: f64,
    pub volume_spike: bool,
    pub atr: f64,
    pub ema50_distance_pct: f64,
    pub near_ema50: bool,
}

/// Internal calculator failures. Never escape `compute_indicators`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndicatorError {
    #[error("series is empty")]
    EmptySeries,

    #[error("bar {index} has non-finite or non-positive prices")]
    InvalidBar { index: usize },

    #[error("{field} is not finite at bar {index}")]
    NonFinite { field: &'static str, index: usize },
}

/// A series augmented with derived indicators.
///
/// `rows` is `None` when the calculator degraded; otherwise it has exactly
/// one entry per bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatedSeries {
    bars: Vec<Bar>,
    rows: Option<Vec<IndicatorRow>>,
}

impl IndicatedSeries {
    /// Wrap bars without indicators (the degraded form).
    pub fn without_indicators(bars: Vec<Bar>) -> Self {
        Self { bars, rows: None }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn rows(&self) -> Option<&[IndicatorRow]> {
        self.rows.as_deref()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn is_degraded(&self) -> bool {
        self.rows.is_none()
    }

    pub fn view(&self) -> IndicatedView<'_> {
        IndicatedView {
            bars: &self.bars,
            rows: self.rows.as_deref(),
        }
    }

    /// Borrow the first `len` bars (clamped), i.e. the data available at bar `len - 1`.
    pub fn prefix(&self, len: usize) -> IndicatedView<'_> {
        self.view().prefix(len)
    }
}

/// Borrowed window of an `IndicatedSeries`.
///
/// Indicators are causal, so a prefix of a fully computed series is exactly
/// what the calculator would produce on the truncated bars.
#[derive(Debug, Clone, Copy)]
pub struct IndicatedView<'a> {
    bars: &'a [Bar],
    rows: Option<&'a [IndicatorRow]>,
}

impl<'a> IndicatedView<'a> {
    pub fn bars(&self) -> &'a [Bar] {
        self.bars
    }

    pub fn rows(&self) -> Option<&'a [IndicatorRow]> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn prefix(&self, len: usize) -> IndicatedView<'a> {
        let len = len.min(self.bars.len());
        IndicatedView {
            bars: &self.bars[..len],
            rows: self.rows.map(|r| &r[..len]),
        }
    }

    /// The last `n` bars (or fewer).
    pub fn tail(&self, n: usize) -> IndicatedView<'a> {
        let start = self.bars.len().saturating_sub(n);
        IndicatedView {
            bars: &self.bars[start..],
            rows: self.rows.map(|r| &r[start..]),
        }
    }

    /// Latest bar together with its indicators, if both exist.
    pub fn latest(&self) -> Option<(&'a Bar, &'a IndicatorRow)> {
        let bar = self.bars.last()?;
        let row = self.rows?.last()?;
        Some((bar, row))
    }
}

/// Compute every indicator for `bars`, degrading instead of failing.
pub fn compute_indicators(bars: &[Bar]) -> IndicatedSeries {
    match try_compute_indicators(bars) {
        Ok(rows) => IndicatedSeries {
            bars: bars.to_vec(),
            rows: Some(rows),
        },
        Err(err) => {
            warn!(bars = bars.len(), error = %err, "indicator computation degraded");
            IndicatedSeries::without_indicators(bars.to_vec())
        }
    }
}

/// Compute every indicator for `bars`, reporting the first problem found.
pub fn try_compute_indicators(bars: &[Bar]) -> Result<Vec<IndicatorRow>, IndicatorError> {
    if bars.is_empty() {
        return Err(IndicatorError::EmptySeries);
    }
    if let Some(index) = bars
        .iter()
        .position(|b| b.is_void() || b.close <= 0.0 || b.high < b.low)
    {
        return Err(IndicatorError::InvalidBar { index });
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume as f64).collect();

    let ema50 = ema_of_series(&closes, EMA_FAST_SPAN);
    let ema200 = ema_of_series(&closes, EMA_SLOW_SPAN);
    let rsi = rsi_of_series(&closes, RSI_PERIOD);
    let macd = macd_of_series(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
    let volume_ma = rolling_mean(&volumes, VOLUME_MA_PERIOD);
    let atr = rolling_mean(&true_range(bars), ATR_PERIOD);

    let mut rows = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let ema50_distance_pct = (bar.close - ema50[i]).abs() / bar.close * 100.0;
        let row = IndicatorRow {
            ema50: ema50[i],
            ema200: ema200[i],
            rsi: rsi[i],
            macd: macd.line[i],
            macd_signal: macd.signal[i],
            macd_histogram: macd.histogram[i],
            volume_ma: volume_ma[i],
            volume_spike: volumes[i] > volume_ma[i] * VOLUME_SPIKE_FACTOR,
            atr: atr[i],
            ema50_distance_pct,
            near_ema50: ema50_distance_pct < NEAR_EMA_PCT,
        };
        check_finite(&row, i)?;
        rows.push(row);
    }
    Ok(rows)
}

fn check_finite(row: &IndicatorRow, index: usize) -> Result<(), IndicatorError> {
    let fields = [
        ("ema50", row.ema50),
        ("ema200", row.ema200),
        ("rsi", row.rsi),
        ("macd", row.macd),
        ("macd_signal", row.macd_signal),
        ("volume_ma", row.volume_ma),
        ("atr", row.atr),
        ("ema50_distance_pct", row.ema50_distance_pct),
    ];
    match fields.iter().find(|(_, v)| !v.is_finite()) {
        Some(&(field, _)) => Err(IndicatorError::NonFinite { field, index }),
        None => Ok(()),
    }
}
