//! Moving Average Convergence/Divergence (MACD).
//!
//! Produces three series (exposed as separate Indicator instances):
//! - Line: EMA(fast) - EMA(slow) of close
//! - Signal: EMA(signal) of the MACD line
//! - Histogram: line - signal

use super::ema::ema_of_series;
use super::Indicator;
use crate::domain::Bar;

/// Which MACD output to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdBand {
    Line,
    Signal,
    Histogram,
}

/// All three MACD outputs computed in one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
    band: MacdBand,
    name: String,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize, band: MacdBand) -> Self {
        assert!(fast >= 1, "MACD fast span must be >= 1");
        assert!(slow > fast, "MACD slow span must be > fast span");
        assert!(signal >= 1, "MACD signal span must be >= 1");
        let suffix = match band {
            MacdBand::Line => "line",
            MacdBand::Signal => "signal",
            MacdBand::Histogram => "histogram",
        };
        Self {
            fast,
            slow,
            signal,
            band,
            name: format!("macd_{suffix}_{fast}_{slow}_{signal}"),
        }
    }

    /// The conventional 12/26/9 configuration.
    pub fn standard(band: MacdBand) -> Self {
        Self::new(12, 26, 9, band)
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let series = macd_of_series(&closes, self.fast, self.slow, self.signal);
        match self.band {
            MacdBand::Line => series.line,
            MacdBand::Signal => series.signal,
            MacdBand::Histogram => series.histogram,
        }
    }
}

pub fn macd_of_series(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let fast_ema = ema_of_series(closes, fast);
    let slow_ema = ema_of_series(closes, slow);
    let line: Vec<f64> = fast_ema.iter().zip(&slow_ema).map(|(f, s)| f - s).collect();
    let signal = ema_of_series(&line, signal);
    let histogram = line.iter().zip(&signal).map(|(l, s)| l - s).collect();
    MacdSeries {
        line,
        signal,
        histogram,
    }
}
