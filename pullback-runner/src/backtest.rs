//! Backtest simulator: walks the daily series and trades the pullback signal.
//!
//! A two-state machine (flat / long with one position). Every `stride` daily
//! bars, starting after `warmup` and stopping `tail_margin` bars before the
//! end, both series are restricted to data known at daily bar `i`:
//! - Flat: evaluate; on BUY/STRONG_BUY open a position risking a fixed
//!   fraction of current capital between entry and stop.
//! - Long: exit at the daily close when it is at or below the stop
//!   (checked first), or at or above the target. No re-evaluation while long.
//!
//! A position still open when the walk ends is reported but not closed.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use pullback_core::criteria::Cadence;
use pullback_core::domain::{validate_series, BarError};
use pullback_core::{
    CriteriaEvaluator, ExitReason, IndicatedSeries, Position, SignalEvaluator, TradeRecord,
};

use crate::metrics::BacktestMetrics;

/// Errors from the backtest boundary (caller errors; the walk itself cannot fail).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BacktestError {
    #[error("symbol must not be empty")]
    EmptySymbol,

    #[error("initial capital must be positive and finite, got {0}")]
    InvalidCapital(f64),

    #[error("invalid backtest parameter `{field}`: {reason}")]
    InvalidParam { field: &'static str, reason: String },

    #[error("{cadence} series violates the input contract: {source}")]
    Series {
        cadence: Cadence,
        #[source]
        source: BarError,
    },
}

/// Parameters of a backtest walk. Defaults reproduce the reference rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestParams {
    pub initial_capital: f64,
    /// Daily bars between evaluations.
    pub stride: usize,
    /// Daily bars skipped before the first evaluation.
    pub warmup: usize,
    /// Daily bars left unvisited at the end of the series.
    pub tail_margin: usize,
    /// Steps with fewer known intraday bars are skipped.
    pub min_intraday_bars: usize,
    /// Fraction of current capital risked per trade.
    pub risk_fraction: f64,
    /// How many of the most recent trades the report keeps.
    pub reported_trades: usize,
}

impl Default for BacktestParams {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            stride: 5,
            warmup: 50,
            tail_margin: 10,
            min_intraday_bars: 10,
            risk_fraction: 0.02,
            reported_trades: 10,
        }
    }
}

impl BacktestParams {
    /// Default parameters with a different starting capital.
    pub fn with_capital(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), BacktestError> {
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(BacktestError::InvalidCapital(self.initial_capital));
        }
        if self.stride == 0 {
            return Err(BacktestError::InvalidParam {
                field: "stride",
                reason: "must be at least 1".into(),
            });
        }
        if !(self.risk_fraction > 0.0 && self.risk_fraction <= 1.0) {
            return Err(BacktestError::InvalidParam {
                field: "risk_fraction",
                reason: format!("must be in (0, 1], got {}", self.risk_fraction),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum State {
    Flat,
    Long(Position),
}

/// Full outcome of a walk: every closed trade, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRun {
    pub symbol: String,
    pub initial_capital: f64,
    pub final_capital: f64,
    pub trades: Vec<TradeRecord>,
    /// Position still held when the walk ended, if any.
    pub open_position: Option<Position>,
    /// Steps where the evaluator ran.
    pub evaluations: usize,
    /// Steps skipped for lack of intraday history.
    pub skipped_steps: usize,
}

/// Reported backtest: metrics over the full ledger plus the latest trades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub symbol: String,
    pub initial_capital: f64,
    pub metrics: BacktestMetrics,
    pub trades: Vec<TradeRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_position: Option<Position>,
}

impl BacktestReport {
    pub fn from_run(run: BacktestRun, reported_trades: usize) -> Self {
        let metrics =
            BacktestMetrics::compute(&run.trades, run.initial_capital, run.final_capital);
        let start = run.trades.len().saturating_sub(reported_trades);
        Self {
            symbol: run.symbol,
            initial_capital: run.initial_capital,
            metrics,
            trades: run.trades[start..].to_vec(),
            open_position: run.open_position,
        }
    }
}

/// Backtest with the default evaluator and parameters.
pub fn backtest(
    symbol: &str,
    daily: &IndicatedSeries,
    intraday: &IndicatedSeries,
    initial_capital: f64,
) -> Result<BacktestReport, BacktestError> {
    let params = BacktestParams::with_capital(initial_capital);
    backtest_with(
        symbol,
        daily,
        intraday,
        &CriteriaEvaluator::default(),
        &params,
    )
}

/// Backtest with an explicit evaluator and parameters.
pub fn backtest_with(
    symbol: &str,
    daily: &IndicatedSeries,
    intraday: &IndicatedSeries,
    evaluator: &dyn SignalEvaluator,
    params: &BacktestParams,
) -> Result<BacktestReport, BacktestError> {
    let run = simulate(symbol, daily, intraday, evaluator, params)?;
    Ok(BacktestReport::from_run(run, params.reported_trades))
}

/// Run the walk and return the full ledger.
pub fn simulate(
    symbol: &str,
    daily: &IndicatedSeries,
    intraday: &IndicatedSeries,
    evaluator: &dyn SignalEvaluator,
    params: &BacktestParams,
) -> Result<BacktestRun, BacktestError> {
    if symbol.trim().is_empty() {
        return Err(BacktestError::EmptySymbol);
    }
    params.validate()?;
    validate_series(daily.bars()).map_err(|source| BacktestError::Series {
        cadence: Cadence::Daily,
        source,
    })?;
    validate_series(intraday.bars()).map_err(|source| BacktestError::Series {
        cadence: Cadence::Intraday,
        source,
    })?;

    let daily_bars = daily.bars();
    let intraday_bars = intraday.bars();
    let end = daily_bars.len().saturating_sub(params.tail_margin);

    let mut capital = params.initial_capital;
    let mut state = State::Flat;
    let mut trades = Vec::new();
    let mut evaluations = 0;
    let mut skipped_steps = 0;

    for i in (params.warmup..end).step_by(params.stride) {
        let bar = &daily_bars[i];
        let known_intraday = intraday_bars.partition_point(|b| b.timestamp <= bar.timestamp);
        if known_intraday < params.min_intraday_bars {
            debug!(symbol, step = i, known_intraday, "skipping step: intraday history too short");
            skipped_steps += 1;
            continue;
        }

        state = match state {
            State::Flat => {
                let result = evaluator.evaluate(
                    symbol,
                    daily.prefix(i + 1),
                    intraday.prefix(known_intraday),
                );
                evaluations += 1;

                let setup = if result.signal.is_entry() {
                    result.trade_setup
                } else {
                    None
                };
                match setup {
                    Some(setup) => {
                        let risk = setup.entry_price - setup.stop_loss;
                        match position_size(capital, params.risk_fraction, risk) {
                            Some(shares) => {
                                info!(
                                    symbol,
                                    date = %bar.timestamp,
                                    entry = setup.entry_price,
                                    stop = setup.stop_loss,
                                    target = setup.target_1,
                                    shares,
                                    "opened position"
                                );
                                State::Long(Position {
                                    entry_price: setup.entry_price,
                                    stop_loss: setup.stop_loss,
                                    target: setup.target_1,
                                    shares,
                                    entry_date: bar.timestamp,
                                })
                            }
                            None => {
                                debug!(symbol, step = i, risk, capital, "entry skipped: no viable size");
                                State::Flat
                            }
                        }
                    }
                    None => State::Flat,
                }
            }
            State::Long(position) => {
                let reason = if position.stop_hit(bar.close) {
                    Some(ExitReason::StopLoss)
                } else if position.target_hit(bar.close) {
                    Some(ExitReason::TargetHit)
                } else {
                    None
                };
                match reason {
                    Some(reason) => {
                        let trade = TradeRecord::close(position, bar.timestamp, bar.close, reason);
                        capital += trade.pnl;
                        info!(
                            symbol,
                            date = %bar.timestamp,
                            exit = bar.close,
                            pnl = trade.pnl,
                            ?reason,
                            "closed position"
                        );
                        trades.push(trade);
                        State::Flat
                    }
                    None => State::Long(position),
                }
            }
        };
    }

    let open_position = match state {
        State::Long(position) => Some(position),
        State::Flat => None,
    };

    info!(
        symbol,
        trades = trades.len(),
        final_capital = capital,
        evaluations,
        skipped_steps,
        "backtest complete"
    );

    Ok(BacktestRun {
        symbol: symbol.to_string(),
        initial_capital: params.initial_capital,
        final_capital: capital,
        trades,
        open_position,
        evaluations,
        skipped_steps,
    })
}

/// `floor(capital * risk_fraction / risk)`, or `None` when entry is at or
/// below the stop or the size rounds down to zero shares.
pub fn position_size(capital: f64, risk_fraction: f64, risk_per_share: f64) -> Option<u64> {
    if !(risk_per_share > 0.0) {
        return None;
    }
    let shares = (capital * risk_fraction / risk_per_share).floor();
    if shares.is_finite() && shares >= 1.0 {
        Some(shares as u64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizing_risks_two_percent() {
        assert_eq!(position_size(10_000.0, 0.02, 2.0), Some(100));
        assert_eq!(position_size(10_000.0, 0.02, 3.0), Some(66));
    }

    #[test]
    fn sizing_rejects_non_positive_risk() {
        assert_eq!(position_size(10_000.0, 0.02, 0.0), None);
        assert_eq!(position_size(10_000.0, 0.02, -1.0), None);
        assert_eq!(position_size(10_000.0, 0.02, f64::NAN), None);
    }

    #[test]
    fn sizing_rejects_zero_shares() {
        assert_eq!(position_size(100.0, 0.02, 5.0), None);
        assert_eq!(position_size(-500.0, 0.02, 1.0), None);
    }

    #[test]
    fn default_params_match_reference_rule() {
        let p = BacktestParams::default();
        assert_eq!(p.stride, 5);
        assert_eq!(p.warmup, 50);
        assert_eq!(p.tail_margin, 10);
        assert_eq!(p.min_intraday_bars, 10);
        assert_eq!(p.risk_fraction, 0.02);
        assert_eq!(p.reported_trades, 10);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn params_reject_caller_errors() {
        assert_eq!(
            BacktestParams::with_capital(-1.0).validate(),
            Err(BacktestError::InvalidCapital(-1.0))
        );
        let zero_stride = BacktestParams {
            stride: 0,
            ..BacktestParams::default()
        };
        assert!(matches!(
            zero_stride.validate(),
            Err(BacktestError::InvalidParam { field: "stride", .. })
        ));
        let greedy = BacktestParams {
            risk_fraction: 1.5,
            ..BacktestParams::default()
        };
        assert!(matches!(
            greedy.validate(),
            Err(BacktestError::InvalidParam { field: "risk_fraction", .. })
        ));
    }
}
