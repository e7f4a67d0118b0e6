//! Pullback Core: signal evaluation engine for the six-criteria EMA pullback rule.
//!
//! This crate contains everything that turns raw OHLCV bars into a graded signal:
//! - Domain types (bars, positions, trade records)
//! - Indicators (EMA, RSI, MACD, volume MA, ATR) and the indicator calculator
//! - Swing point detection and higher-highs/higher-lows structure
//! - Priority-ordered bullish candlestick patterns
//! - The six-criteria evaluator producing a `CriteriaResult`
//!
//! Everything here is pure computation over in-memory series: no I/O, no
//! shared state, no randomness.

pub mod calculator;
pub mod config;
pub mod criteria;
pub mod domain;
pub mod indicators;
pub mod patterns;
pub mod status;
pub mod structure;
pub mod swing;

pub use calculator::{compute_indicators, IndicatedSeries, IndicatedView, IndicatorRow};
pub use config::EvaluatorConfig;
pub use criteria::{
    evaluate, CriteriaEvaluator, CriteriaResult, Signal, SignalEvaluator, TradeSetup,
};
pub use domain::{Bar, ExitReason, Position, TradeRecord};
pub use patterns::{detect_bullish_pattern, CandlePattern, PatternMatch};
pub use status::StrategyStatus;
pub use structure::has_higher_highs_higher_lows;
pub use swing::{detect_swing_points, SwingKind, SwingPoint, SwingPoints};
