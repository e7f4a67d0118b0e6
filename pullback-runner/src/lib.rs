//! Pullback Runner: backtests, metrics, run configuration, scanning.
//!
//! This crate builds on `pullback-core` to provide:
//! - The backtest simulator (stride walk, one position at a time)
//! - Ledger metrics with an explicit no-trades form
//! - TOML run configuration with content-hash run IDs
//! - CSV bar loading that enforces the series contract
//! - A parallel multi-symbol scanner

pub mod backtest;
pub mod config;
pub mod data_loader;
pub mod metrics;
pub mod scanner;

pub use backtest::{
    backtest, backtest_with, simulate, BacktestError, BacktestParams, BacktestReport, BacktestRun,
};
pub use config::{ConfigError, RunConfig, RunId};
pub use data_loader::{load_bars_csv, load_symbol, LoadError};
pub use metrics::{BacktestMetrics, PerformanceSummary};
pub use scanner::{scan, ScanInput, ScanReport, DEFAULT_MIN_CONFIDENCE};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn report_types_are_send_sync() {
        assert_send::<BacktestReport>();
        assert_sync::<BacktestReport>();
        assert_send::<ScanReport>();
        assert_sync::<ScanReport>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<RunConfig>();
        assert_sync::<RunConfig>();
        assert_send::<BacktestParams>();
        assert_sync::<BacktestParams>();
    }

    #[test]
    fn scan_input_is_send_sync() {
        assert_send::<ScanInput>();
        assert_sync::<ScanInput>();
    }
}
