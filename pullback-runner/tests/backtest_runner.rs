//! Integration tests for the backtest simulator.
//!
//! Entries are scripted through the `SignalEvaluator` seam so each test
//! controls exactly when and at what levels a position opens.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use std::sync::Mutex;

use pullback_core::calculator::IndicatedView;
use pullback_core::{
    compute_indicators, Bar, CriteriaResult, ExitReason, IndicatedSeries, Signal,
    SignalEvaluator, TradeSetup,
};
use pullback_runner::{
    backtest, backtest_with, simulate, BacktestError, BacktestMetrics, BacktestParams,
};

// ── Fixtures ─────────────────────────────────────────────────────────

fn day0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn bar(timestamp: NaiveDateTime, close: f64) -> Bar {
    Bar {
        timestamp,
        open: close,
        high: close + 0.5,
        low: close - 0.5,
        close,
        volume: 1000,
    }
}

fn daily(closes: &[f64]) -> IndicatedSeries {
    let bars: Vec<Bar> = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| bar(day0() + Duration::days(i as i64), c))
        .collect();
    compute_indicators(&bars)
}

/// Four-hour bars starting `lead_days` before the first daily bar.
fn intraday(n: usize, lead_days: i64) -> IndicatedSeries {
    let start = day0() - Duration::days(lead_days);
    let bars: Vec<Bar> = (0..n)
        .map(|i| bar(start + Duration::hours(4 * i as i64), 100.0))
        .collect();
    compute_indicators(&bars)
}

fn setup(entry: f64, stop: f64, target: f64) -> TradeSetup {
    let risk = entry - stop;
    TradeSetup {
        entry_price: entry,
        stop_loss: stop,
        target_1: target,
        target_2: entry + 3.0 * risk,
        risk_amount: risk,
        reward_1: 2.0 * risk,
        reward_2: 3.0 * risk,
    }
}

fn graded(symbol: &str, daily: IndicatedView<'_>, signal: Signal, setup: Option<TradeSetup>) -> CriteriaResult {
    CriteriaResult {
        symbol: symbol.to_string(),
        timestamp: daily.bars().last().map(|b| b.timestamp),
        signal,
        confidence: signal.confidence(),
        signal_strength: 0.0,
        criteria_met: 0,
        criteria: None,
        trade_setup: setup,
        error: None,
    }
}

/// BUY with a fixed setup whenever the daily view has exactly `at_len` bars.
struct ScriptedEntry {
    at_len: usize,
    setup: TradeSetup,
}

impl SignalEvaluator for ScriptedEntry {
    fn evaluate(
        &self,
        symbol: &str,
        daily: IndicatedView<'_>,
        _intraday: IndicatedView<'_>,
    ) -> CriteriaResult {
        if daily.len() == self.at_len {
            graded(symbol, daily, Signal::Buy, Some(self.setup.clone()))
        } else {
            graded(symbol, daily, Signal::Hold, None)
        }
    }
}

/// Records the latest (daily, intraday) timestamps of every call.
#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<(NaiveDateTime, NaiveDateTime, usize)>>,
}

impl SignalEvaluator for Recorder {
    fn evaluate(
        &self,
        symbol: &str,
        daily: IndicatedView<'_>,
        intraday: IndicatedView<'_>,
    ) -> CriteriaResult {
        if let (Some(d), Some(h)) = (daily.bars().last(), intraday.bars().last()) {
            self.calls
                .lock()
                .unwrap()
                .push((d.timestamp, h.timestamp, daily.len()));
        }
        graded(symbol, daily, Signal::Hold, None)
    }
}

// ── Scenarios ────────────────────────────────────────────────────────

#[test]
fn single_buy_exits_at_target() {
    // Entry at step 50 (close 100), target 104 reached by step 55.
    let mut closes = vec![100.0; 70];
    for c in closes.iter_mut().skip(55) {
        *c = 104.0;
    }
    let evaluator = ScriptedEntry {
        at_len: 51,
        setup: setup(100.0, 98.0, 104.0),
    };
    let report = backtest_with(
        "SYN",
        &daily(&closes),
        &intraday(200, 20),
        &evaluator,
        &BacktestParams::with_capital(10_000.0),
    )
    .unwrap();

    assert_eq!(report.trades.len(), 1);
    let trade = &report.trades[0];
    assert_eq!(trade.shares, 100);
    assert_eq!(trade.exit_reason, ExitReason::TargetHit);
    assert_eq!(trade.pnl, 400.0);
    assert_eq!(trade.entry_date, day0() + Duration::days(50));
    assert_eq!(trade.exit_date, day0() + Duration::days(55));
    assert!(report.open_position.is_none());

    let summary = report.metrics.summary().unwrap();
    assert_eq!(summary.total_trades, 1);
    assert_eq!(summary.winning_trades, 1);
    assert_eq!(summary.final_capital, 10_400.0);
    assert_eq!(summary.total_return, 400.0);
}

#[test]
fn stop_is_checked_before_target() {
    // Inverted levels: a close of 97 hits both; the stop must win.
    let mut closes = vec![100.0; 70];
    for c in closes.iter_mut().skip(51) {
        *c = 97.0;
    }
    let evaluator = ScriptedEntry {
        at_len: 51,
        setup: setup(100.0, 98.0, 97.0),
    };
    let run = simulate(
        "SYN",
        &daily(&closes),
        &intraday(200, 20),
        &evaluator,
        &BacktestParams::default(),
    )
    .unwrap();

    assert_eq!(run.trades.len(), 1);
    assert_eq!(run.trades[0].exit_reason, ExitReason::StopLoss);
    assert_eq!(run.trades[0].exit_price, 97.0);
    assert_eq!(run.trades[0].pnl, -300.0);
    assert_eq!(run.final_capital, 9_700.0);
}

#[test]
fn entry_at_stop_is_skipped() {
    let evaluator = ScriptedEntry {
        at_len: 51,
        setup: setup(100.0, 100.0, 100.0),
    };
    let run = simulate(
        "SYN",
        &daily(&[100.0; 70]),
        &intraday(200, 20),
        &evaluator,
        &BacktestParams::default(),
    )
    .unwrap();
    assert!(run.trades.is_empty());
    assert!(run.open_position.is_none());
}

#[test]
fn entry_with_zero_shares_is_skipped() {
    // 100 * 0.02 / 5 = 0.4 shares
    let evaluator = ScriptedEntry {
        at_len: 51,
        setup: setup(100.0, 95.0, 110.0),
    };
    let run = simulate(
        "SYN",
        &daily(&[100.0; 70]),
        &intraday(200, 20),
        &evaluator,
        &BacktestParams::with_capital(100.0),
    )
    .unwrap();
    assert!(run.open_position.is_none());
    assert!(run.trades.is_empty());
}

#[test]
fn position_still_open_at_end_is_reported() {
    let evaluator = ScriptedEntry {
        at_len: 51,
        setup: setup(100.0, 98.0, 104.0),
    };
    let report = backtest_with(
        "SYN",
        &daily(&[100.0; 80]),
        &intraday(200, 20),
        &evaluator,
        &BacktestParams::default(),
    )
    .unwrap();

    let open = report.open_position.as_ref().unwrap();
    assert_eq!(open.shares, 100);
    assert_eq!(open.entry_date, day0() + Duration::days(50));
    assert!(matches!(report.metrics, BacktestMetrics::NoTrades { total_trades: 0, .. }));
}

#[test]
fn steps_walk_from_warmup_by_stride_and_see_no_future() {
    let recorder = Recorder::default();
    let run = simulate(
        "SYN",
        &daily(&[100.0; 80]),
        &intraday(600, 20),
        &recorder,
        &BacktestParams::default(),
    )
    .unwrap();

    let calls = recorder.calls.into_inner().unwrap();
    let lens: Vec<usize> = calls.iter().map(|c| c.2).collect();
    // i in 50..70 step 5 → prefixes of 51, 56, 61, 66 bars
    assert_eq!(lens, [51, 56, 61, 66]);
    assert_eq!(run.evaluations, 4);
    for (daily_ts, intraday_ts, _) in &calls {
        assert!(intraday_ts <= daily_ts);
    }
}

#[test]
fn steps_without_enough_intraday_history_are_skipped() {
    // Intraday starts 52 days after the first daily bar: steps 50 is skipped,
    // from step 55 on there are at least 10 known bars.
    let start = day0() + Duration::days(52);
    let bars: Vec<Bar> = (0..200)
        .map(|i| bar(start + Duration::hours(4 * i as i64), 100.0))
        .collect();
    let recorder = Recorder::default();
    let run = simulate(
        "SYN",
        &daily(&[100.0; 80]),
        &compute_indicators(&bars),
        &recorder,
        &BacktestParams::default(),
    )
    .unwrap();
    assert_eq!(run.skipped_steps, 1);
    assert_eq!(run.evaluations, 3);
}

#[test]
fn short_series_produce_no_trades() {
    let report = backtest("SYN", &daily(&[100.0; 40]), &intraday(100, 20), 10_000.0).unwrap();
    assert_eq!(report.metrics.total_trades(), 0);
    assert!(report.trades.is_empty());
}

#[test]
fn only_latest_trades_are_reported() {
    // Alternate 100/104 every five bars: enter on each flat step, exit on the next.
    let closes: Vec<f64> = (0..200)
        .map(|i| if (i / 5) % 2 == 0 { 100.0 } else { 104.0 })
        .collect();

    struct AlwaysBuyAtClose;
    impl SignalEvaluator for AlwaysBuyAtClose {
        fn evaluate(
            &self,
            symbol: &str,
            daily: IndicatedView<'_>,
            _intraday: IndicatedView<'_>,
        ) -> CriteriaResult {
            let close = daily.bars().last().map_or(0.0, |b| b.close);
            graded(symbol, daily, Signal::StrongBuy, Some(setup(close, close - 2.0, close + 4.0)))
        }
    }

    let run = simulate(
        "SYN",
        &daily(&closes),
        &intraday(2000, 20),
        &AlwaysBuyAtClose,
        &BacktestParams::default(),
    )
    .unwrap();
    assert!(run.trades.len() > 10, "trades: {}", run.trades.len());

    let report = pullback_runner::BacktestReport::from_run(run.clone(), 10);
    assert_eq!(report.trades.len(), 10);
    assert_eq!(report.trades[..], run.trades[run.trades.len() - 10..]);
    assert_eq!(report.metrics.total_trades(), run.trades.len());
}

#[test]
fn caller_errors_are_rejected() {
    let d = daily(&[100.0; 70]);
    let h = intraday(200, 20);
    assert_eq!(
        backtest("", &d, &h, 10_000.0).unwrap_err(),
        BacktestError::EmptySymbol
    );
    assert_eq!(
        backtest("SYN", &d, &h, 0.0).unwrap_err(),
        BacktestError::InvalidCapital(0.0)
    );

    let mut bars = d.bars().to_vec();
    bars.swap(10, 11);
    let err = backtest("SYN", &compute_indicators(&bars), &h, 10_000.0).unwrap_err();
    assert!(matches!(err, BacktestError::Series { .. }));
}

// ── Invariants (proptest) ────────────────────────────────────────────

/// Buys whenever the daily view length is a multiple of `every`.
struct PeriodicBuyer {
    every: usize,
    stop_pct: f64,
}

impl SignalEvaluator for PeriodicBuyer {
    fn evaluate(
        &self,
        symbol: &str,
        daily: IndicatedView<'_>,
        _intraday: IndicatedView<'_>,
    ) -> CriteriaResult {
        let close = daily.bars().last().map_or(0.0, |b| b.close);
        if daily.len() % self.every == 0 {
            let stop = close * (1.0 - self.stop_pct);
            graded(symbol, daily, Signal::Buy, Some(setup(close, stop, close + 2.0 * (close - stop))))
        } else {
            graded(symbol, daily, Signal::Hold, None)
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn ledger_is_sequential_and_balanced(
        moves in prop::collection::vec(-3.0..3.0_f64, 60..260),
        every in 1usize..4,
        stop_pct in 0.01..0.05_f64,
        stride in 1usize..7,
    ) {
        let mut price = 100.0;
        let closes: Vec<f64> = moves
            .iter()
            .map(|m| {
                price = (price + m).max(5.0);
                price
            })
            .collect();
        let params = BacktestParams { stride, ..BacktestParams::default() };
        let run = simulate(
            "PROP",
            &daily(&closes),
            &intraday(3000, 20),
            &PeriodicBuyer { every, stop_pct },
            &params,
        )
        .unwrap();

        let mut last_exit: Option<NaiveDateTime> = None;
        for trade in &run.trades {
            prop_assert!(trade.exit_date > trade.entry_date);
            if let Some(prev) = last_exit {
                // At most one position at a time.
                prop_assert!(trade.entry_date > prev);
            }
            prop_assert!(trade.shares > 0);
            last_exit = Some(trade.exit_date);
        }
        if let (Some(open), Some(prev)) = (&run.open_position, last_exit) {
            prop_assert!(open.entry_date > prev);
        }

        let pnl: f64 = run.trades.iter().map(|t| t.pnl).sum();
        prop_assert!((run.final_capital - (params.initial_capital + pnl)).abs() < 1e-6);
    }
}
