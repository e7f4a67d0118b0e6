//! Pullback CLI: indicator, analysis, status, scan and backtest commands.
//!
//! Commands:
//! - `indicators`: compute the indicator table for one CSV series
//! - `analyze`: six-criteria evaluation of a symbol at its latest bar
//! - `status`: one-glance trend/momentum summary of a symbol's daily series
//! - `scan`: evaluate many symbols in parallel and rank the opportunities
//! - `backtest`: walk a symbol's history trading the pullback signal
//!
//! Symbols are read from `<data-dir>/<SYMBOL>_1d.csv` and `<SYMBOL>_4h.csv`.
//! Results go to stdout as JSON; logs go to stderr (`RUST_LOG` to filter).

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use pullback_core::{
    compute_indicators, CriteriaEvaluator, IndicatedSeries, SignalEvaluator, StrategyStatus,
};
use pullback_runner::data_loader::{dataset_hash, load_symbol};
use pullback_runner::{
    backtest_with, load_bars_csv, scan, BacktestMetrics, BacktestReport, RunConfig, ScanInput,
    DEFAULT_MIN_CONFIDENCE,
};

#[derive(Parser)]
#[command(
    name = "pullback",
    about = "Pullback CLI: six-criteria EMA pullback signals and backtests"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute indicators for a single CSV series.
    Indicators {
        /// CSV file with timestamp,open,high,low,close,volume.
        path: PathBuf,

        /// Only print the last N rows.
        #[arg(long)]
        tail: Option<usize>,
    },
    /// Evaluate the six criteria for a symbol at its latest daily bar.
    Analyze {
        symbol: String,

        /// Directory holding <SYMBOL>_1d.csv and <SYMBOL>_4h.csv.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Path to a TOML run config.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Summarise trend and momentum of a symbol's daily series.
    Status {
        symbol: String,

        /// Directory holding <SYMBOL>_1d.csv and <SYMBOL>_4h.csv.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
    /// Evaluate several symbols and rank those above a confidence floor.
    Scan {
        /// Symbols to scan (e.g., AAPL MSFT NVDA).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Directory holding <SYMBOL>_1d.csv and <SYMBOL>_4h.csv.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Minimum confidence to report.
        #[arg(long, default_value_t = DEFAULT_MIN_CONFIDENCE)]
        min_confidence: u8,

        /// Path to a TOML run config.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Backtest the pullback strategy on a symbol's history.
    Backtest {
        symbol: String,

        /// Directory holding <SYMBOL>_1d.csv and <SYMBOL>_4h.csv.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Path to a TOML run config.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Initial capital (overrides the config).
        #[arg(long)]
        capital: Option<f64>,

        /// Print a human-readable summary instead of JSON.
        #[arg(long, default_value_t = false)]
        summary: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Indicators { path, tail } => run_indicators(&path, tail),
        Commands::Analyze {
            symbol,
            data_dir,
            config,
        } => run_analyze(&symbol, &data_dir, config.as_deref()),
        Commands::Status { symbol, data_dir } => run_status(&symbol, &data_dir),
        Commands::Scan {
            symbols,
            data_dir,
            min_confidence,
            config,
        } => run_scan(&symbols, &data_dir, min_confidence, config.as_deref()),
        Commands::Backtest {
            symbol,
            data_dir,
            config,
            capital,
            summary,
        } => run_backtest_cmd(&symbol, &data_dir, config.as_deref(), capital, summary),
    }
}

fn load_config(path: Option<&Path>) -> Result<RunConfig> {
    match path {
        Some(path) => RunConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(RunConfig::default()),
    }
}

fn load_indicated(data_dir: &Path, symbol: &str) -> Result<(IndicatedSeries, IndicatedSeries)> {
    let (daily, intraday) =
        load_symbol(data_dir, symbol).with_context(|| format!("loading data for {symbol}"))?;
    Ok((compute_indicators(&daily), compute_indicators(&intraday)))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_indicators(path: &Path, tail: Option<usize>) -> Result<()> {
    let bars = load_bars_csv(path)?;
    let series = compute_indicators(&bars);
    if series.is_degraded() {
        warn!(path = %path.display(), "indicators unavailable; printing bars only");
    }
    let view = match tail {
        Some(n) => series.view().tail(n),
        None => series.view(),
    };
    let rows: Vec<serde_json::Value> = view
        .bars()
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            serde_json::json!({
                "bar": bar,
                "indicators": view.rows().map(|rows| &rows[i]),
            })
        })
        .collect();
    print_json(&rows)
}

fn run_analyze(symbol: &str, data_dir: &Path, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let (daily, intraday) = load_indicated(data_dir, symbol)?;
    let evaluator = CriteriaEvaluator::new(config.strategy);
    let result = evaluator.evaluate(symbol, daily.view(), intraday.view());
    info!(symbol, signal = ?result.signal, criteria_met = result.criteria_met, "analysis complete");
    print_json(&result)
}

fn run_status(symbol: &str, data_dir: &Path) -> Result<()> {
    let (daily, _) = load_indicated(data_dir, symbol)?;
    let Some(status) = StrategyStatus::from_series(&daily) else {
        bail!("no indicator data for {symbol}");
    };
    print_json(&serde_json::json!({ "symbol": symbol, "status": status }))
}

fn run_scan(
    symbols: &[String],
    data_dir: &Path,
    min_confidence: u8,
    config: Option<&Path>,
) -> Result<()> {
    let config = load_config(config)?;
    // A symbol that fails to load still counts as scanned; its empty input
    // evaluates to an ERROR result, which the scan never reports.
    let inputs: Vec<ScanInput> = symbols
        .iter()
        .map(|symbol| match load_indicated(data_dir, symbol) {
            Ok((daily, intraday)) => ScanInput {
                symbol: symbol.clone(),
                daily,
                intraday,
            },
            Err(err) => {
                let error = format!("{err:#}");
                warn!(symbol = %symbol, %error, "symbol unavailable; counted as an error result");
                ScanInput {
                    symbol: symbol.clone(),
                    daily: IndicatedSeries::without_indicators(Vec::new()),
                    intraday: IndicatedSeries::without_indicators(Vec::new()),
                }
            }
        })
        .collect();

    let evaluator = CriteriaEvaluator::new(config.strategy);
    let report = scan(&inputs, &evaluator, min_confidence);
    print_json(&report)
}

fn run_backtest_cmd(
    symbol: &str,
    data_dir: &Path,
    config: Option<&Path>,
    capital: Option<f64>,
    summary: bool,
) -> Result<()> {
    let mut config = load_config(config)?;
    if let Some(capital) = capital {
        config.backtest.initial_capital = capital;
    }
    config.validate()?;
    let run_id = config.run_id()?;

    let (daily_bars, intraday_bars) =
        load_symbol(data_dir, symbol).with_context(|| format!("loading data for {symbol}"))?;
    let data_hash = dataset_hash(&daily_bars);
    let daily = compute_indicators(&daily_bars);
    let intraday = compute_indicators(&intraday_bars);

    let evaluator = CriteriaEvaluator::new(config.strategy.clone());
    let report = backtest_with(symbol, &daily, &intraday, &evaluator, &config.backtest)?;

    if summary {
        print_summary(&report, &run_id);
        return Ok(());
    }
    print_json(&serde_json::json!({
        "run_id": run_id,
        "dataset_hash": data_hash,
        "report": report,
    }))
}

fn print_summary(report: &BacktestReport, run_id: &str) {
    println!();
    println!("=== Backtest Result ===");
    println!("Symbol:         {}", report.symbol);
    println!("Run ID:         {}", &run_id[..run_id.len().min(12)]);
    println!("Capital:        {:.2}", report.initial_capital);
    println!();
    match &report.metrics {
        BacktestMetrics::Summary(m) => {
            println!("--- Performance ---");
            println!("Trades:         {}", m.total_trades);
            println!("Winners:        {}", m.winning_trades);
            println!("Losers:         {}", m.losing_trades);
            println!("Win Rate:       {:.1}%", m.win_rate);
            println!("Total Return:   {:.2} ({:.2}%)", m.total_return, m.total_return_pct);
            println!("Avg Win:        {:.2}", m.avg_win);
            println!("Avg Loss:       {:.2}", m.avg_loss);
            println!("Final Capital:  {:.2}", m.final_capital);
        }
        BacktestMetrics::NoTrades { message, .. } => println!("{message}"),
    }
    if let Some(open) = &report.open_position {
        println!();
        println!(
            "Open position:  {} shares @ {:.2} (stop {:.2}, target {:.2}) since {}",
            open.shares, open.entry_price, open.stop_loss, open.target, open.entry_date
        );
    }
    if !report.trades.is_empty() {
        println!();
        println!("--- Latest Trades ---");
        for t in &report.trades {
            println!(
                "{} → {}  {:>6} sh  {:>9.2} → {:>9.2}  {:>+10.2}  {:?}",
                t.entry_date.date(),
                t.exit_date.date(),
                t.shares,
                t.entry_price,
                t.exit_price,
                t.pnl,
                t.exit_reason
            );
        }
    }
    println!();
}
