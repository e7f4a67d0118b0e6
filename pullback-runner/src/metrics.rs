//! Performance metrics: pure functions over the trade ledger.
//!
//! Every metric is a pure function: trade list in, scalar out. Winners are
//! trades with pnl > 0; everything else (including breakeven) is a loser.

use serde::{Deserialize, Serialize};

use pullback_core::TradeRecord;

/// Message carried by the degenerate metrics of a run without trades.
pub const NO_TRADES_MESSAGE: &str = "No trades generated in backtest period";

/// Aggregate statistics of a run with at least one closed trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Percent of trades that were winners.
    pub win_rate: f64,
    /// Sum of realized pnl.
    pub total_return: f64,
    /// `total_return` as percent of initial capital.
    pub total_return_pct: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub final_capital: f64,
}

/// Backtest metrics: either a summary or the explicit no-trades marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BacktestMetrics {
    Summary(PerformanceSummary),
    NoTrades { total_trades: usize, message: String },
}

impl BacktestMetrics {
    /// Compute metrics over the full ledger.
    pub fn compute(trades: &[TradeRecord], initial_capital: f64, final_capital: f64) -> Self {
        if trades.is_empty() {
            return Self::NoTrades {
                total_trades: 0,
                message: NO_TRADES_MESSAGE.to_string(),
            };
        }
        let winners: Vec<f64> = trades.iter().filter(|t| t.is_winner()).map(|t| t.pnl).collect();
        let losers: Vec<f64> = trades.iter().filter(|t| !t.is_winner()).map(|t| t.pnl).collect();
        let total = total_pnl(trades);

        Self::Summary(PerformanceSummary {
            total_trades: trades.len(),
            winning_trades: winners.len(),
            losing_trades: losers.len(),
            win_rate: win_rate(trades),
            total_return: total,
            total_return_pct: if initial_capital > 0.0 {
                total / initial_capital * 100.0
            } else {
                0.0
            },
            avg_win: mean_or_zero(&winners),
            avg_loss: mean_or_zero(&losers),
            final_capital,
        })
    }

    pub fn total_trades(&self) -> usize {
        match self {
            Self::Summary(s) => s.total_trades,
            Self::NoTrades { total_trades, .. } => *total_trades,
        }
    }

    pub fn summary(&self) -> Option<&PerformanceSummary> {
        match self {
            Self::Summary(s) => Some(s),
            Self::NoTrades { .. } => None,
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Sum of realized pnl.
pub fn total_pnl(trades: &[TradeRecord]) -> f64 {
    trades.iter().map(|t| t.pnl).sum()
}

/// Percent of trades with pnl > 0. 0 for an empty ledger.
pub fn win_rate(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let wins = trades.iter().filter(|t| t.is_winner()).count();
    wins as f64 / trades.len() as f64 * 100.0
}

fn mean_or_zero(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
