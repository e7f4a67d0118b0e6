use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// The single open long position of a backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub entry_price: f64,
    pub stop_loss: f64,
    pub target: f64,
    pub shares: u64,
    pub entry_date: NaiveDateTime,
}

impl Position {
    pub fn stop_hit(&self, price: f64) -> bool {
        price <= self.stop_loss
    }

    pub fn target_hit(&self, price: f64) -> bool {
        price >= self.target
    }

    pub fn unrealized_pnl(&self, current_price: f64) -> f64 {
        self.shares as f64 * (current_price - self.entry_price)
    }
}
