//! TradeRecord: a completed long round trip, entry to exit.

use super::position::Position;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    StopLoss,
    TargetHit,
}

/// Append-only ledger entry produced when a position is closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub entry_date: NaiveDateTime,
    pub exit_date: NaiveDateTime,
    pub entry_price: f64,
    pub exit_price: f64,
    pub shares: u64,
    /// Realized profit: (exit - entry) * shares.
    pub pnl: f64,
    /// Price return in percent: (exit - entry) / entry * 100.
    pub return_pct: f64,
    pub exit_reason: ExitReason,
}

impl TradeRecord {
    /// Close `position` at `exit_price`, consuming it.
    pub fn close(
        position: Position,
        exit_date: NaiveDateTime,
        exit_price: f64,
        exit_reason: ExitReason,
    ) -> Self {
        let pnl = position.unrealized_pnl(exit_price);
        let return_pct = if position.entry_price == 0.0 {
            0.0
        } else {
            (exit_price - position.entry_price) / position.entry_price * 100.0
        };
        Self {
            entry_date: position.entry_date,
            exit_date,
            entry_price: position.entry_price,
            exit_price,
            shares: position.shares,
            pnl,
            return_pct,
            exit_reason,
        }
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn open_position() -> Position {
        Position {
            entry_price: 100.0,
            stop_loss: 98.0,
            target: 104.0,
            shares: 100,
            entry_date: at(1),
        }
    }

    #[test]
    fn target_exit_books_profit() {
        let trade = TradeRecord::close(open_position(), at(8), 104.0, ExitReason::TargetHit);
        assert_eq!(trade.pnl, 400.0);
        assert!((trade.return_pct - 4.0).abs() < 1e-12);
        assert!(trade.is_winner());
        assert_eq!(trade.entry_date, at(1));
        assert_eq!(trade.exit_date, at(8));
    }

    #[test]
    fn stop_exit_books_loss_with_matching_sign() {
        let trade = TradeRecord::close(open_position(), at(8), 97.5, ExitReason::StopLoss);
        assert_eq!(trade.pnl, -250.0);
        assert!(trade.return_pct < 0.0);
        assert!(!trade.is_winner());
    }

    #[test]
    fn exit_reason_wire_names() {
        let json = serde_json::to_string(&ExitReason::TargetHit).unwrap();
        assert_eq!(json, "\"TARGET_HIT\"");
        let json = serde_json::to_string(&ExitReason::StopLoss).unwrap();
        assert_eq!(json, "\"STOP_LOSS\"");
    }
}
