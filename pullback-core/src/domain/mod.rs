//! Domain types for the pullback engine

pub mod bar;
pub mod position;
pub mod trade;

pub use bar::{validate_series, Bar, BarError};
pub use position::Position;
pub use trade::{ExitReason, TradeRecord};

/// Symbol type alias
pub type Symbol = String;
