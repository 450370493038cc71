//! Domain types: bars, orders, trade state.

pub mod bar;
pub mod order;
pub mod trade;

pub use bar::PriceBar;
pub use order::{ConditionalOrder, ConfirmationConfig, Direction, OrderError, TrailingConfig};
pub use trade::{ActionKind, ExitReason, TradeAction, TradeState, TradeStatus};

/// Symbols are plain strings (broker/scanner tickers).
pub type Symbol = String;
