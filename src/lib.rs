//! Adjusted cost base (ACB) tracking for a ledger of securities and crypto
//! transactions, following Canadian pooled average cost rules.

pub mod aggregation;
pub mod error;
pub mod normalize;
pub mod reducer;
pub mod report;
pub mod sheet;
pub mod transaction;
pub mod value;

pub use aggregation::{
    AggregateResult, PortfolioPositions, calculate_aggregates, income_by_ticker,
    pending_gains_by_ticker,
};
pub use error::{Error, render_chain};
pub use reducer::{PositionSnapshot, PostTradeSnapshot, ReduceError, reduce};
pub use sheet::{Cell, SheetRow, load_table, parse_table, read_table};
pub use transaction::{CashFlow, Ticker, TransactionRecord, TransactionType};
pub use value::{Money, Shares, ValueError};
