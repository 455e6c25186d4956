//! pnl-portfolio
//!
//! FIFO lot matching and gain calculation.
//! - Ledger rows replayed in canonical (ticker, date, ledger order)
//! - Per-ticker FIFO lot book, never short
//! - Realized gains per (lot, sell) pairing, unrealized gains per open lot
//! - All money in base currency as `Decimal`
//! - Pure deterministic logic (no IO, no time, no logging)

mod diagnostics;
mod summary;
mod types;

pub mod accounting;
pub mod lots;
pub mod ordering;
pub mod valuation;

pub use accounting::{compute, validate_transaction, PnlCalculator, PnlReport, TransactionError};
pub use diagnostics::{PnlWarning, WarningKind};
pub use lots::{LotBook, LotError, LotMatch};
pub use ordering::{sequence_canonical, SequencedTransaction};
pub use summary::{PnlSummary, TickerSummary};
pub use types::{
    fx_rates, parse_timestamp, prices, FxRateMap, Lot, PriceMap, RealizedGainRecord, Side,
    Transaction, UnrealizedGainRecord,
};
pub use valuation::{realized_gain, unrealized_gain, value_open_lots};
