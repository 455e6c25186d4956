//! Advisory diagnostics raised during replay and valuation.
//!
//! None of these stop a run. They are returned in the report so the caller
//! decides how to surface them (the CLI logs each one at `warn`).

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

/// Stable, queryable warning categories.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WarningKind {
    ZeroQuantity,
    UnmatchedSell,
    OversoldRemainder,
    MixedCurrency,
    MissingMarketData,
    MissingFxRate,
    AmountOverflow,
    ValuationOverflow,
}

impl WarningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningKind::ZeroQuantity => "zero_quantity",
            WarningKind::UnmatchedSell => "unmatched_sell",
            WarningKind::OversoldRemainder => "oversold_remainder",
            WarningKind::MixedCurrency => "mixed_currency",
            WarningKind::MissingMarketData => "missing_market_data",
            WarningKind::MissingFxRate => "missing_fx_rate",
            WarningKind::AmountOverflow => "amount_overflow",
            WarningKind::ValuationOverflow => "valuation_overflow",
        }
    }
}

impl std::fmt::Display for WarningKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PnlWarning {
    /// Transaction with quantity 0; ignored.
    ZeroQuantity { ticker: String, date: NaiveDateTime },
    /// Sell on a ticker with no open lots; whole sell skipped.
    UnmatchedSell {
        ticker: String,
        date: NaiveDateTime,
        quantity: Decimal,
    },
    /// Sell larger than the open quantity; only `matched` was applied.
    OversoldRemainder {
        ticker: String,
        date: NaiveDateTime,
        requested: Decimal,
        matched: Decimal,
        unmatched: Decimal,
    },
    /// Ticker switched quote currency; the latest one is used for valuation.
    MixedCurrency {
        ticker: String,
        previous: String,
        current: String,
    },
    /// Open lots but no latest price; unrealized valuation skipped.
    MissingMarketData { ticker: String, open_quantity: Decimal },
    /// Open lots but no current FX rate for the ticker's currency.
    MissingFxRate {
        ticker: String,
        currency: String,
        open_quantity: Decimal,
    },
    /// A base-currency amount for this row is outside `Decimal` range; the
    /// row (or the affected realized record) is skipped.
    AmountOverflow { ticker: String, date: NaiveDateTime },
    /// Market value of the open lots is outside `Decimal` range; unrealized
    /// valuation skipped for the ticker.
    ValuationOverflow { ticker: String, open_quantity: Decimal },
}

impl PnlWarning {
    pub fn kind(&self) -> WarningKind {
        match self {
            PnlWarning::ZeroQuantity { .. } => WarningKind::ZeroQuantity,
            PnlWarning::UnmatchedSell { .. } => WarningKind::UnmatchedSell,
            PnlWarning::OversoldRemainder { .. } => WarningKind::OversoldRemainder,
            PnlWarning::MixedCurrency { .. } => WarningKind::MixedCurrency,
            PnlWarning::MissingMarketData { .. } => WarningKind::MissingMarketData,
            PnlWarning::MissingFxRate { .. } => WarningKind::MissingFxRate,
            PnlWarning::AmountOverflow { .. } => WarningKind::AmountOverflow,
            PnlWarning::ValuationOverflow { .. } => WarningKind::ValuationOverflow,
        }
    }

    pub fn ticker(&self) -> &str {
        match self {
            PnlWarning::ZeroQuantity { ticker, .. }
            | PnlWarning::UnmatchedSell { ticker, .. }
            | PnlWarning::OversoldRemainder { ticker, .. }
            | PnlWarning::MixedCurrency { ticker, .. }
            | PnlWarning::MissingMarketData { ticker, .. }
            | PnlWarning::MissingFxRate { ticker, .. }
            | PnlWarning::AmountOverflow { ticker, .. }
            | PnlWarning::ValuationOverflow { ticker, .. } => ticker,
        }
    }
}

impl std::fmt::Display for PnlWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroQuantity { ticker, date } => {
                write!(f, "zero-quantity transaction for {ticker} on {date}; ignored")
            }
            Self::UnmatchedSell {
                ticker,
                date,
                quantity,
            } => write!(
                f,
                "sell of {quantity} {ticker} on {date} has no open buy lots; skipped"
            ),
            Self::OversoldRemainder {
                ticker,
                date,
                requested,
                matched,
                unmatched,
            } => write!(
                f,
                "sell of {requested} {ticker} on {date} exceeds open lots; matched {matched}, skipped {unmatched}"
            ),
            Self::MixedCurrency {
                ticker,
                previous,
                current,
            } => write!(
                f,
                "{ticker} changed currency from {previous} to {current}; valuing in {current}"
            ),
            Self::MissingMarketData {
                ticker,
                open_quantity,
            } => write!(
                f,
                "no latest price for {ticker} ({open_quantity} open); unrealized P&L skipped"
            ),
            Self::MissingFxRate {
                ticker,
                currency,
                open_quantity,
            } => write!(
                f,
                "no current FX rate for {currency}; unrealized P&L for {ticker} ({open_quantity} open) skipped"
            ),
            Self::AmountOverflow { ticker, date } => {
                write!(f, "amount for {ticker} on {date} overflows; skipped")
            }
            Self::ValuationOverflow {
                ticker,
                open_quantity,
            } => write!(
                f,
                "market value of {ticker} ({open_quantity} open) overflows; unrealized P&L skipped"
            ),
        }
    }
}
