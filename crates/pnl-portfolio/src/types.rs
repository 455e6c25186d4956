use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// BUY or SELL, derived from the sign of a transaction quantity.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

/// One row of the transaction ledger (the accounting atom).
///
/// quantity is signed: +qty = buy, -qty = sell.
/// unit_price is in the quote currency; fx_rate converts one unit of the
/// quote currency into base currency.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub ticker: String,
    pub date: NaiveDateTime,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub fx_rate: Decimal,
    pub currency: String,
}

impl Transaction {
    pub fn new<T: Into<String>, C: Into<String>>(
        ticker: T,
        date: NaiveDateTime,
        quantity: Decimal,
        unit_price: Decimal,
        fx_rate: Decimal,
        currency: C,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            date,
            quantity,
            unit_price,
            fx_rate,
            currency: currency.into(),
        }
    }

    /// `None` for a zero quantity.
    pub fn side(&self) -> Option<Side> {
        if self.quantity > Decimal::ZERO {
            Some(Side::Buy)
        } else if self.quantity < Decimal::ZERO {
            Some(Side::Sell)
        } else {
            None
        }
    }

    /// Unit price converted into base currency (`unit_price * fx_rate`).
    /// `None` when the product is outside `Decimal` range.
    pub fn base_unit_price(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(self.fx_rate)
    }
}

/// A FIFO purchase lot.
///
/// cost_basis_per_share is in base currency and fixed at creation; only
/// quantity_remaining moves as sells consume the lot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    pub quantity_remaining: Decimal,
    pub cost_basis_per_share: Decimal,
    pub open_date: NaiveDateTime,
}

impl Lot {
    pub fn new(quantity: Decimal, cost_basis_per_share: Decimal, open_date: NaiveDateTime) -> Self {
        debug_assert!(quantity > Decimal::ZERO, "Lot quantity must be > 0");
        Self {
            quantity_remaining: quantity,
            cost_basis_per_share,
            open_date,
        }
    }

    /// Base-currency cost still carried by this lot.
    pub fn remaining_cost_basis(&self) -> Decimal {
        self.quantity_remaining * self.cost_basis_per_share
    }
}

/// One (lot, sell) pairing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealizedGainRecord {
    pub symbol: String,
    pub realized_gain: Decimal,
    pub buy_date: NaiveDateTime,
    pub sell_date: NaiveDateTime,
    pub quantity_sold: Decimal,
}

/// Mark-to-market valuation of one open lot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnrealizedGainRecord {
    pub symbol: String,
    pub quantity: Decimal,
    pub cost_basis_per_share: Decimal,
    pub current_market_price: Decimal,
    pub current_fx_rate: Decimal,
    pub unrealized_gain: Decimal,
}

/// ticker -> latest unit price (quote currency).
pub type PriceMap = BTreeMap<String, Decimal>;

/// currency code -> base units per one unit of that currency.
pub type FxRateMap = BTreeMap<String, Decimal>;

/// Build a [`PriceMap`] with minimal boilerplate.
pub fn prices<I, S>(items: I) -> PriceMap
where
    I: IntoIterator<Item = (S, Decimal)>,
    S: Into<String>,
{
    items.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Build an [`FxRateMap`] with minimal boilerplate.
pub fn fx_rates<I, S>(items: I) -> FxRateMap
where
    I: IntoIterator<Item = (S, Decimal)>,
    S: Into<String>,
{
    items.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Parse a ledger timestamp.
///
/// Accepts `YYYY-MM-DD` (midnight), `YYYY-MM-DD HH:MM:SS[.f]`,
/// `YYYY-MM-DDTHH:MM:SS[.f]` and RFC 3339 (offset dropped after conversion
/// to UTC).
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
