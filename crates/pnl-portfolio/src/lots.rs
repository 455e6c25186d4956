//! Lot book — per-ticker FIFO queues of open purchase lots.
//!
//! # Purpose
//! [`LotBook`] owns one queue per ticker, oldest lot at the head. It exposes a
//! minimal write surface (`open`, `consume`) and read-only views used for
//! unrealized valuation once replay is finished.
//!
//! # Invariants
//! - Every queued lot has `quantity_remaining > 0`; a lot that reaches zero is
//!   removed, and a ticker with no lots is dropped from the book.
//! - `cost_basis_per_share` is never rewritten. Partial consumption only
//!   decrements `quantity_remaining`.
//! - The book never goes short: `consume` fails with
//!   [`LotError::InsufficientLots`] and leaves the book **unchanged** when the
//!   request exceeds the open quantity.
//!
//! # Determinism
//! Queues live in a `BTreeMap`, so iteration over tickers is sorted and two
//! books fed the same calls always compare equal.

use std::collections::{BTreeMap, VecDeque};

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::types::Lot;

static NO_LOTS: VecDeque<Lot> = VecDeque::new();

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LotError {
    /// Quantities passed to `open`/`consume` must be strictly positive.
    NonPositiveQuantity { ticker: String, quantity: Decimal },
    /// The ticker's queue cannot cover the requested quantity.
    InsufficientLots {
        ticker: String,
        requested: Decimal,
        available: Decimal,
    },
}

impl std::fmt::Display for LotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositiveQuantity { ticker, quantity } => {
                write!(f, "lot book: quantity must be > 0 for {ticker}, got {quantity}")
            }
            Self::InsufficientLots {
                ticker,
                requested,
                available,
            } => write!(
                f,
                "lot book: insufficient lots for {ticker}: requested {requested}, open {available}"
            ),
        }
    }
}

impl std::error::Error for LotError {}

// ---------------------------------------------------------------------------
// LotMatch
// ---------------------------------------------------------------------------

/// How part of a consume request was satisfied by one lot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LotMatch {
    pub lot_date: NaiveDateTime,
    pub cost_basis_per_share: Decimal,
    pub quantity_taken: Decimal,
}

// ---------------------------------------------------------------------------
// LotBook
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LotBook {
    queues: BTreeMap<String, VecDeque<Lot>>,
}

impl LotBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a new lot to the tail of `ticker`'s queue.
    pub fn open(
        &mut self,
        ticker: &str,
        quantity: Decimal,
        cost_basis_per_share: Decimal,
        date: NaiveDateTime,
    ) -> Result<(), LotError> {
        if quantity <= Decimal::ZERO {
            return Err(LotError::NonPositiveQuantity {
                ticker: ticker.to_string(),
                quantity,
            });
        }
        self.queues
            .entry(ticker.to_string())
            .or_default()
            .push_back(Lot::new(quantity, cost_basis_per_share, date));
        Ok(())
    }

    /// Consume `quantity` shares from the head of `ticker`'s queue.
    ///
    /// Returns one [`LotMatch`] per lot touched, oldest first. Fully consumed
    /// lots are popped; the last lot touched may be left partially open with
    /// its original per-share cost.
    ///
    /// # Errors
    /// [`LotError::InsufficientLots`] if the open quantity is below the
    /// request. The book is **not** mutated on error.
    pub fn consume(&mut self, ticker: &str, quantity: Decimal) -> Result<Vec<LotMatch>, LotError> {
        if quantity <= Decimal::ZERO {
            return Err(LotError::NonPositiveQuantity {
                ticker: ticker.to_string(),
                quantity,
            });
        }

        let available = self.quantity_open(ticker);
        if available < quantity {
            return Err(LotError::InsufficientLots {
                ticker: ticker.to_string(),
                requested: quantity,
                available,
            });
        }

        let mut matches = Vec::new();
        let mut remaining = quantity;

        if let Some(queue) = self.queues.get_mut(ticker) {
            while remaining > Decimal::ZERO {
                let Some(head) = queue.front_mut() else {
                    break;
                };

                if head.quantity_remaining <= remaining {
                    remaining -= head.quantity_remaining;
                    matches.push(LotMatch {
                        lot_date: head.open_date,
                        cost_basis_per_share: head.cost_basis_per_share,
                        quantity_taken: head.quantity_remaining,
                    });
                    queue.pop_front();
                } else {
                    head.quantity_remaining -= remaining;
                    matches.push(LotMatch {
                        lot_date: head.open_date,
                        cost_basis_per_share: head.cost_basis_per_share,
                        quantity_taken: remaining,
                    });
                    remaining = Decimal::ZERO;
                }
            }

            if queue.is_empty() {
                self.queues.remove(ticker);
            }
        }

        Ok(matches)
    }

    // -----------------------------------------------------------------------
    // Read surface
    // -----------------------------------------------------------------------

    /// Remaining lots for `ticker`, oldest first (empty if none).
    pub fn open_lots(&self, ticker: &str) -> std::collections::vec_deque::Iter<'_, Lot> {
        self.queues.get(ticker).unwrap_or(&NO_LOTS).iter()
    }

    /// Total open quantity for `ticker` (zero if none).
    pub fn quantity_open(&self, ticker: &str) -> Decimal {
        self.open_lots(ticker)
            .map(|l| l.quantity_remaining)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    /// Tickers holding at least one open lot, sorted.
    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.queues.keys().map(String::as_str)
    }

    pub fn is_flat(&self) -> bool {
        self.queues.is_empty()
    }

    /// Number of open lots across all tickers.
    pub fn lot_count(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
