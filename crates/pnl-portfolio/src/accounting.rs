use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::diagnostics::{PnlWarning, WarningKind};
use crate::lots::{LotBook, LotError};
use crate::ordering::sequence_canonical;
use crate::summary::PnlSummary;
use crate::types::{FxRateMap, PriceMap, RealizedGainRecord, Side, Transaction, UnrealizedGainRecord};
use crate::valuation::{realized_gain, value_open_lots};

// ---------------------------------------------------------------------------
// Structural validation
// ---------------------------------------------------------------------------

/// Malformed ledger rows. Any of these fails the whole run.
///
/// `index` is the row's position in the ledger as supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    EmptyTicker { index: usize },
    EmptyCurrency { index: usize, ticker: String },
    NegativeUnitPrice {
        index: usize,
        ticker: String,
        unit_price: Decimal,
    },
    NonPositiveFxRate {
        index: usize,
        ticker: String,
        fx_rate: Decimal,
    },
    /// `quantity * unit_price * fx_rate` does not fit in a `Decimal`.
    AmountOverflow { index: usize, ticker: String },
}

impl std::fmt::Display for TransactionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTicker { index } => {
                write!(f, "transaction #{index}: ticker must not be empty")
            }
            Self::EmptyCurrency { index, ticker } => {
                write!(f, "transaction #{index} ({ticker}): currency must not be empty")
            }
            Self::NegativeUnitPrice {
                index,
                ticker,
                unit_price,
            } => write!(
                f,
                "transaction #{index} ({ticker}): unit_price must be >= 0, got {unit_price}"
            ),
            Self::NonPositiveFxRate {
                index,
                ticker,
                fx_rate,
            } => write!(
                f,
                "transaction #{index} ({ticker}): fx_rate must be > 0, got {fx_rate}"
            ),
            Self::AmountOverflow { index, ticker } => write!(
                f,
                "transaction #{index} ({ticker}): base-currency amount overflows"
            ),
        }
    }
}

impl std::error::Error for TransactionError {}

pub fn validate_transaction(index: usize, tx: &Transaction) -> Result<(), TransactionError> {
    if tx.ticker.trim().is_empty() {
        return Err(TransactionError::EmptyTicker { index });
    }
    if tx.currency.trim().is_empty() {
        return Err(TransactionError::EmptyCurrency {
            index,
            ticker: tx.ticker.clone(),
        });
    }
    if tx.unit_price < Decimal::ZERO {
        return Err(TransactionError::NegativeUnitPrice {
            index,
            ticker: tx.ticker.clone(),
            unit_price: tx.unit_price,
        });
    }
    if tx.fx_rate <= Decimal::ZERO {
        return Err(TransactionError::NonPositiveFxRate {
            index,
            ticker: tx.ticker.clone(),
            fx_rate: tx.fx_rate,
        });
    }
    let notional = tx
        .base_unit_price()
        .and_then(|p| tx.quantity.abs().checked_mul(p));
    if notional.is_none() {
        return Err(TransactionError::AmountOverflow {
            index,
            ticker: tx.ticker.clone(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Output of one full recompute.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PnlReport {
    /// One record per (lot, sell) pairing, in replay order.
    pub realized: Vec<RealizedGainRecord>,
    /// One record per valued open lot, ticker ascending then oldest lot first.
    pub unrealized: Vec<UnrealizedGainRecord>,
    pub warnings: Vec<PnlWarning>,
    /// Open quantity per ticker after replay, valued or not.
    pub open_quantities: BTreeMap<String, Decimal>,
    /// Lots still open after replay, across all tickers.
    pub open_lots: usize,
}

impl PnlReport {
    pub fn warnings_of(&self, kind: WarningKind) -> impl Iterator<Item = &PnlWarning> {
        self.warnings.iter().filter(move |w| w.kind() == kind)
    }

    pub fn has_warning(&self, kind: WarningKind) -> bool {
        self.warnings_of(kind).next().is_some()
    }

    pub fn summary(&self) -> PnlSummary {
        PnlSummary::from_report(self)
    }
}

// ---------------------------------------------------------------------------
// Calculator
// ---------------------------------------------------------------------------

/// Incremental replay over a canonically ordered ledger.
///
/// Holds the [`LotBook`] it mutates, the realized records produced so far
/// and the latest quote currency seen per ticker. [`compute`] is the usual
/// entry point; use the calculator directly to inspect intermediate state.
#[derive(Clone, Debug, Default)]
pub struct PnlCalculator {
    book: LotBook,
    currencies: BTreeMap<String, String>,
    realized: Vec<RealizedGainRecord>,
    warnings: Vec<PnlWarning>,
}

impl PnlCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one transaction. Callers must feed transactions in canonical
    /// order (see [`crate::ordering`]).
    pub fn apply(&mut self, tx: &Transaction) {
        self.track_currency(tx);

        match tx.side() {
            None => self.warnings.push(PnlWarning::ZeroQuantity {
                ticker: tx.ticker.clone(),
                date: tx.date,
            }),
            Some(Side::Buy) => {
                let Some(cost) = tx.base_unit_price() else {
                    self.warn_overflow(tx);
                    return;
                };
                let opened = self.book.open(&tx.ticker, tx.quantity, cost, tx.date);
                debug_assert!(opened.is_ok(), "side() == Buy implies quantity > 0");
            }
            Some(Side::Sell) => self.apply_sell(tx),
        }
    }

    fn warn_overflow(&mut self, tx: &Transaction) {
        self.warnings.push(PnlWarning::AmountOverflow {
            ticker: tx.ticker.clone(),
            date: tx.date,
        });
    }

    fn apply_sell(&mut self, tx: &Transaction) {
        let requested = tx.quantity.abs();
        let Some(sell_base_price) = tx.base_unit_price() else {
            self.warn_overflow(tx);
            return;
        };

        let (matches, matched) = match self.book.consume(&tx.ticker, requested) {
            Ok(m) => (m, requested),
            Err(LotError::InsufficientLots { available, .. }) if available.is_zero() => {
                self.warnings.push(PnlWarning::UnmatchedSell {
                    ticker: tx.ticker.clone(),
                    date: tx.date,
                    quantity: requested,
                });
                return;
            }
            Err(LotError::InsufficientLots { available, .. }) => {
                self.warnings.push(PnlWarning::OversoldRemainder {
                    ticker: tx.ticker.clone(),
                    date: tx.date,
                    requested,
                    matched: available,
                    unmatched: requested - available,
                });
                match self.book.consume(&tx.ticker, available) {
                    Ok(m) => (m, available),
                    Err(_) => return,
                }
            }
            Err(LotError::NonPositiveQuantity { .. }) => return,
        };
        debug_assert!(matches.iter().map(|m| m.quantity_taken).sum::<Decimal>() == matched);

        for m in &matches {
            let Some(gain) = realized_gain(sell_base_price, m) else {
                self.warn_overflow(tx);
                continue;
            };
            self.realized.push(RealizedGainRecord {
                symbol: tx.ticker.clone(),
                realized_gain: gain,
                buy_date: m.lot_date,
                sell_date: tx.date,
                quantity_sold: m.quantity_taken,
            });
        }
    }

    fn track_currency(&mut self, tx: &Transaction) {
        match self.currencies.get_mut(&tx.ticker) {
            Some(prev) if *prev != tx.currency => {
                self.warnings.push(PnlWarning::MixedCurrency {
                    ticker: tx.ticker.clone(),
                    previous: prev.clone(),
                    current: tx.currency.clone(),
                });
                *prev = tx.currency.clone();
            }
            Some(_) => {}
            None => {
                self.currencies
                    .insert(tx.ticker.clone(), tx.currency.clone());
            }
        }
    }

    // -----------------------------------------------------------------------
    // Read surface
    // -----------------------------------------------------------------------

    pub fn book(&self) -> &LotBook {
        &self.book
    }

    pub fn realized(&self) -> &[RealizedGainRecord] {
        &self.realized
    }

    pub fn warnings(&self) -> &[PnlWarning] {
        &self.warnings
    }

    /// Value the remaining lots and close out the run.
    pub fn finish(mut self, latest_prices: &PriceMap, current_fx_rates: &FxRateMap) -> PnlReport {
        let unrealized = value_open_lots(
            &self.book,
            &self.currencies,
            latest_prices,
            current_fx_rates,
            &mut self.warnings,
        );
        let open_quantities = self
            .book
            .tickers()
            .map(|t| (t.to_string(), self.book.quantity_open(t)))
            .collect();

        PnlReport {
            realized: self.realized,
            unrealized,
            warnings: self.warnings,
            open_quantities,
            open_lots: self.book.lot_count(),
        }
    }
}

/// Full FIFO recompute over a transaction ledger.
///
/// `transactions` need not be sorted. Rows are validated first; a structural
/// error aborts before any replay. Data inconsistencies and missing market
/// data only produce warnings in the returned report.
///
/// Deterministic: identical inputs always yield an identical report.
pub fn compute(
    transactions: &[Transaction],
    latest_prices: &PriceMap,
    current_fx_rates: &FxRateMap,
) -> Result<PnlReport, TransactionError> {
    for (index, tx) in transactions.iter().enumerate() {
        validate_transaction(index, tx)?;
    }

    let mut calc = PnlCalculator::new();
    for st in sequence_canonical(transactions) {
        calc.apply(st.tx);
    }
    Ok(calc.finish(latest_prices, current_fx_rates))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{fx_rates, parse_timestamp, prices};
    use rust_decimal_macros::dec;

    fn tx(ticker: &str, date: &str, qty: Decimal, px: Decimal, fx: Decimal, ccy: &str) -> Transaction {
        Transaction::new(ticker, parse_timestamp(date).unwrap(), qty, px, fx, ccy)
    }

    // --- validation ---

    #[test]
    fn rejects_empty_ticker() {
        let ledger = vec![tx(" ", "2023-01-01", dec!(1), dec!(1), dec!(1), "USD")];
        let err = compute(&ledger, &PriceMap::new(), &FxRateMap::new());
        assert_eq!(err, Err(TransactionError::EmptyTicker { index: 0 }));
    }

    #[test]
    fn rejects_non_positive_fx() {
        let ledger = vec![
            tx("AAPL", "2023-01-01", dec!(1), dec!(1), dec!(1), "USD"),
            tx("AAPL", "2023-01-02", dec!(1), dec!(1), dec!(0), "USD"),
        ];
        let err = compute(&ledger, &PriceMap::new(), &FxRateMap::new()).unwrap_err();
        assert_eq!(
            err,
            TransactionError::NonPositiveFxRate {
                index: 1,
                ticker: "AAPL".to_string(),
                fx_rate: dec!(0)
            }
        );
        assert!(err.to_string().contains("transaction #1"));
    }

    #[test]
    fn rejects_negative_price_and_empty_currency() {
        let neg = vec![tx("AAPL", "2023-01-01", dec!(1), dec!(-1), dec!(1), "USD")];
        assert!(matches!(
            compute(&neg, &PriceMap::new(), &FxRateMap::new()),
            Err(TransactionError::NegativeUnitPrice { .. })
        ));

        let no_ccy = vec![tx("AAPL", "2023-01-01", dec!(1), dec!(1), dec!(1), "")];
        assert!(matches!(
            compute(&no_ccy, &PriceMap::new(), &FxRateMap::new()),
            Err(TransactionError::EmptyCurrency { .. })
        ));
    }

    #[test]
    fn oversized_amount_is_an_error_not_a_panic() {
        // 1 * 1e19 * 1e11 = 1e30 > Decimal::MAX
        let ledger = vec![tx(
            "BIG",
            "2023-01-01",
            dec!(1),
            dec!(10000000000000000000),
            dec!(100000000000),
            "USD",
        )];
        assert_eq!(
            compute(&ledger, &PriceMap::new(), &FxRateMap::new()),
            Err(TransactionError::AmountOverflow {
                index: 0,
                ticker: "BIG".to_string()
            })
        );

        // base price fits, quantity * base price does not
        let ledger = vec![tx(
            "BIG",
            "2023-01-01",
            dec!(1000000000000000),
            dec!(1000000000000000),
            dec!(1),
            "USD",
        )];
        let err = compute(&ledger, &prices([("BIG", dec!(1))]), &fx_rates([("USD", dec!(1))]))
            .unwrap_err();
        assert!(err.to_string().contains("overflows"));
    }

    #[test]
    fn calculator_skips_unvalidated_overflow_with_warning() {
        let mut calc = PnlCalculator::new();
        calc.apply(&tx("BIG", "2023-01-01", dec!(1), Decimal::MAX, dec!(2), "USD"));
        assert!(calc.book().is_flat());
        assert_eq!(calc.warnings().len(), 1);
        assert_eq!(calc.warnings()[0].kind(), WarningKind::AmountOverflow);
    }

    #[test]
    fn zero_price_buy_is_allowed() {
        let ledger = vec![tx("GIFT", "2023-01-01", dec!(3), dec!(0), dec!(1), "USD")];
        let r = compute(&ledger, &PriceMap::new(), &FxRateMap::new()).unwrap();
        assert_eq!(r.open_quantities.get("GIFT"), Some(&dec!(3)));
    }

    // --- replay ---

    #[test]
    fn zero_quantity_is_a_warning_only() {
        let ledger = vec![tx("AAPL", "2023-01-01", dec!(0), dec!(100), dec!(1), "USD")];
        let r = compute(&ledger, &PriceMap::new(), &FxRateMap::new()).unwrap();
        assert!(r.realized.is_empty());
        assert!(r.open_quantities.is_empty());
        assert!(r.has_warning(WarningKind::ZeroQuantity));
    }

    #[test]
    fn oversold_matches_what_is_open() {
        let ledger = vec![
            tx("AAPL", "2023-01-01", dec!(4), dec!(100), dec!(1), "USD"),
            tx("AAPL", "2023-02-01", dec!(-6), dec!(110), dec!(1), "USD"),
        ];
        let r = compute(&ledger, &PriceMap::new(), &FxRateMap::new()).unwrap();

        assert_eq!(r.realized.len(), 1);
        assert_eq!(r.realized[0].quantity_sold, dec!(4));
        assert_eq!(r.realized[0].realized_gain, dec!(40));
        assert!(r.open_quantities.is_empty());

        let w: Vec<_> = r.warnings_of(WarningKind::OversoldRemainder).collect();
        assert_eq!(w.len(), 1);
        match w[0] {
            PnlWarning::OversoldRemainder {
                matched, unmatched, ..
            } => {
                assert_eq!(*matched, dec!(4));
                assert_eq!(*unmatched, dec!(2));
            }
            other => panic!("unexpected warning {other:?}"),
        }
    }

    #[test]
    fn fx_applies_to_both_legs() {
        // buy 10 @ 100 EUR, fx 1.10 -> cost 110/sh; sell 10 @ 120 EUR, fx 1.05 -> 126/sh
        let ledger = vec![
            tx("SAP", "2023-01-01", dec!(10), dec!(100), dec!(1.10), "EUR"),
            tx("SAP", "2023-06-01", dec!(-10), dec!(120), dec!(1.05), "EUR"),
        ];
        let r = compute(&ledger, &PriceMap::new(), &FxRateMap::new()).unwrap();
        assert_eq!(r.realized[0].realized_gain, dec!(160));
    }

    #[test]
    fn mixed_currency_values_in_latest() {
        let ledger = vec![
            tx("SHOP", "2023-01-01", dec!(2), dec!(50), dec!(0.75), "CAD"),
            tx("SHOP", "2023-02-01", dec!(2), dec!(40), dec!(1), "USD"),
        ];
        let r = compute(
            &ledger,
            &prices([("SHOP", dec!(45))]),
            &fx_rates([("USD", dec!(1)), ("CAD", dec!(0.75))]),
        )
        .unwrap();

        assert!(r.has_warning(WarningKind::MixedCurrency));
        assert_eq!(r.unrealized.len(), 2);
        assert!(r.unrealized.iter().all(|u| u.current_fx_rate == dec!(1)));
    }

    #[test]
    fn calculator_exposes_intermediate_state() {
        let mut calc = PnlCalculator::new();
        calc.apply(&tx("AAPL", "2023-01-01", dec!(10), dec!(100), dec!(1), "USD"));
        calc.apply(&tx("AAPL", "2023-01-02", dec!(-3), dec!(105), dec!(1), "USD"));

        assert_eq!(calc.book().quantity_open("AAPL"), dec!(7));
        assert_eq!(calc.realized().len(), 1);
        assert!(calc.warnings().is_empty());
    }
}
