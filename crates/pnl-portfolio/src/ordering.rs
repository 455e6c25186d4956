//! Transaction ordering policy.
//!
//! Replay must see every ticker's transactions in chronological order, and
//! the same ledger must always replay in the same order. Sorting is done on
//! an explicit key so determinism never depends on sort stability alone.
//!
//! # Canonical sort key
//!
//! `(ticker, date, seq_no)` ascending, where `seq_no` is the position of the
//! transaction in the ledger as it was read. Two transactions on the same
//! ticker and timestamp therefore replay in ledger order.

use std::cmp::Ordering;

use crate::types::Transaction;

/// A transaction tagged with its original ledger position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequencedTransaction<'a> {
    /// Index in the input ledger. Lower = replayed first on ties.
    pub seq_no: usize,
    pub tx: &'a Transaction,
}

fn canonical_cmp(a: &SequencedTransaction<'_>, b: &SequencedTransaction<'_>) -> Ordering {
    a.tx.ticker
        .cmp(&b.tx.ticker)
        .then_with(|| a.tx.date.cmp(&b.tx.date))
        .then_with(|| a.seq_no.cmp(&b.seq_no))
}

/// Tag `transactions` with their ledger positions and sort into canonical order.
pub fn sequence_canonical(transactions: &[Transaction]) -> Vec<SequencedTransaction<'_>> {
    let mut out: Vec<SequencedTransaction<'_>> = transactions
        .iter()
        .enumerate()
        .map(|(seq_no, tx)| SequencedTransaction { seq_no, tx })
        .collect();
    out.sort_by(canonical_cmp);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::parse_timestamp;
    use rust_decimal_macros::dec;

    fn tx(ticker: &str, date: &str, qty: rust_decimal::Decimal) -> Transaction {
        Transaction::new(ticker, parse_timestamp(date).unwrap(), qty, dec!(1), dec!(1), "USD")
    }

    #[test]
    fn sorts_by_ticker_then_date() {
        let ledger = vec![
            tx("MSFT", "2023-02-01", dec!(1)),
            tx("AAPL", "2023-03-01", dec!(2)),
            tx("AAPL", "2023-01-01", dec!(3)),
        ];
        let seq = sequence_canonical(&ledger);
        let order: Vec<usize> = seq.iter().map(|s| s.seq_no).collect();
        assert_eq!(order, vec![2, 1, 0]);
    }

    #[test]
    fn ties_keep_ledger_order() {
        let ledger = vec![
            tx("AAPL", "2023-01-01", dec!(-5)),
            tx("AAPL", "2023-01-01", dec!(5)),
            tx("AAPL", "2023-01-01", dec!(7)),
        ];
        let seq = sequence_canonical(&ledger);
        let qtys: Vec<_> = seq.iter().map(|s| s.tx.quantity).collect();
        assert_eq!(qtys, vec![dec!(-5), dec!(5), dec!(7)]);
    }

    #[test]
    fn empty_ledger_sequences_to_empty() {
        assert!(sequence_canonical(&[]).is_empty());
    }
}
