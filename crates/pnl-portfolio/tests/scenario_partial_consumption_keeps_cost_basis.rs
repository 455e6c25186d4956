//! Repeated partial sells only decrement quantity; the lot keeps the
//! per-share cost it was opened with.

use pnl_portfolio::{parse_timestamp, LotBook, PnlCalculator, Transaction};
use rust_decimal_macros::dec;

#[test]
fn scenario_partial_sells_preserve_original_cost() {
    let d = |s: &str| parse_timestamp(s).unwrap();

    // cost basis = 10.01 * 1.3 = 13.013 per share
    let mut calc = PnlCalculator::new();
    calc.apply(&Transaction::new("BP", d("2023-01-01"), dec!(9), dec!(10.01), dec!(1.3), "GBP"));
    for (day, px) in [("2023-02-01", dec!(11)), ("2023-03-01", dec!(12)), ("2023-04-01", dec!(9))] {
        calc.apply(&Transaction::new("BP", d(day), dec!(-2), px, dec!(1.3), "GBP"));
    }

    let book: &LotBook = calc.book();
    let lot = book.open_lots("BP").next().expect("lot still open");
    assert_eq!(lot.cost_basis_per_share, dec!(13.013));
    assert_eq!(lot.quantity_remaining, dec!(3));
    assert_eq!(lot.remaining_cost_basis(), dec!(39.039));

    // Each realized record is priced against the unchanged per-share cost.
    let gains: Vec<_> = calc.realized().iter().map(|r| r.realized_gain).collect();
    assert_eq!(
        gains,
        vec![
            (dec!(11) * dec!(1.3) - dec!(13.013)) * dec!(2),
            (dec!(12) * dec!(1.3) - dec!(13.013)) * dec!(2),
            (dec!(9) * dec!(1.3) - dec!(13.013)) * dec!(2),
        ]
    );
}
