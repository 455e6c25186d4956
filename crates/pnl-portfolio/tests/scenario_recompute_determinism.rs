//! Two runs over identical inputs produce identical reports, independent
//! of how the input ledger was ordered within a (ticker, date) tie.

use pnl_portfolio::{compute, fx_rates, parse_timestamp, prices, Transaction};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn ledger() -> Vec<Transaction> {
    let d = |s: &str| parse_timestamp(s).unwrap();
    let mut out = Vec::new();
    // Many small lots with awkward prices to stress repeated partial fills.
    for i in 0..40u32 {
        let day = format!("2023-01-{:02}", (i % 28) + 1);
        let px = dec!(100.37) + Decimal::from(i) * dec!(0.13);
        out.push(Transaction::new("XOM", d(&day), dec!(3.5), px, dec!(0.9137), "CHF"));
        if i % 3 == 2 {
            out.push(Transaction::new("XOM", d(&day), dec!(-4.25), px + dec!(1.01), dec!(0.9201), "CHF"));
        }
    }
    out.push(Transaction::new("ABC", d("2023-01-05"), dec!(1), dec!(10), dec!(1), "USD"));
    out
}

#[test]
fn scenario_identical_inputs_identical_outputs() {
    let px = prices([("XOM", dec!(104.11)), ("ABC", dec!(11))]);
    let fx = fx_rates([("CHF", dec!(0.9333)), ("USD", dec!(1))]);

    let a = compute(&ledger(), &px, &fx).unwrap();
    let b = compute(&ledger(), &px, &fx).unwrap();

    assert_eq!(a, b);
    assert!(!a.realized.is_empty());
    assert!(!a.unrealized.is_empty());
}

#[test]
fn scenario_open_quantity_matches_net_flow() {
    let px = prices([("XOM", dec!(104.11)), ("ABC", dec!(11))]);
    let fx = fx_rates([("CHF", dec!(0.9333)), ("USD", dec!(1))]);
    let l = ledger();

    let report = compute(&l, &px, &fx).unwrap();
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);

    let net: Decimal = l.iter().filter(|t| t.ticker == "XOM").map(|t| t.quantity).sum();
    let open: Decimal = report
        .unrealized
        .iter()
        .filter(|u| u.symbol == "XOM")
        .map(|u| u.quantity)
        .sum();
    assert_eq!(open, net);
}
