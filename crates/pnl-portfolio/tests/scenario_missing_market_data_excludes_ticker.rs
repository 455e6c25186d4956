//! Tickers without a latest price or FX rate are dropped from unrealized
//! output (with a warning); their realized gains are unaffected.

use pnl_portfolio::{compute, fx_rates, parse_timestamp, prices, Transaction, WarningKind};
use rust_decimal_macros::dec;

fn ledger() -> Vec<Transaction> {
    let d = |s: &str| parse_timestamp(s).unwrap();
    vec![
        Transaction::new("AAPL", d("2023-01-01"), dec!(10), dec!(100), dec!(1), "USD"),
        Transaction::new("AAPL", d("2023-02-01"), dec!(-4), dec!(110), dec!(1), "USD"),
        Transaction::new("SAP", d("2023-01-01"), dec!(5), dec!(100), dec!(1.1), "EUR"),
        Transaction::new("SAP", d("2023-02-01"), dec!(-1), dec!(120), dec!(1.1), "EUR"),
    ]
}

#[test]
fn scenario_missing_price_skips_unrealized_only() {
    let report = compute(
        &ledger(),
        &prices([("SAP", dec!(130))]),
        &fx_rates([("USD", dec!(1)), ("EUR", dec!(1.1))]),
    )
    .unwrap();

    // Realized for both tickers are present.
    assert!(report.realized.iter().any(|r| r.symbol == "AAPL"));
    assert!(report.realized.iter().any(|r| r.symbol == "SAP"));

    // No unrealized AAPL rows at all.
    assert!(report.unrealized.iter().all(|u| u.symbol == "SAP"));
    assert_eq!(report.unrealized.len(), 1);

    let missing: Vec<_> = report.warnings_of(WarningKind::MissingMarketData).collect();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].ticker(), "AAPL");
}

#[test]
fn scenario_missing_fx_rate_skips_unrealized_only() {
    let report = compute(
        &ledger(),
        &prices([("AAPL", dec!(120)), ("SAP", dec!(130))]),
        &fx_rates([("USD", dec!(1))]),
    )
    .unwrap();

    assert_eq!(report.realized.len(), 2);
    assert!(report.unrealized.iter().all(|u| u.symbol == "AAPL"));
    assert!(report.has_warning(WarningKind::MissingFxRate));
    assert!(!report.has_warning(WarningKind::MissingMarketData));

    // open SAP quantity is still reported even though it was not valued
    assert_eq!(report.open_quantities.get("SAP"), Some(&dec!(4)));
}
