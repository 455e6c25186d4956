//! Per-ticker and portfolio-level aggregates of a [`PnlReport`].

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::accounting::PnlReport;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TickerSummary {
    pub realized_gain: Decimal,
    pub quantity_sold: Decimal,
    pub open_quantity: Decimal,
    /// `None` when the ticker has open lots that could not be valued.
    pub unrealized_gain: Option<Decimal>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PnlSummary {
    pub per_ticker: BTreeMap<String, TickerSummary>,
    pub total_realized_gain: Decimal,
    /// Sum over valued lots only.
    pub total_unrealized_gain: Decimal,
    pub realized_records: usize,
    pub unrealized_records: usize,
    pub open_lots: usize,
    pub warnings: usize,
}

impl PnlSummary {
    pub fn from_report(report: &PnlReport) -> Self {
        let mut per_ticker: BTreeMap<String, TickerSummary> = BTreeMap::new();

        for r in &report.realized {
            let t = per_ticker.entry(r.symbol.clone()).or_default();
            t.realized_gain = t.realized_gain.saturating_add(r.realized_gain);
            t.quantity_sold = t.quantity_sold.saturating_add(r.quantity_sold);
        }
        for (ticker, qty) in &report.open_quantities {
            per_ticker.entry(ticker.clone()).or_default().open_quantity = *qty;
        }
        for u in &report.unrealized {
            let t = per_ticker.entry(u.symbol.clone()).or_default();
            let g = t.unrealized_gain.get_or_insert(Decimal::ZERO);
            *g = g.saturating_add(u.unrealized_gain);
        }

        Self {
            total_realized_gain: saturating_sum(report.realized.iter().map(|r| r.realized_gain)),
            total_unrealized_gain: saturating_sum(
                report.unrealized.iter().map(|u| u.unrealized_gain),
            ),
            realized_records: report.realized.len(),
            unrealized_records: report.unrealized.len(),
            open_lots: report.open_lots,
            warnings: report.warnings.len(),
            per_ticker,
        }
    }
}

/// Totals clamp at the `Decimal` bounds instead of panicking.
fn saturating_sum(values: impl Iterator<Item = Decimal>) -> Decimal {
    values.fold(Decimal::ZERO, Decimal::saturating_add)
}
