use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::diagnostics::PnlWarning;
use crate::lots::{LotBook, LotMatch};
use crate::types::{FxRateMap, Lot, PriceMap, UnrealizedGainRecord};

/// Realized gain for one lot match: (sell_base_price - lot_cost) * qty_taken.
///
/// `None` on `Decimal` overflow.
pub fn realized_gain(sell_base_price: Decimal, m: &LotMatch) -> Option<Decimal> {
    sell_base_price
        .checked_sub(m.cost_basis_per_share)?
        .checked_mul(m.quantity_taken)
}

/// Unrealized gain for one open lot: (price * fx - lot_cost) * qty_remaining.
///
/// `None` on `Decimal` overflow.
pub fn unrealized_gain(
    lot: &Lot,
    current_price: Decimal,
    current_fx_rate: Decimal,
) -> Option<Decimal> {
    current_price
        .checked_mul(current_fx_rate)?
        .checked_sub(lot.cost_basis_per_share)?
        .checked_mul(lot.quantity_remaining)
}

/// Value every open lot in `book` against current prices and FX rates.
///
/// `currencies` maps ticker -> quote currency. A ticker with no price, no
/// known currency, no FX rate, or a lot whose gain overflows is skipped
/// entirely and a warning pushed; no partial records are emitted for it.
///
/// Output order: ticker ascending, then lot order (oldest first).
pub fn value_open_lots(
    book: &LotBook,
    currencies: &BTreeMap<String, String>,
    latest_prices: &PriceMap,
    current_fx_rates: &FxRateMap,
    warnings: &mut Vec<PnlWarning>,
) -> Vec<UnrealizedGainRecord> {
    let mut out = Vec::new();

    for ticker in book.tickers() {
        let open_quantity = book.quantity_open(ticker);

        let (Some(price), Some(currency)) = (latest_prices.get(ticker), currencies.get(ticker))
        else {
            warnings.push(PnlWarning::MissingMarketData {
                ticker: ticker.to_string(),
                open_quantity,
            });
            continue;
        };

        let Some(fx) = current_fx_rates.get(currency) else {
            warnings.push(PnlWarning::MissingFxRate {
                ticker: ticker.to_string(),
                currency: currency.clone(),
                open_quantity,
            });
            continue;
        };

        let records: Option<Vec<UnrealizedGainRecord>> = book
            .open_lots(ticker)
            .map(|lot| {
                Some(UnrealizedGainRecord {
                    symbol: ticker.to_string(),
                    quantity: lot.quantity_remaining,
                    cost_basis_per_share: lot.cost_basis_per_share,
                    current_market_price: *price,
                    current_fx_rate: *fx,
                    unrealized_gain: unrealized_gain(lot, *price, *fx)?,
                })
            })
            .collect();

        match records {
            Some(records) => out.extend(records),
            None => warnings.push(PnlWarning::ValuationOverflow {
                ticker: ticker.to_string(),
                open_quantity,
            }),
        }
    }

    out
}
