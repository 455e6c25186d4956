//! Input readers: transaction ledger, latest prices, current FX rates.
//!
//! Policy:
//! - Ledger rows must decode completely; a null or undecodable field aborts the
//!   read with the table, column and row index in the error.
//! - Prices with a null ticker or price are dropped (no price = unknown).
//! - FX rates are read as text and parsed here. Unparsable or non-positive
//!   rates are dropped with a warning, never coerced to zero.

use std::str::FromStr;

use anyhow::{Context, Result};
use pnl_config::{FxSourceSettings, PriceSourceSettings, TransactionSourceSettings};
use pnl_portfolio::{FxRateMap, PriceMap, Transaction};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use tracing::{debug, info, warn};

/// Parse a decimal string, accepting plain (`1.0875`) and scientific
/// (`1.0875e0`) notation.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    Decimal::from_str(s)
        .ok()
        .or_else(|| Decimal::from_scientific(s).ok())
}

/// Build an [`FxRateMap`] from raw `(currency, rate)` pairs.
///
/// Returns the map and the number of dropped entries.
pub fn fx_rates_from_raw<I>(rows: I) -> (FxRateMap, usize)
where
    I: IntoIterator<Item = (Option<String>, Option<String>)>,
{
    let mut rates = FxRateMap::new();
    let mut dropped = 0usize;

    for (currency, raw_rate) in rows {
        let currency = match currency.map(|c| c.trim().to_string()) {
            Some(c) if !c.is_empty() => c,
            _ => {
                warn!(raw_rate = ?raw_rate, "fx rate dropped: missing currency");
                dropped += 1;
                continue;
            }
        };

        match raw_rate.as_deref().and_then(parse_decimal) {
            Some(rate) if rate > Decimal::ZERO => {
                if let Some(prev) = rates.insert(currency.clone(), rate) {
                    if prev != rate {
                        warn!(%currency, %prev, %rate, "duplicate fx rate; last row wins");
                    }
                }
            }
            _ => {
                warn!(%currency, raw_rate = ?raw_rate, "fx rate dropped: not a positive number");
                dropped += 1;
            }
        }
    }

    (rates, dropped)
}

fn field_ctx(table: &str, col: &str, row: usize) -> String {
    format!("bad ledger field table={table} column={col} row={row}")
}

/// Ledger select, ordered by (ticker, date) and then by `id_col` when
/// configured. Without one, the remaining columns break ties so equal-key
/// rows come back in the same order on every run.
pub fn transactions_query(src: &TransactionSourceSettings) -> String {
    let tie_break = match &src.id_col {
        Some(id) => format!("{id} asc"),
        None => "3 asc, 4 asc, 5 asc, 6 asc".to_string(),
    };
    format!(
        r#"
        select
          {ticker}::text       as ticker,
          {date}::timestamp    as date,
          {quantity}::numeric  as quantity,
          {price}::numeric     as unit_price,
          {fx}::numeric        as fx_rate,
          {currency}::text     as currency
        from {table}
        order by 1 asc, 2 asc, {tie_break}
        "#,
        ticker = src.ticker_col,
        date = src.date_col,
        quantity = src.quantity_col,
        price = src.price_col,
        fx = src.fx_col,
        currency = src.currency_col,
        table = src.table,
    )
}

/// Read the full transaction ledger in [`transactions_query`] order.
pub async fn read_transactions(
    pool: &PgPool,
    src: &TransactionSourceSettings,
) -> Result<Vec<Transaction>> {
    let sql = transactions_query(src);

    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .with_context(|| format!("read_transactions failed table={}", src.table))?;

    let mut out = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let t = &src.table;
        out.push(Transaction {
            ticker: row
                .try_get("ticker")
                .with_context(|| field_ctx(t, &src.ticker_col, i))?,
            date: row
                .try_get("date")
                .with_context(|| field_ctx(t, &src.date_col, i))?,
            quantity: row
                .try_get("quantity")
                .with_context(|| field_ctx(t, &src.quantity_col, i))?,
            unit_price: row
                .try_get("unit_price")
                .with_context(|| field_ctx(t, &src.price_col, i))?,
            fx_rate: row
                .try_get("fx_rate")
                .with_context(|| field_ctx(t, &src.fx_col, i))?,
            currency: row
                .try_get("currency")
                .with_context(|| field_ctx(t, &src.currency_col, i))?,
        });
    }

    info!(table = %src.table, rows = out.len(), "transactions loaded");
    Ok(out)
}

/// Read `ticker -> latest price` (quote currency).
pub async fn read_latest_prices(pool: &PgPool, src: &PriceSourceSettings) -> Result<PriceMap> {
    let sql = format!(
        r#"
        select
          {ticker}::text  as ticker,
          {price}::numeric as price
        from {table}
        order by 1 asc
        "#,
        ticker = src.ticker_col,
        price = src.price_col,
        table = src.table,
    );

    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .with_context(|| format!("read_latest_prices failed table={}", src.table))?;

    let mut prices = PriceMap::new();
    let mut dropped = 0usize;
    for row in &rows {
        let ticker: Option<String> = row.try_get("ticker").context("stock_data.ticker decode")?;
        let price: Option<Decimal> = row.try_get("price").context("stock_data.price decode")?;
        match (ticker, price) {
            (Some(t), Some(p)) if !t.trim().is_empty() => {
                prices.insert(t, p);
            }
            _ => dropped += 1,
        }
    }

    if dropped > 0 {
        debug!(table = %src.table, dropped, "price rows with null ticker/price dropped");
    }
    info!(table = %src.table, rows = prices.len(), "latest prices loaded");
    Ok(prices)
}

/// Read `currency -> base units per one unit of currency`.
pub async fn read_current_fx_rates(pool: &PgPool, src: &FxSourceSettings) -> Result<FxRateMap> {
    let sql = format!(
        r#"
        select
          {currency}::text as currency,
          {rate}::text     as rate
        from {table}
        order by 1 asc
        "#,
        currency = src.currency_col,
        rate = src.rate_col,
        table = src.table,
    );

    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .with_context(|| format!("read_current_fx_rates failed table={}", src.table))?;

    let mut raw = Vec::with_capacity(rows.len());
    for row in &rows {
        let currency: Option<String> = row.try_get("currency").context("fx_data.currency decode")?;
        let rate: Option<String> = row.try_get("rate").context("fx_data.rate decode")?;
        raw.push((currency, rate));
    }

    let (rates, dropped) = fx_rates_from_raw(raw);
    info!(table = %src.table, rows = rates.len(), dropped, "fx rates loaded");
    Ok(rates)
}
