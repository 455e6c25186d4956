//! CSV sources and sinks for offline runs (`pnl compute`).
//!
//! Headers:
//!   transactions: ticker,date,quantity,unit_price,fx_rate,currency
//!   prices:       ticker,price
//!   fx rates:     currency,rate
//!
//! Same rules as the Postgres readers: a ledger row that does not parse is a
//! hard error (with its line number); blank prices are dropped; FX rates go
//! through `fx_rates_from_raw`.

use std::fs::File;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use pnl_portfolio::{
    parse_timestamp, FxRateMap, PriceMap, RealizedGainRecord, Transaction, UnrealizedGainRecord,
};
use serde::Deserialize;
use tracing::info;

use crate::snapshot::SideWrite;
use crate::sources::{fx_rates_from_raw, parse_decimal};

#[derive(Debug, Deserialize)]
struct CsvTransactionRow {
    ticker: String,
    date: String,
    quantity: String,
    unit_price: String,
    fx_rate: String,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct CsvPriceRow {
    ticker: String,
    price: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CsvFxRow {
    currency: Option<String>,
    rate: Option<String>,
}

fn open_reader(path: &Path) -> Result<csv::Reader<File>> {
    let file =
        File::open(path).with_context(|| format!("open csv path failed: {}", path.display()))?;
    Ok(csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file))
}

fn decimal_field(raw: &str, col: &str, line: usize) -> Result<rust_decimal::Decimal> {
    parse_decimal(raw).ok_or_else(|| anyhow!("bad ledger field column={col} line={line} value={raw:?}"))
}

pub fn load_transactions_csv(path: &Path) -> Result<Vec<Transaction>> {
    let mut rdr = open_reader(path)?;
    let mut out = Vec::new();

    for (i, rec) in rdr.deserialize::<CsvTransactionRow>().enumerate() {
        // header is line 1
        let line = i + 2;
        let row = rec.with_context(|| format!("bad ledger row line={line} path={}", path.display()))?;

        let date = parse_timestamp(&row.date).ok_or_else(|| {
            anyhow!("bad ledger field column=date line={line} value={:?}", row.date)
        })?;

        out.push(Transaction {
            ticker: row.ticker,
            date,
            quantity: decimal_field(&row.quantity, "quantity", line)?,
            unit_price: decimal_field(&row.unit_price, "unit_price", line)?,
            fx_rate: decimal_field(&row.fx_rate, "fx_rate", line)?,
            currency: row.currency,
        });
    }

    info!(path = %path.display(), rows = out.len(), "transactions loaded");
    Ok(out)
}

pub fn load_prices_csv(path: &Path) -> Result<PriceMap> {
    let mut rdr = open_reader(path)?;
    let mut prices = PriceMap::new();

    for (i, rec) in rdr.deserialize::<CsvPriceRow>().enumerate() {
        let line = i + 2;
        let row = rec.with_context(|| format!("bad price row line={line} path={}", path.display()))?;

        let raw = match row.price.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => continue,
        };
        if row.ticker.is_empty() {
            continue;
        }
        let price = parse_decimal(&raw)
            .ok_or_else(|| anyhow!("bad price column=price line={line} value={raw:?}"))?;
        prices.insert(row.ticker, price);
    }

    info!(path = %path.display(), rows = prices.len(), "latest prices loaded");
    Ok(prices)
}

pub fn load_fx_rates_csv(path: &Path) -> Result<FxRateMap> {
    let mut rdr = open_reader(path)?;
    let mut raw = Vec::new();

    for (i, rec) in rdr.deserialize::<CsvFxRow>().enumerate() {
        let line = i + 2;
        let row = rec.with_context(|| format!("bad fx row line={line} path={}", path.display()))?;
        raw.push((row.currency, row.rate));
    }

    let (rates, dropped) = fx_rates_from_raw(raw);
    info!(path = %path.display(), rows = rates.len(), dropped, "fx rates loaded");
    Ok(rates)
}

fn write_records<T: serde::Serialize>(path: &Path, records: &[T]) -> Result<SideWrite> {
    if records.is_empty() {
        info!(path = %path.display(), "no rows; file left untouched");
        return Ok(SideWrite::SkippedEmpty);
    }

    let mut w = csv::Writer::from_path(path)
        .with_context(|| format!("create csv failed: {}", path.display()))?;
    for r in records {
        w.serialize(r)
            .with_context(|| format!("write csv row failed: {}", path.display()))?;
    }
    w.flush()
        .with_context(|| format!("flush csv failed: {}", path.display()))?;

    info!(path = %path.display(), rows = records.len(), "csv written");
    Ok(SideWrite::Written(records.len()))
}

pub fn write_realized_csv(path: &Path, records: &[RealizedGainRecord]) -> Result<SideWrite> {
    write_records(path, records)
}

pub fn write_unrealized_csv(path: &Path, records: &[UnrealizedGainRecord]) -> Result<SideWrite> {
    write_records(path, records)
}
