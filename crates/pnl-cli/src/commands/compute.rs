//! `pnl compute`: the same pipeline over CSV files, no database.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use super::{log_warnings, print_summary};

pub const REALIZED_FILE: &str = "realized_pnl.csv";
pub const UNREALIZED_FILE: &str = "unrealized_pnl.csv";

#[derive(Debug, Clone)]
pub struct CsvInputs {
    pub transactions: PathBuf,
    pub prices: PathBuf,
    pub fx: PathBuf,
}

pub fn compute_csv(inputs: &CsvInputs, out_dir: Option<&Path>) -> Result<()> {
    let transactions = pnl_db::load_transactions_csv(&inputs.transactions)?;
    if transactions.is_empty() {
        info!(path = %inputs.transactions.display(), "transaction ledger is empty; nothing to compute");
        println!("transactions=0 computed=false written=false");
        return Ok(());
    }

    let prices = pnl_db::load_prices_csv(&inputs.prices)?;
    let fx = pnl_db::load_fx_rates_csv(&inputs.fx)?;

    let report = pnl_portfolio::compute(&transactions, &prices, &fx)
        .context("PNL_COMPUTE_FAILED: malformed ledger row")?;
    log_warnings(&report);
    println!("transactions={}", transactions.len());
    print_summary(&report.summary());

    let Some(dir) = out_dir else {
        println!("written=false");
        return Ok(());
    };

    fs::create_dir_all(dir).with_context(|| format!("create out dir failed: {}", dir.display()))?;
    let realized = pnl_db::write_realized_csv(&dir.join(REALIZED_FILE), &report.realized)?;
    let unrealized = pnl_db::write_unrealized_csv(&dir.join(UNREALIZED_FILE), &report.unrealized)?;

    println!(
        "written=true realized_write={} unrealized_write={} rows_written={}",
        realized,
        unrealized,
        realized.rows_written() + unrealized.rows_written()
    );
    Ok(())
}
