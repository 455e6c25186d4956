//! `pnl run`: Postgres in, Postgres out.

use anyhow::{Context, Result};
use pnl_config::Settings;
use tracing::info;

use super::{log_warnings, print_summary};

pub async fn run_db(settings: &Settings, dry_run: bool) -> Result<()> {
    let pool = pnl_db::connect_from_settings(&settings.database).await?;

    let transactions = pnl_db::read_transactions(&pool, &settings.transactions).await?;
    if transactions.is_empty() {
        info!(table = %settings.transactions.table, "transaction ledger is empty; nothing to compute");
        println!("transactions=0 computed=false written=false");
        return Ok(());
    }

    let prices = pnl_db::read_latest_prices(&pool, &settings.prices).await?;
    let fx = pnl_db::read_current_fx_rates(&pool, &settings.fx_rates).await?;

    let report = pnl_portfolio::compute(&transactions, &prices, &fx)
        .context("PNL_COMPUTE_FAILED: malformed ledger row")?;
    log_warnings(&report);
    println!("transactions={}", transactions.len());
    print_summary(&report.summary());

    if dry_run {
        info!("dry run; output tables not written");
        println!("written=false dry_run=true");
        return Ok(());
    }

    pnl_db::ensure_output_tables(&pool, &settings.output).await?;
    let written =
        pnl_db::write_pnl_snapshot(&pool, &settings.output, &report.realized, &report.unrealized)
            .await?;

    println!(
        "written=true realized_write={} unrealized_write={} rows_written={}",
        written.realized,
        written.unrealized,
        written.realized.rows_written() + written.unrealized.rows_written()
    );
    Ok(())
}
