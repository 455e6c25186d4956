//! Snapshot writer: replaces the realized/unrealized tables with one run's output.
//!
//! Both sides go through a single DB transaction. A side with no rows is not
//! touched at all (its previous snapshot stays in place) and is reported as
//! [`SideWrite::SkippedEmpty`].

use std::fmt;

use anyhow::{Context, Result};
use pnl_config::OutputSettings;
use pnl_portfolio::{RealizedGainRecord, UnrealizedGainRecord};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::info;

/// Rows per multi-row insert. Keeps binds (rows * columns) well under the
/// Postgres limit of 65535 parameters.
pub const INSERT_CHUNK_ROWS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideWrite {
    Written(usize),
    SkippedEmpty,
}

impl SideWrite {
    pub fn rows_written(&self) -> usize {
        match self {
            SideWrite::Written(n) => *n,
            SideWrite::SkippedEmpty => 0,
        }
    }
}

impl fmt::Display for SideWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SideWrite::Written(n) => write!(f, "written:{n}"),
            SideWrite::SkippedEmpty => f.write_str("skipped_empty"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteReport {
    pub realized: SideWrite,
    pub unrealized: SideWrite,
}

async fn truncate(tx: &mut Transaction<'_, Postgres>, table: &str) -> Result<()> {
    sqlx::query(&format!("truncate table {table} restart identity cascade"))
        .execute(&mut **tx)
        .await
        .with_context(|| format!("truncate failed table={table}"))?;
    Ok(())
}

async fn insert_realized(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    rows: &[RealizedGainRecord],
) -> Result<()> {
    for chunk in rows.chunks(INSERT_CHUNK_ROWS) {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "insert into {table} (symbol, realized_gain, buy_date, sell_date, quantity_sold) "
        ));
        qb.push_values(chunk, |mut b, r| {
            b.push_bind(&r.symbol)
                .push_bind(r.realized_gain)
                .push_bind(r.buy_date)
                .push_bind(r.sell_date)
                .push_bind(r.quantity_sold);
        });
        qb.build()
            .execute(&mut **tx)
            .await
            .with_context(|| format!("insert realized rows failed table={table}"))?;
    }
    Ok(())
}

async fn insert_unrealized(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    rows: &[UnrealizedGainRecord],
) -> Result<()> {
    for chunk in rows.chunks(INSERT_CHUNK_ROWS) {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "insert into {table} (symbol, quantity, cost_basis_per_share, \
             current_market_price, current_fx_rate, unrealized_gain) "
        ));
        qb.push_values(chunk, |mut b, r| {
            b.push_bind(&r.symbol)
                .push_bind(r.quantity)
                .push_bind(r.cost_basis_per_share)
                .push_bind(r.current_market_price)
                .push_bind(r.current_fx_rate)
                .push_bind(r.unrealized_gain);
        });
        qb.build()
            .execute(&mut **tx)
            .await
            .with_context(|| format!("insert unrealized rows failed table={table}"))?;
    }
    Ok(())
}

/// Replace each non-empty side's table contents with `realized` / `unrealized`.
///
/// Atomic: either every non-empty side is replaced or nothing changes.
pub async fn write_pnl_snapshot(
    pool: &PgPool,
    output: &OutputSettings,
    realized: &[RealizedGainRecord],
    unrealized: &[UnrealizedGainRecord],
) -> Result<WriteReport> {
    let mut tx = pool.begin().await.context("begin snapshot tx failed")?;

    let realized_write = if realized.is_empty() {
        info!(table = %output.realized_table, "no realized rows; table left untouched");
        SideWrite::SkippedEmpty
    } else {
        truncate(&mut tx, &output.realized_table).await?;
        insert_realized(&mut tx, &output.realized_table, realized).await?;
        SideWrite::Written(realized.len())
    };

    let unrealized_write = if unrealized.is_empty() {
        info!(table = %output.unrealized_table, "no unrealized rows; table left untouched");
        SideWrite::SkippedEmpty
    } else {
        truncate(&mut tx, &output.unrealized_table).await?;
        insert_unrealized(&mut tx, &output.unrealized_table, unrealized).await?;
        SideWrite::Written(unrealized.len())
    };

    tx.commit().await.context("commit snapshot tx failed")?;

    info!(
        realized_table = %output.realized_table,
        realized = %realized_write,
        unrealized_table = %output.unrealized_table,
        unrealized = %unrealized_write,
        "pnl snapshot written"
    );

    Ok(WriteReport {
        realized: realized_write,
        unrealized: unrealized_write,
    })
}
