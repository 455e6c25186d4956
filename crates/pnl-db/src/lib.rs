//! pnl-db
//!
//! Postgres sources and sinks for the P&L batch job, plus the CSV equivalents
//! used for offline runs.
//!
//! - Table/column names come from [`pnl_config::Settings`] and are validated
//!   identifiers before they reach any SQL string here.
//! - Values are always bound, never interpolated.
//! - Read failures are fatal (`anyhow::Error`); the P&L core only ever sees
//!   fully decoded rows.

use anyhow::{Context, Result};
use pnl_config::{DatabaseSettings, OutputSettings, Settings};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use tracing::info;

pub mod csv_io;
pub mod snapshot;
pub mod sources;

pub use csv_io::{
    load_fx_rates_csv, load_prices_csv, load_transactions_csv, write_realized_csv,
    write_unrealized_csv,
};
pub use snapshot::{write_pnl_snapshot, SideWrite, WriteReport};
pub use sources::{
    fx_rates_from_raw, parse_decimal, read_current_fx_rates, read_latest_prices,
    read_transactions, transactions_query,
};

pub const ENV_DB_URL: &str = "PNL_DATABASE_URL";

/// Connect with a full URL.
pub async fn connect(url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(pnl_config::settings::DEFAULT_MAX_CONNECTIONS)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;
    Ok(pool)
}

/// Connect using resolved settings: the URL when one is set, otherwise the
/// discrete host/port/user/password/name parts.
pub async fn connect_from_settings(db: &DatabaseSettings) -> Result<PgPool> {
    let pool_opts = PgPoolOptions::new().max_connections(db.max_connections);

    let pool = match &db.url {
        Some(url) => pool_opts
            .connect(url)
            .await
            .context("failed to connect to Postgres (url)")?,
        None => {
            let opts = PgConnectOptions::new()
                .host(&db.host)
                .port(db.port)
                .username(&db.user)
                .password(&db.password)
                .database(&db.name);
            pool_opts.connect_with(opts).await.with_context(|| {
                format!(
                    "failed to connect to Postgres host={} port={} db={} user={}",
                    db.host, db.port, db.name, db.user
                )
            })?
        }
    };

    info!(max_connections = db.max_connections, "postgres pool ready");
    Ok(pool)
}

// ---------------------------------------------------------------------------
// Status / schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_transactions_table: bool,
    pub has_prices_table: bool,
    pub has_fx_table: bool,
    pub has_realized_table: bool,
    pub has_unrealized_table: bool,
}

impl DbStatus {
    /// All three input tables are present.
    pub fn sources_ready(&self) -> bool {
        self.has_transactions_table && self.has_prices_table && self.has_fx_table
    }
}

/// Connectivity + presence of the configured input and output tables.
pub async fn status(pool: &PgPool, settings: &Settings) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_transactions_table: table_exists(pool, &settings.transactions.table).await?,
        has_prices_table: table_exists(pool, &settings.prices.table).await?,
        has_fx_table: table_exists(pool, &settings.fx_rates.table).await?,
        has_realized_table: table_exists(pool, &settings.output.realized_table).await?,
        has_unrealized_table: table_exists(pool, &settings.output.unrealized_table).await?,
    })
}

/// `to_regclass` resolves `schema.table` and the search_path the same way the
/// queries themselves will.
pub async fn table_exists(pool: &PgPool, table: &str) -> Result<bool> {
    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>("select to_regclass($1) is not null")
        .bind(table)
        .fetch_one(pool)
        .await
        .with_context(|| format!("status table-exists query failed table={table}"))?;
    Ok(exists)
}

pub fn realized_table_ddl(table: &str) -> String {
    format!(
        r#"
        create table if not exists {table} (
          symbol        text      not null,
          realized_gain numeric   not null,
          buy_date      timestamp not null,
          sell_date     timestamp not null,
          quantity_sold numeric   not null
        )
        "#
    )
}

pub fn unrealized_table_ddl(table: &str) -> String {
    format!(
        r#"
        create table if not exists {table} (
          symbol               text    not null,
          quantity             numeric not null,
          cost_basis_per_share numeric not null,
          current_market_price numeric not null,
          current_fx_rate      numeric not null,
          unrealized_gain      numeric not null
        )
        "#
    )
}

/// Create the two output tables if they do not exist. Existing tables are
/// left alone (no column migration).
pub async fn ensure_output_tables(pool: &PgPool, output: &OutputSettings) -> Result<()> {
    sqlx::query(&realized_table_ddl(&output.realized_table))
        .execute(pool)
        .await
        .with_context(|| format!("create table failed table={}", output.realized_table))?;

    sqlx::query(&unrealized_table_ddl(&output.unrealized_table))
        .execute(pool)
        .await
        .with_context(|| format!("create table failed table={}", output.unrealized_table))?;

    info!(
        realized_table = %output.realized_table,
        unrealized_table = %output.unrealized_table,
        "output tables ensured"
    );
    Ok(())
}
