//! Runtime settings: where to read transactions, prices and FX rates, and
//! where to write the P&L snapshot.
//!
//! # Resolution order
//! built-in defaults < YAML layers (see [`crate::load_layered_yaml`]) <
//! environment variables. The env var names are the ones the batch job has
//! always used (`DB_HOST`, `TICKER_COL`, `FX_DATA_TABLE`, ...).
//!
//! # Contract
//! - Resolve once at startup and pass `Settings` down; do not scatter
//!   `std::env::var` calls elsewhere.
//! - The database password is only ever read from an env var whose NAME is
//!   configured (`database.password_env`). `Debug` redacts it.
//! - Table and column names are interpolated into SQL, so [`Settings::validate`]
//!   rejects anything that is not a plain (optionally schema-qualified)
//!   identifier.

use anyhow::{bail, Context, Result};
use serde_json::Value;

pub const DEFAULT_URL_ENV: &str = "PNL_DATABASE_URL";
pub const DEFAULT_PASSWORD_ENV: &str = "DB_PASSWORD";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    /// Full connection URL; overrides the discrete parts when set.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub max_connections: u32,
}

impl std::fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("url", &self.url.as_ref().map(|_| "<REDACTED>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<REDACTED>")
            .field("name", &self.name)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSourceSettings {
    pub table: String,
    pub ticker_col: String,
    pub date_col: String,
    pub quantity_col: String,
    pub price_col: String,
    pub fx_col: String,
    pub currency_col: String,
    /// Insertion-order column (serial id, created_at, ...). Rows with equal
    /// (ticker, date) replay in this order when set.
    pub id_col: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceSourceSettings {
    pub table: String,
    pub ticker_col: String,
    pub price_col: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FxSourceSettings {
    pub table: String,
    pub currency_col: String,
    pub rate_col: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSettings {
    pub realized_table: String,
    pub unrealized_table: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub transactions: TransactionSourceSettings,
    pub prices: PriceSourceSettings,
    pub fx_rates: FxSourceSettings,
    pub output: OutputSettings,
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// One string setting: YAML pointer, env var, default.
struct Key {
    pointer: &'static str,
    env: &'static str,
    default: &'static str,
}

const fn key(pointer: &'static str, env: &'static str, default: &'static str) -> Key {
    Key {
        pointer,
        env,
        default,
    }
}

const DB_HOST: Key = key("/database/host", "DB_HOST", "postgres");
const DB_PORT: Key = key("/database/port", "DB_PORT", "5432");
const DB_USER: Key = key("/database/user", "DB_USER", "dwoadmin");
const DB_NAME: Key = key("/database/name", "DB_NAME", "dwo");

const TX_TABLE: Key = key("/transactions/table", "EQUITY_TRANSACTIONS_TABLE", "equity_transactions");
const TX_TICKER: Key = key("/transactions/ticker_col", "TICKER_COL", "ticker");
const TX_DATE: Key = key("/transactions/date_col", "DATE_COL", "transaction_date");
const TX_QTY: Key = key("/transactions/quantity_col", "QUANTITY_COL", "quantity");
const TX_PRICE: Key = key("/transactions/price_col", "PRICE_COL", "transacted_price");
const TX_FX: Key = key("/transactions/fx_col", "FX_COL", "fx");
const TX_CCY: Key = key("/transactions/currency_col", "CCY_COL_TRANS", "ccy");
const TX_ID_POINTER: &str = "/transactions/id_col";
const TX_ID_ENV: &str = "ID_COL_TRANS";

const PX_TABLE: Key = key("/prices/table", "STOCK_DATA_TABLE", "stock_data");
const PX_TICKER: Key = key("/prices/ticker_col", "TICKER_COL_STOCK_DATA", "ticker_base");
const PX_PRICE: Key = key("/prices/price_col", "PRICE_COL_STOCK_DATA", "last_price");

const FX_TABLE: Key = key("/fx_rates/table", "FX_DATA_TABLE", "fx_data");
const FX_CCY: Key = key("/fx_rates/currency_col", "CCY_COL_FX", "ccy1");
const FX_RATE: Key = key("/fx_rates/rate_col", "RATE_COL_FX", "rate");

const OUT_REALIZED: Key = key("/output/realized_table", "REALIZED_PNL_TABLE", "realized_pnl");
const OUT_UNREALIZED: Key = key("/output/unrealized_table", "UNREALIZED_PNL_TABLE", "unrealized_pnl");

fn read_str_at(config: &Value, pointer: &str) -> Option<String> {
    match config.pointer(pointer)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl Settings {
    /// Resolve using the process environment.
    pub fn load(config_json: &Value) -> Result<Self> {
        Self::resolve(config_json, &|name| std::env::var(name).ok())
    }

    /// Resolve with an explicit env lookup (tests pass a map here).
    pub fn resolve(config_json: &Value, env: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |k: &Key| -> String {
            non_empty(env(k.env))
                .or_else(|| read_str_at(config_json, k.pointer))
                .unwrap_or_else(|| k.default.to_string())
        };

        let url_env = read_str_at(config_json, "/database/url_env")
            .unwrap_or_else(|| DEFAULT_URL_ENV.to_string());
        let password_env = read_str_at(config_json, "/database/password_env")
            .unwrap_or_else(|| DEFAULT_PASSWORD_ENV.to_string());

        let port_raw = get(&DB_PORT);
        let port: u16 = port_raw
            .parse()
            .with_context(|| format!("CONFIG_BAD_VALUE field=database.port value={port_raw}"))?;

        let max_connections = match read_str_at(config_json, "/database/max_connections") {
            Some(raw) => raw.parse::<u32>().with_context(|| {
                format!("CONFIG_BAD_VALUE field=database.max_connections value={raw}")
            })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let settings = Settings {
            database: DatabaseSettings {
                url: non_empty(env(&url_env)),
                host: get(&DB_HOST),
                port,
                user: get(&DB_USER),
                password: env(&password_env).unwrap_or_default(),
                name: get(&DB_NAME),
                max_connections,
            },
            transactions: TransactionSourceSettings {
                table: get(&TX_TABLE),
                ticker_col: get(&TX_TICKER),
                date_col: get(&TX_DATE),
                quantity_col: get(&TX_QTY),
                price_col: get(&TX_PRICE),
                fx_col: get(&TX_FX),
                currency_col: get(&TX_CCY),
                id_col: non_empty(env(TX_ID_ENV))
                    .or_else(|| read_str_at(config_json, TX_ID_POINTER)),
            },
            prices: PriceSourceSettings {
                table: get(&PX_TABLE),
                ticker_col: get(&PX_TICKER),
                price_col: get(&PX_PRICE),
            },
            fx_rates: FxSourceSettings {
                table: get(&FX_TABLE),
                currency_col: get(&FX_CCY),
                rate_col: get(&FX_RATE),
            },
            output: OutputSettings {
                realized_table: get(&OUT_REALIZED),
                unrealized_table: get(&OUT_UNREALIZED),
            },
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Reject any table/column name that is not a safe SQL identifier.
    pub fn validate(&self) -> Result<()> {
        if self.database.max_connections == 0 {
            bail!("CONFIG_BAD_VALUE field=database.max_connections value=0");
        }

        let tables = [
            ("transactions.table", &self.transactions.table),
            ("prices.table", &self.prices.table),
            ("fx_rates.table", &self.fx_rates.table),
            ("output.realized_table", &self.output.realized_table),
            ("output.unrealized_table", &self.output.unrealized_table),
        ];
        for (field, v) in tables {
            if !is_sql_table_name(v) {
                bail!("CONFIG_BAD_IDENTIFIER field={field} value={v:?}");
            }
        }

        let columns = [
            ("transactions.ticker_col", &self.transactions.ticker_col),
            ("transactions.date_col", &self.transactions.date_col),
            ("transactions.quantity_col", &self.transactions.quantity_col),
            ("transactions.price_col", &self.transactions.price_col),
            ("transactions.fx_col", &self.transactions.fx_col),
            ("transactions.currency_col", &self.transactions.currency_col),
            ("prices.ticker_col", &self.prices.ticker_col),
            ("prices.price_col", &self.prices.price_col),
            ("fx_rates.currency_col", &self.fx_rates.currency_col),
            ("fx_rates.rate_col", &self.fx_rates.rate_col),
        ];
        for (field, v) in columns {
            if !is_sql_identifier(v) {
                bail!("CONFIG_BAD_IDENTIFIER field={field} value={v:?}");
            }
        }
        if let Some(v) = &self.transactions.id_col {
            if !is_sql_identifier(v) {
                bail!("CONFIG_BAD_IDENTIFIER field=transactions.id_col value={v:?}");
            }
        }
        Ok(())
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`, at most 63 bytes (Postgres NAMEDATALEN - 1).
pub fn is_sql_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    s.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// An identifier, or `schema.table`.
fn is_sql_table_name(s: &str) -> bool {
    match s.split_once('.') {
        Some((schema, table)) => is_sql_identifier(schema) && is_sql_identifier(table),
        None => is_sql_identifier(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_match_legacy_job() {
        let s = Settings::resolve(&serde_json::json!({}), &no_env).unwrap();
        assert_eq!(s.database.host, "postgres");
        assert_eq!(s.database.port, 5432);
        assert_eq!(s.database.user, "dwoadmin");
        assert_eq!(s.database.name, "dwo");
        assert_eq!(s.database.password, "");
        assert_eq!(s.database.url, None);
        assert_eq!(s.transactions.table, "equity_transactions");
        assert_eq!(s.transactions.price_col, "transacted_price");
        assert_eq!(s.transactions.currency_col, "ccy");
        assert_eq!(s.transactions.id_col, None);
        assert_eq!(s.prices.ticker_col, "ticker_base");
        assert_eq!(s.fx_rates.currency_col, "ccy1");
        assert_eq!(s.output.realized_table, "realized_pnl");
        assert_eq!(s.output.unrealized_table, "unrealized_pnl");
    }

    #[test]
    fn env_overrides_yaml_overrides_default() {
        let cfg = serde_json::json!({
            "database": { "host": "yaml-host", "port": 6543 },
            "prices": { "table": "yaml_prices" }
        });
        let env: HashMap<&str, &str> = [("DB_HOST", "env-host"), ("DB_PASSWORD", "pw")].into();
        let s = Settings::resolve(&cfg, &|k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(s.database.host, "env-host");
        assert_eq!(s.database.port, 6543);
        assert_eq!(s.database.password, "pw");
        assert_eq!(s.prices.table, "yaml_prices");
    }

    #[test]
    fn id_col_from_yaml_or_env_and_validated() {
        let cfg = serde_json::json!({ "transactions": { "id_col": "txn_id" } });
        let s = Settings::resolve(&cfg, &no_env).unwrap();
        assert_eq!(s.transactions.id_col.as_deref(), Some("txn_id"));

        let env: HashMap<&str, &str> = [("ID_COL_TRANS", "seq")].into();
        let s = Settings::resolve(&cfg, &|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(s.transactions.id_col.as_deref(), Some("seq"));

        let bad = serde_json::json!({ "transactions": { "id_col": "id; drop table x" } });
        let err = Settings::resolve(&bad, &no_env).unwrap_err();
        assert!(err.to_string().contains("field=transactions.id_col"));
    }

    #[test]
    fn password_env_name_is_configurable() {
        let cfg = serde_json::json!({ "database": { "password_env": "PNL_TEST_PW" } });
        let env: HashMap<&str, &str> = [("PNL_TEST_PW", "s3cret"), ("DB_PASSWORD", "other")].into();
        let s = Settings::resolve(&cfg, &|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(s.database.password, "s3cret");
    }

    #[test]
    fn debug_redacts_password() {
        let env: HashMap<&str, &str> = [("DB_PASSWORD", "hunter2hunter2")].into();
        let s = Settings::resolve(&serde_json::json!({}), &|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        let dbg = format!("{:?}", s);
        assert!(!dbg.contains("hunter2hunter2"));
        assert!(dbg.contains("<REDACTED>"));
    }

    #[test]
    fn rejects_injection_in_column_name() {
        let env: HashMap<&str, &str> = [("TICKER_COL", "ticker; drop table x")].into();
        let err = Settings::resolve(&serde_json::json!({}), &|k| env.get(k).map(|v| v.to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("CONFIG_BAD_IDENTIFIER"));
        assert!(err.to_string().contains("transactions.ticker_col"));
    }

    #[test]
    fn schema_qualified_tables_allowed() {
        let env: HashMap<&str, &str> = [("REALIZED_PNL_TABLE", "reporting.realized_pnl")].into();
        let s = Settings::resolve(&serde_json::json!({}), &|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(s.output.realized_table, "reporting.realized_pnl");
    }

    #[test]
    fn bad_port_is_an_error() {
        let env: HashMap<&str, &str> = [("DB_PORT", "not-a-port")].into();
        let err = Settings::resolve(&serde_json::json!({}), &|k| env.get(k).map(|v| v.to_string()))
            .unwrap_err();
        assert!(format!("{err:#}").contains("CONFIG_BAD_VALUE field=database.port"));
    }

    #[test]
    fn identifier_rules() {
        assert!(is_sql_identifier("ticker_base"));
        assert!(is_sql_identifier("_x1"));
        assert!(!is_sql_identifier("1abc"));
        assert!(!is_sql_identifier(""));
        assert!(!is_sql_identifier("a-b"));
        assert!(!is_sql_identifier("a.b"));
        assert!(is_sql_table_name("a.b"));
        assert!(!is_sql_table_name("a.b.c"));
    }
}
