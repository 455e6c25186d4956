use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "pnl")]
#[command(about = "FIFO realized / unrealized P&L batch job", long_about = None)]
struct Cli {
    /// Layered config paths in merge order (base -> env overrides ...)
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    /// Fail (instead of warn) when the config has keys nothing reads.
    #[arg(long, global = true, default_value_t = false)]
    strict_config: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read ledger/prices/FX from Postgres, compute P&L, replace the output tables.
    Run {
        /// Compute and report, but do not write anything.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// Offline pipeline over CSV files.
    Compute {
        /// Ledger CSV: ticker,date,quantity,unit_price,fx_rate,currency
        #[arg(long)]
        transactions: PathBuf,

        /// Latest prices CSV: ticker,price
        #[arg(long)]
        prices: PathBuf,

        /// Current FX CSV: currency,rate
        #[arg(long)]
        fx: PathBuf,

        /// Write realized_pnl.csv / unrealized_pnl.csv here.
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Create the realized/unrealized output tables if missing.
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Run { dry_run } => {
            let (loaded, settings) =
                commands::load_settings(&cli.config_paths, cli.strict_config)?;
            println!("config_hash={}", loaded.config_hash);
            commands::run::run_db(&settings, dry_run).await?;
        }

        Commands::Compute {
            transactions,
            prices,
            fx,
            out_dir,
        } => {
            commands::compute::compute_csv(
                &commands::compute::CsvInputs {
                    transactions,
                    prices,
                    fx,
                },
                out_dir.as_deref(),
            )?;
        }

        Commands::Db { cmd } => {
            let (_, settings) = commands::load_settings(&cli.config_paths, cli.strict_config)?;
            let pool = pnl_db::connect_from_settings(&settings.database).await?;
            match cmd {
                DbCmd::Status => {
                    let s = pnl_db::status(&pool, &settings).await?;
                    println!(
                        "db_ok={} has_transactions_table={} has_prices_table={} has_fx_table={} has_realized_table={} has_unrealized_table={}",
                        s.ok,
                        s.has_transactions_table,
                        s.has_prices_table,
                        s.has_fx_table,
                        s.has_realized_table,
                        s.has_unrealized_table
                    );
                }
                DbCmd::Init => {
                    pnl_db::ensure_output_tables(&pool, &settings.output).await?;
                    println!(
                        "output_tables_ready=true realized_table={} unrealized_table={}",
                        settings.output.realized_table, settings.output.unrealized_table
                    );
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = pnl_config::load_layered_yaml(&refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}

/// Logs go to stderr; stdout carries only key=value results.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
