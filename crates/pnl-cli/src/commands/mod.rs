//! Command handler modules for the `pnl` binary.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod compute;
pub mod run;

use anyhow::{Context, Result};
use pnl_config::{LoadedConfig, Settings, UnusedKeyPolicy};
use pnl_portfolio::{PnlReport, PnlSummary};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Load YAML layers (if any), report unused keys, resolve [`Settings`].
pub fn load_settings(config_paths: &[String], strict: bool) -> Result<(LoadedConfig, Settings)> {
    let loaded = if config_paths.is_empty() {
        LoadedConfig::empty()?
    } else {
        let refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
        pnl_config::load_layered_yaml(&refs)?
    };

    let policy = if strict {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    let report = pnl_config::report_unused_keys(&loaded.config_json, policy)?;
    for p in &report.unused_leaf_pointers {
        warn!(pointer = %p, "unused config key");
    }

    let settings = Settings::load(&loaded.config_json).context("resolve settings failed")?;
    debug!(config_hash = %loaded.config_hash, ?settings, "settings resolved");
    Ok((loaded, settings))
}

/// One `warn!` per data-quality warning, with the kind and ticker as fields.
pub fn log_warnings(report: &PnlReport) {
    for w in &report.warnings {
        warn!(kind = %w.kind(), ticker = %w.ticker(), "{w}");
    }
}

/// Print the run summary as key=value lines.
pub fn print_summary(summary: &PnlSummary) {
    println!("realized_records={}", summary.realized_records);
    println!("unrealized_records={}", summary.unrealized_records);
    println!("open_lots={}", summary.open_lots);
    println!("warnings={}", summary.warnings);
    println!("total_realized_gain={}", summary.total_realized_gain);
    println!("total_unrealized_gain={}", summary.total_unrealized_gain);
    for (ticker, t) in &summary.per_ticker {
        let unrealized = t
            .unrealized_gain
            .map(|g| g.to_string())
            .unwrap_or_else(|| "none".to_string());
        println!(
            "ticker={} realized_gain={} quantity_sold={} open_quantity={} unrealized_gain={}",
            ticker, t.realized_gain, t.quantity_sold, t.open_quantity, unrealized
        );
    }
}
