// =============================================================================
// Breakout Screener — Main Entry Point
// =============================================================================
//
// Screens every bar file in a directory with the fixed selection formula and
// writes the selected instruments to CSV.  Settings come from the JSON config,
// then `SCREENER_*` environment variables, then command-line flags.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod analysis_result;
mod indicators;
mod market_data;
mod report;
mod runtime_config;
mod screener;
mod signals;
mod strategy;
mod types;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::market_data::loader::parse_date;
use crate::market_data::{CsvDirectorySource, MarketCapTable};
use crate::runtime_config::RuntimeConfig;
use crate::screener::Screener;
use crate::strategy::SignalAggregator;
use crate::types::MarketCapPolicy;

#[derive(Debug, Parser)]
#[command(name = "breakout-screener", version, about = "Rule-based daily-bar stock screener")]
struct Cli {
    /// JSON config file.
    #[arg(long, default_value = "screener_config.json")]
    config: PathBuf,

    /// Directory of `<instrument>.csv` bar files.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// `code,market_cap` snapshot file.
    #[arg(long)]
    market_cap: Option<PathBuf>,

    /// Report destination.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// First bar date considered, e.g. 2024-02-06 or 20240206.
    #[arg(long, value_parser = date_arg)]
    start: Option<NaiveDate>,

    /// Last bar date considered.
    #[arg(long, value_parser = date_arg)]
    end: Option<NaiveDate>,

    /// Screen only the first N instruments in identifier order.
    #[arg(long)]
    max_instruments: Option<usize>,

    /// Instruments analysed concurrently.
    #[arg(long)]
    workers: Option<usize>,

    /// Per-instrument time limit in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Fail the market-cap floor for instruments missing from the snapshot.
    #[arg(long)]
    strict_market_cap: bool,

    /// Write the effective configuration back to `--config` and exit.
    #[arg(long)]
    save_config: bool,
}

impl Cli {
    fn apply(&self, config: &mut RuntimeConfig) {
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(file) = &self.market_cap {
            config.market_cap_file = Some(file.clone());
        }
        if let Some(out) = &self.output {
            config.output_file = out.clone();
        }
        if let Some(start) = self.start {
            config.start_date = Some(start);
        }
        if let Some(end) = self.end {
            config.end_date = Some(end);
        }
        if let Some(limit) = self.max_instruments {
            config.max_instruments = Some(limit);
        }
        if let Some(workers) = self.workers {
            config.max_workers = workers;
        }
        if let Some(secs) = self.timeout_secs {
            config.instrument_timeout_secs = secs;
        }
        if self.strict_market_cap {
            config.market_cap_policy = MarketCapPolicy::FailWhenMissing;
        }
    }
}

fn date_arg(raw: &str) -> Result<NaiveDate, String> {
    parse_date(raw).ok_or_else(|| format!("unrecognised date `{raw}`"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = RuntimeConfig::load(&cli.config).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });
    config.apply_env();
    cli.apply(&mut config);

    if cli.save_config {
        config.save(&cli.config)?;
        return Ok(());
    }

    let date_range = config.date_range()?;

    info!(
        data_dir = %config.data_dir.display(),
        output = %config.output_file.display(),
        workers = config.max_workers,
        start = ?date_range.start,
        end = ?date_range.end,
        max_instruments = ?config.max_instruments,
        market_cap_policy = %config.market_cap_policy,
        "Screener configured"
    );

    // ── 2. Inputs ────────────────────────────────────────────────────────
    let source = Arc::new(CsvDirectorySource::new(config.data_dir.clone()));
    let market_caps = Arc::new(MarketCapTable::load_or_empty(
        config.market_cap_file.as_deref(),
        config.market_cap_divisor,
    ));
    info!(
        bars = %source.dir().display(),
        market_caps = market_caps.len(),
        "Inputs ready"
    );

    // ── 3. Screen ────────────────────────────────────────────────────────
    let aggregator = SignalAggregator::new(config.macd, config.market_cap_policy);
    let screener = Screener::new(source, market_caps, aggregator)
        .with_max_workers(config.max_workers)
        .with_instrument_timeout(Duration::from_secs(config.instrument_timeout_secs))
        .with_date_range(date_range)
        .with_max_instruments(config.max_instruments);

    let outcome = screener.run().await?;

    // ── 4. Export ────────────────────────────────────────────────────────
    let rows = report::write_selected(&config.output_file, &outcome.results)?;

    let s = &outcome.summary;
    println!(
        "run {}: {} instruments, {} evaluated, {} selected, {} skipped, {} failed -> {} ({} rows)",
        s.run_id,
        s.total,
        s.evaluated,
        s.selected,
        s.skipped,
        s.failed,
        config.output_file.display(),
        rows
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_flags_override_config() {
        let cli = Cli::parse_from([
            "breakout-screener",
            "--start",
            "20240206",
            "--end",
            "2026-02-06",
            "--max-instruments",
            "50",
        ]);
        let mut config = RuntimeConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.start_date, NaiveDate::from_ymd_opt(2024, 2, 6));
        assert_eq!(config.end_date, NaiveDate::from_ymd_opt(2026, 2, 6));
        assert_eq!(config.max_instruments, Some(50));
    }

    #[test]
    fn bad_date_flag_is_rejected() {
        assert!(Cli::try_parse_from(["breakout-screener", "--start", "06.02.2026"]).is_err());
    }
}
