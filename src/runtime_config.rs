// =============================================================================
// Runtime Configuration — screener settings with atomic save
// =============================================================================
//
// Every tunable knob of a screening run lives here: where bars come from,
// where the market-cap snapshot lives, where the report goes, which dates and
// how many instruments are screened, how many are analysed at once, and how
// the market-cap floor treats an instrument the snapshot does not know.
//
// All fields carry `#[serde(default)]` so that adding new fields never breaks
// loading an older config file.  Persistence uses an atomic tmp + rename.
// =============================================================================

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::market_data::DateRange;

use crate::indicators::macd::MacdParams;
use crate::types::MarketCapPolicy;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_output_file() -> PathBuf {
    PathBuf::from("selected_stocks.csv")
}

fn default_market_cap_divisor() -> f64 {
    1.0
}

fn default_max_workers() -> usize {
    std::thread::available_parallelism().map_or(4, |n| n.get())
}

fn default_instrument_timeout_secs() -> u64 {
    30
}

// =============================================================================
// RuntimeConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Inputs / outputs ----------------------------------------------------

    /// Directory holding one `<instrument>.csv` bar file per instrument.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// `code,market_cap` snapshot.  `None` means no snapshot is available.
    #[serde(default)]
    pub market_cap_file: Option<PathBuf>,

    /// Divisor applied to snapshot values to express them in
    /// hundred-millions (`1.0` when the file already is, `1e8` for raw units).
    #[serde(default = "default_market_cap_divisor")]
    pub market_cap_divisor: f64,

    /// Where selected instruments are written.
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,

    // --- Universe ------------------------------------------------------------

    /// First bar date considered (inclusive).  `None` means no lower bound.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,

    /// Last bar date considered (inclusive).  `None` means no upper bound.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,

    /// Screen only the first N instruments in identifier order.
    #[serde(default)]
    pub max_instruments: Option<usize>,

    // --- Execution -----------------------------------------------------------

    /// Instruments analysed concurrently.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Wall-clock budget for loading and analysing a single instrument.
    #[serde(default = "default_instrument_timeout_secs")]
    pub instrument_timeout_secs: u64,

    // --- Formula -------------------------------------------------------------

    /// How the market-cap floor treats instruments missing from the snapshot.
    #[serde(default)]
    pub market_cap_policy: MarketCapPolicy,

    #[serde(default)]
    pub macd: MacdParams,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            market_cap_file: None,
            market_cap_divisor: default_market_cap_divisor(),
            output_file: default_output_file(),
            start_date: None,
            end_date: None,
            max_instruments: None,
            max_workers: default_max_workers(),
            instrument_timeout_secs: default_instrument_timeout_secs(),
            market_cap_policy: MarketCapPolicy::default(),
            macd: MacdParams::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// Returns an error if the file cannot be read or parsed.  Callers fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            data_dir = %config.data_dir.display(),
            market_cap_policy = %config.market_cap_policy,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }

    /// The configured bar window.  Fails when the start is after the end.
    pub fn date_range(&self) -> Result<DateRange> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                bail!("start date {start} is after end date {end}");
            }
        }
        Ok(DateRange {
            start: self.start_date,
            end: self.end_date,
        })
    }

    /// Apply `SCREENER_*` environment overrides.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = non_empty("SCREENER_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(file) = non_empty("SCREENER_MARKET_CAP_FILE") {
            self.market_cap_file = Some(PathBuf::from(file));
        }
        if let Some(out) = non_empty("SCREENER_OUTPUT") {
            self.output_file = PathBuf::from(out);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.data_dir, PathBuf::from("data"));
        assert_eq!(cfg.output_file, PathBuf::from("selected_stocks.csv"));
        assert!(cfg.market_cap_file.is_none());
        assert_eq!(cfg.market_cap_policy, MarketCapPolicy::PassWhenMissing);
        assert_eq!(cfg.macd, MacdParams { fast: 12, slow: 26, signal: 9 });
        assert!(cfg.max_workers >= 1);
        assert_eq!(cfg.instrument_timeout_secs, 30);
        assert_eq!(cfg.date_range().unwrap(), DateRange::default());
        assert!(cfg.max_instruments.is_none());
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.market_cap_policy, MarketCapPolicy::PassWhenMissing);
        assert!((cfg.market_cap_divisor - 1.0).abs() < f64::EPSILON);
        assert_eq!(cfg.macd.slow, 26);
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "market_cap_policy": "FailWhenMissing", "macd": { "signal": 5 } }"#;
        let cfg: RuntimeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.market_cap_policy, MarketCapPolicy::FailWhenMissing);
        assert_eq!(cfg.macd, MacdParams { fast: 12, slow: 26, signal: 5 });
        assert_eq!(cfg.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("screener_config.json");

        let mut cfg = RuntimeConfig::default();
        cfg.max_workers = 3;
        cfg.market_cap_file = Some(PathBuf::from("caps.csv"));
        cfg.save(&path).unwrap();

        let loaded = RuntimeConfig::load(&path).unwrap();
        assert_eq!(loaded.max_workers, 3);
        assert_eq!(loaded.market_cap_file, Some(PathBuf::from("caps.csv")));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn load_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(RuntimeConfig::load(dir.path().join("absent.json")).is_err());
    }

    #[test]
    fn env_overrides_replace_paths() {
        let vars: HashMap<&str, &str> = [
            ("SCREENER_DATA_DIR", "/tmp/bars"),
            ("SCREENER_OUTPUT", "out.csv"),
            ("SCREENER_MARKET_CAP_FILE", "  "),
        ]
        .into_iter()
        .collect();

        let mut cfg = RuntimeConfig::default();
        cfg.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/bars"));
        assert_eq!(cfg.output_file, PathBuf::from("out.csv"));
        assert!(cfg.market_cap_file.is_none());
    }

    #[test]
    fn date_window_round_trips_through_json() {
        let json = r#"{ "start_date": "2024-02-06", "end_date": "2026-02-06", "max_instruments": 500 }"#;
        let cfg: RuntimeConfig = serde_json::from_str(json).unwrap();
        let range = cfg.date_range().unwrap();
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2024, 2, 6));
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2026, 2, 6));
        assert_eq!(cfg.max_instruments, Some(500));
    }

    #[test]
    fn inverted_date_window_is_rejected() {
        let cfg = RuntimeConfig {
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 1),
            ..RuntimeConfig::default()
        };
        assert!(cfg.date_range().is_err());
    }
}
