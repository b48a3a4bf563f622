// =============================================================================
// Market-Cap Table — read-only snapshot of circulating market capitalisation
// =============================================================================
//
// Built once before a batch and shared by every worker behind an `Arc`.  It is
// never mutated after construction, so workers read it without locking.
//
// Values are stored in hundred-millions of the quote currency.  Identifiers
// are matched exactly first, then with any leading exchange prefix
// (`sh600000` -> `600000`) stripped, since spot snapshots usually key by the
// bare code while bar files carry the prefix.
// =============================================================================

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

/// One currency unit expressed in hundred-millions.
pub const HUNDRED_MILLION: f64 = 100_000_000.0;

#[derive(Debug, Deserialize)]
struct MarketCapRow {
    code: String,
    market_cap: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct MarketCapTable {
    caps: HashMap<String, f64>,
}

impl MarketCapTable {
    #[cfg(test)]
    pub fn new(caps: HashMap<String, f64>) -> Self {
        Self { caps }
    }

    /// Read a `code,market_cap` CSV.  Each value is divided by `divisor`, so
    /// pass [`HUNDRED_MILLION`] for raw currency units and `1.0` when the file
    /// is already in hundred-millions.  Rows with a blank or non-finite cap
    /// are skipped; a divisor that is not a positive finite number is an error.
    pub fn from_reader<R: Read>(reader: R, divisor: f64) -> Result<Self> {
        if !divisor.is_finite() || divisor <= 0.0 {
            bail!("market-cap divisor must be positive, got {divisor}");
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut caps = HashMap::new();
        for (idx, row) in reader.deserialize::<MarketCapRow>().enumerate() {
            let row = row.with_context(|| format!("bad market-cap row {}", idx + 1))?;
            match row.market_cap.map(|cap| cap / divisor) {
                Some(cap) if cap.is_finite() => {
                    caps.insert(row.code, cap);
                }
                Some(cap) => debug!(code = %row.code, cap, "non-finite market cap skipped"),
                None => {}
            }
        }

        Ok(Self { caps })
    }

    pub fn load(path: impl AsRef<Path>, divisor: f64) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open market-cap file {}", path.display()))?;
        let table = Self::from_reader(BufReader::new(file), divisor)
            .with_context(|| format!("failed to parse market-cap file {}", path.display()))?;

        if table.is_empty() {
            warn!(path = %path.display(), "market-cap snapshot has no usable entries");
        } else {
            info!(path = %path.display(), entries = table.len(), "market-cap snapshot loaded");
        }
        Ok(table)
    }

    /// Load the snapshot, degrading to an empty table when it is unavailable.
    pub fn load_or_empty(path: Option<&Path>, divisor: f64) -> Self {
        let Some(path) = path else {
            warn!("no market-cap snapshot configured; market-cap floor follows the missing-data policy");
            return Self::default();
        };

        Self::load(path, divisor).unwrap_or_else(|e| {
            warn!(error = %e, "market-cap snapshot unavailable; market-cap floor follows the missing-data policy");
            Self::default()
        })
    }

    /// Circulating cap in hundred-millions, if known.
    pub fn get(&self, instrument: &str) -> Option<f64> {
        if let Some(cap) = self.caps.get(instrument) {
            return Some(*cap);
        }
        let bare = instrument.trim_start_matches(|c: char| c.is_ascii_alphabetic());
        if bare.len() != instrument.len() {
            return self.caps.get(bare).copied();
        }
        None
    }

    pub fn len(&self) -> usize {
        self.caps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caps.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_and_scales_values() {
        let csv = "code,market_cap\n600000,4500000000\n000002,\n";
        let table = MarketCapTable::from_reader(csv.as_bytes(), HUNDRED_MILLION).unwrap();
        assert_eq!(table.len(), 1);
        assert!((table.get("600000").unwrap() - 45.0).abs() < 1e-9);
        assert_eq!(table.get("000002"), None);
    }

    #[test]
    fn non_finite_caps_are_skipped() {
        let csv = "code,market_cap\n600000,nan\n600001,inf\n600002,45\n";
        let table = MarketCapTable::from_reader(csv.as_bytes(), 1.0).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("600000"), None);
        assert_eq!(table.get("600001"), None);
        assert_eq!(table.get("600002"), Some(45.0));
    }

    #[test]
    fn non_positive_divisor_is_rejected() {
        let csv = "code,market_cap\n600000,45\n";
        assert!(MarketCapTable::from_reader(csv.as_bytes(), 0.0).is_err());
        assert!(MarketCapTable::from_reader(csv.as_bytes(), -1.0).is_err());
        assert!(MarketCapTable::from_reader(csv.as_bytes(), f64::NAN).is_err());
    }

    #[test]
    fn prefixed_identifier_falls_back_to_bare_code() {
        let mut caps = HashMap::new();
        caps.insert("600000".to_string(), 120.0);
        caps.insert("sz000001".to_string(), 80.0);
        let table = MarketCapTable::new(caps);

        assert_eq!(table.get("sh600000"), Some(120.0));
        assert_eq!(table.get("sz000001"), Some(80.0));
        assert_eq!(table.get("000001"), None);
    }

    #[test]
    fn missing_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let table = MarketCapTable::load_or_empty(Some(&dir.path().join("absent.csv")), 1.0);
        assert!(table.is_empty());
        assert!(MarketCapTable::load_or_empty(None, 1.0).is_empty());
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("caps.csv");
        std::fs::write(&path, "code,market_cap\nsh600519,21000\n").unwrap();
        let table = MarketCapTable::load(&path, 1.0).unwrap();
        assert_eq!(table.get("sh600519"), Some(21000.0));
    }
}
