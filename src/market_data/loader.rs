// =============================================================================
// Bar Sources — where per-instrument histories come from
// =============================================================================
//
// The screener only needs two things from upstream: the list of instruments
// and, per instrument, a validated date-ordered series.  `CsvDirectorySource`
// reads one `<instrument>.csv` per instrument from a directory.
//
// A row that lacks a required field rejects the whole file; there is no
// partial ingestion.
// =============================================================================

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use super::bar::{Bar, Series};
use super::error::IngestError;

/// Columns every bar file must carry.
const REQUIRED_COLUMNS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

/// Upstream collaborator that hands out bar histories.
pub trait BarSource: Send + Sync {
    /// Instrument identifiers available from this source.
    fn instruments(&self) -> Result<Vec<String>>;

    /// Load and validate the history for one instrument.
    fn load(&self, instrument: &str) -> Result<Series, IngestError>;
}

// ---------------------------------------------------------------------------
// CsvDirectorySource
// ---------------------------------------------------------------------------

/// Reads `<dir>/<instrument>.csv` files.
#[derive(Debug, Clone)]
pub struct CsvDirectorySource {
    dir: PathBuf,
}

impl CsvDirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, instrument: &str) -> PathBuf {
        self.dir.join(format!("{instrument}.csv"))
    }
}

impl BarSource for CsvDirectorySource {
    fn instruments(&self) -> Result<Vec<String>> {
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("failed to list bar directory {}", self.dir.display()))?;

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry
                .with_context(|| format!("failed to read entry in {}", self.dir.display()))?
                .path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }

        ids.sort();
        debug!(dir = %self.dir.display(), count = ids.len(), "bar files discovered");
        Ok(ids)
    }

    fn load(&self, instrument: &str) -> Result<Series, IngestError> {
        let file = File::open(self.path_for(instrument))?;
        read_series(BufReader::new(file))
    }
}

// ---------------------------------------------------------------------------
// CSV parsing
// ---------------------------------------------------------------------------

/// Column positions resolved from the header row.
struct ColumnMap {
    required: [usize; 6],
    amount: Option<usize>,
    turnover_rate: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, IngestError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };

        let mut required = [0usize; 6];
        for (slot, name) in required.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = find(name).ok_or(IngestError::MissingColumn(name))?;
        }

        Ok(Self {
            required,
            amount: find("amount"),
            turnover_rate: find("turnover_rate"),
        })
    }
}

/// Parse a bar CSV into a validated series.
pub fn read_series<R: Read>(reader: R) -> Result<Series, IngestError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let columns = ColumnMap::from_headers(reader.headers()?)?;

    let mut bars = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        bars.push(parse_bar(&record, &columns, idx + 1)?);
    }

    Series::from_bars(bars)
}

fn parse_bar(record: &csv::StringRecord, columns: &ColumnMap, row: usize) -> Result<Bar, IngestError> {
    let [date_idx, open_idx, high_idx, low_idx, close_idx, volume_idx] = columns.required;

    let raw_date = required_field(record, date_idx, row, "date")?;
    let date = parse_date(raw_date).ok_or_else(|| IngestError::UnparsableValue {
        row,
        field: "date",
        value: raw_date.to_string(),
    })?;

    let open = required_number(record, open_idx, row, "open")?;
    let high = required_number(record, high_idx, row, "high")?;
    let low = required_number(record, low_idx, row, "low")?;
    let close = required_number(record, close_idx, row, "close")?;
    let volume = required_number(record, volume_idx, row, "volume")?;

    let mut bar = Bar::new(date, open, high, low, close, volume);
    if let Some(amount) = optional_number(record, columns.amount, row, "amount")? {
        bar = bar.with_amount(amount);
    }
    bar.turnover_rate = optional_number(record, columns.turnover_rate, row, "turnover_rate")?;

    Ok(bar)
}

fn required_field<'a>(
    record: &'a csv::StringRecord,
    idx: usize,
    row: usize,
    field: &'static str,
) -> Result<&'a str, IngestError> {
    match record.get(idx) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(IngestError::MissingValue { row, field }),
    }
}

fn parse_number(raw: &str, row: usize, field: &'static str) -> Result<f64, IngestError> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| IngestError::UnparsableValue {
            row,
            field,
            value: raw.to_string(),
        })
}

fn required_number(
    record: &csv::StringRecord,
    idx: usize,
    row: usize,
    field: &'static str,
) -> Result<f64, IngestError> {
    parse_number(required_field(record, idx, row, field)?, row, field)
}

fn optional_number(
    record: &csv::StringRecord,
    idx: Option<usize>,
    row: usize,
    field: &'static str,
) -> Result<Option<f64>, IngestError> {
    match idx.and_then(|i| record.get(i)) {
        Some(raw) if !raw.is_empty() => parse_number(raw, row, field).map(Some),
        _ => Ok(None),
    }
}

/// Accepts `2026-02-06`, `2026-02-06 00:00:00`, `20260206` and `2026/02/06`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y%m%d"))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y/%m/%d"))
        .ok()
}
