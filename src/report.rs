// =============================================================================
// Report — CSV export of selected instruments
// =============================================================================

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::analysis_result::AnalysisResult;

/// One exported row.  Field order is the column order.
#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    code: &'a str,
    date: NaiveDate,
    j: Option<f64>,
    macd_dif: Option<f64>,
    market_cap: Option<f64>,
    close: f64,
    volume: f64,
}

impl<'a> From<&'a AnalysisResult> for ReportRow<'a> {
    fn from(r: &'a AnalysisResult) -> Self {
        Self {
            code: &r.instrument,
            date: r.date,
            j: r.j,
            macd_dif: r.dif,
            market_cap: r.market_cap,
            close: r.close,
            volume: r.volume,
        }
    }
}

const HEADER: [&str; 7] = ["code", "date", "j", "macd_dif", "market_cap", "close", "volume"];

/// Write selected results, sorted by instrument, to `writer`.
///
/// The header is always written, so an empty selection still yields a valid
/// file.  Returns the number of data rows.
pub fn write_report<W: Write>(writer: W, results: &[AnalysisResult]) -> Result<usize> {
    let mut selected: Vec<&AnalysisResult> = results.iter().filter(|r| r.selected).collect();
    selected.sort_by(|a, b| a.instrument.cmp(&b.instrument));

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(HEADER).context("failed to write report header")?;
    for r in &selected {
        wtr.serialize(ReportRow::from(*r))
            .with_context(|| format!("failed to write report row for {}", r.instrument))?;
    }
    wtr.flush().context("failed to flush report")?;

    Ok(selected.len())
}

pub fn write_selected(path: impl AsRef<Path>, results: &[AnalysisResult]) -> Result<usize> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("failed to create report {}", path.display()))?;
    let rows = write_report(file, results)?;
    info!(path = %path.display(), rows, "report written");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis_result::ConditionVerdicts;
    use std::collections::BTreeMap;

    fn result(id: &str, selected: bool, market_cap: Option<f64>) -> AnalysisResult {
        let verdicts = ConditionVerdicts {
            j_ok: selected,
            trigger: true,
            liquidity: true,
            market_cap_ok: true,
            peak_volume_ok: true,
            volume_balance_ok: true,
            macd_ok: true,
            no_gap_selloff: true,
        };
        AnalysisResult {
            instrument: id.to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, 13).unwrap(),
            selected,
            close: 12.5,
            volume: 3400.0,
            j: Some(-4.25),
            dif: Some(0.5),
            market_cap,
            verdicts,
            indicators: BTreeMap::new(),
        }
    }

    fn render(results: &[AnalysisResult]) -> (usize, String) {
        let mut buf = Vec::new();
        let rows = write_report(&mut buf, results).unwrap();
        (rows, String::from_utf8(buf).unwrap())
    }

    #[test]
    fn only_selected_rows_sorted_by_code() {
        let results = vec![
            result("sz000002", true, Some(88.0)),
            result("sh600000", false, Some(40.0)),
            result("sh600519", true, None),
        ];
        let (rows, text) = render(&results);
        assert_eq!(rows, 2);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "code,date,j,macd_dif,market_cap,close,volume");
        assert_eq!(lines[1], "sh600519,2026-03-13,-4.25,0.5,,12.5,3400.0");
        assert_eq!(lines[2], "sz000002,2026-03-13,-4.25,0.5,88.0,12.5,3400.0");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn empty_selection_writes_header_only() {
        let (rows, text) = render(&[result("sh600000", false, None)]);
        assert_eq!(rows, 0);
        assert_eq!(text, "code,date,j,macd_dif,market_cap,close,volume\n");
    }

    #[test]
    fn write_selected_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selected.csv");
        let rows = write_selected(&path, &[result("sz300750", true, Some(31.0))]).unwrap();
        assert_eq!(rows, 1);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("code,date"));
        assert!(text.contains("sz300750"));
    }
}
