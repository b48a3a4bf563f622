use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::IngestError;

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// One trading day for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Traded value.  Defaults to `volume * close` when the source has none.
    pub amount: f64,
    #[serde(default)]
    pub turnover_rate: Option<f64>,
}

impl Bar {
    /// Build a bar with `amount` derived from `volume * close`.
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
            amount: volume * close,
            turnover_rate: None,
        }
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = amount;
        self
    }

    /// First field that breaks the price/volume domain, with its value.
    ///
    /// Prices must be positive, volume and amount non-negative, and the
    /// high must not sit below the low.
    fn invalid_field(&self) -> Option<(&'static str, f64)> {
        let prices = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ];
        if let Some(&(field, value)) = prices.iter().find(|(_, v)| v.is_nan() || *v <= 0.0) {
            return Some((field, value));
        }
        if self.volume.is_nan() || self.volume < 0.0 {
            return Some(("volume", self.volume));
        }
        if self.amount.is_nan() || self.amount < 0.0 {
            return Some(("amount", self.amount));
        }
        if self.high < self.low {
            return Some(("high", self.high));
        }
        None
    }
}

// ---------------------------------------------------------------------------
// DateRange -- inclusive calendar window
// ---------------------------------------------------------------------------

/// Inclusive `[start, end]` window.  A missing bound is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

// ---------------------------------------------------------------------------
// Series -- validated, date-ordered bar history
// ---------------------------------------------------------------------------

/// Bar history for one instrument, sorted ascending by date with no repeated
/// dates.  Every indicator column is aligned with `bars()` by index.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    bars: Vec<Bar>,
}

impl Series {
    /// Sort `bars` by date and reject empty, duplicated or out-of-domain
    /// histories.  Rows in errors are 1-based positions in the input order.
    pub fn from_bars(mut bars: Vec<Bar>) -> Result<Self, IngestError> {
        if bars.is_empty() {
            return Err(IngestError::Empty);
        }

        for (idx, bar) in bars.iter().enumerate() {
            if let Some((field, value)) = bar.invalid_field() {
                return Err(IngestError::InvalidValue {
                    row: idx + 1,
                    field,
                    value,
                });
            }
        }

        bars.sort_by_key(|b| b.date);

        if let Some(dup) = bars.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(IngestError::DuplicateDate(dup[1].date));
        }

        Ok(Self { bars })
    }

    #[cfg(test)]
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Keep only the bars inside `range`; `None` when nothing is left.
    pub fn clip(mut self, range: &DateRange) -> Option<Self> {
        self.bars.retain(|b| range.contains(b.date));
        (!self.bars.is_empty()).then_some(self)
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn opens(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.open).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    pub fn amounts(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.amount).collect()
    }
}
