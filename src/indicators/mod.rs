// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free time-series operators.  Every column is aligned 1:1
// with the bar series and carries `Option<f64>` so that "not enough history"
// is an explicit state rather than a NaN sentinel.

pub mod ema;
pub mod kdj;
pub mod macd;
pub mod rolling;
pub mod sma;

/// A per-bar numeric column aligned with the bar series.
pub type Column = Vec<Option<f64>>;
