// =============================================================================
// Rolling Window Kernels
// =============================================================================
//
// Trailing-window aggregations over aligned columns.  A window at index `i`
// covers `[i + 1 - window, i]` and only produces a value once it holds
// `window` bars.  A window that contains an undefined input is itself
// undefined, so "not enough history" travels through every downstream
// computation instead of being coerced to zero.
//
// Count windows are the exception: they consume flags, and an undefined
// flag counts as "not true" once the window itself is full.
// =============================================================================

use super::Column;

/// Lift a fully-defined slice into a column.
pub fn defined(values: &[f64]) -> Column {
    values.iter().copied().map(Some).collect()
}

/// Shift a column forward by `periods` bars (`REF(X, periods)`).
///
/// The first `periods` entries are undefined.
pub fn shift(values: &[Option<f64>], periods: usize) -> Column {
    let len = values.len();
    (0..len)
        .map(|i| if i >= periods { values[i - periods] } else { None })
        .collect()
}

/// Apply `reduce` to every full, fully-defined trailing window.
///
/// # Edge cases
/// - `window == 0` => every entry is undefined
/// - indices `< window - 1` are undefined
/// - any undefined input inside the window makes that window undefined
fn rolling<F>(values: &[Option<f64>], window: usize, reduce: F) -> Column
where
    F: Fn(&[f64]) -> f64,
{
    let mut out = Vec::with_capacity(values.len());
    let mut buf: Vec<f64> = Vec::with_capacity(window);

    for i in 0..values.len() {
        if window == 0 || i + 1 < window {
            out.push(None);
            continue;
        }

        buf.clear();
        let full = values[i + 1 - window..=i].iter().all(|v| match v {
            Some(x) => {
                buf.push(*x);
                true
            }
            None => false,
        });

        out.push(if full { Some(reduce(&buf)) } else { None });
    }

    out
}

/// Highest value over the trailing `window` bars (`HHV`).
pub fn rolling_max(values: &[Option<f64>], window: usize) -> Column {
    rolling(values, window, |w| w.iter().copied().fold(f64::NEG_INFINITY, f64::max))
}

/// Lowest value over the trailing `window` bars (`LLV`).
pub fn rolling_min(values: &[Option<f64>], window: usize) -> Column {
    rolling(values, window, |w| w.iter().copied().fold(f64::INFINITY, f64::min))
}

/// Sum over the trailing `window` bars (`SUM`).
pub fn rolling_sum(values: &[Option<f64>], window: usize) -> Column {
    rolling(values, window, |w| w.iter().sum())
}

/// Arithmetic mean over the trailing `window` bars (`MA`).
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Column {
    rolling(values, window, |w| w.iter().sum::<f64>() / w.len() as f64)
}

/// Number of bars in the trailing `window` whose flag is true (`COUNT`).
///
/// Undefined until the window is full; undefined flags inside a full window
/// are counted as false.
pub fn rolling_count(flags: &[Option<bool>], window: usize) -> Vec<Option<usize>> {
    (0..flags.len())
        .map(|i| {
            if window == 0 || i + 1 < window {
                return None;
            }
            let hits = flags[i + 1 - window..=i]
                .iter()
                .filter(|f| **f == Some(true))
                .count();
            Some(hits)
        })
        .collect()
}
