// =============================================================================
// Recursive Smoother — SMA(X, N, M)
// =============================================================================
//
// The charting-formula SMA is not a simple moving average: it is an additive
// decay recursion
//
//   R_0 = X_0
//   R_t = (M * X_t + (N - M) * R_{t-1}) / N
//
// and it re-seeds from the input whenever the previous output is undefined.
// With `M == N` the decay term vanishes and the output equals the input.
// =============================================================================

use super::Column;

/// Smooth `values` with period `period` (N) and weight `weight` (M).
///
/// The output is aligned with the input.  An undefined input yields an
/// undefined output at that index, and the next defined input re-seeds the
/// recursion.
///
/// # Edge cases
/// - `period == 0`, `weight == 0` or `weight > period` => all undefined
/// - empty input => empty output
pub fn smooth(values: &[Option<f64>], period: usize, weight: usize) -> Column {
    if period == 0 || weight == 0 || weight > period {
        return vec![None; values.len()];
    }

    let n = period as f64;
    let m = weight as f64;

    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;

    for &x in values {
        let current = match prev {
            Some(p) => x.map(|x| (m * x + (n - m) * p) / n),
            None => x,
        };
        out.push(current);
        prev = current;
    }

    out
}
