// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// Standard recursive EMA, seeded with the first observation:
//
//   multiplier = 2 / (span + 1)
//   EMA_0      = X_0
//   EMA_t      = X_t * multiplier + EMA_{t-1} * (1 - multiplier)
//
// The output is aligned 1:1 with the input and is defined from the very first
// bar.
// =============================================================================

/// Compute the EMA series for `values` with the given `span`.
///
/// # Edge cases
/// - `span == 0` => empty vec
/// - empty input => empty vec
/// - a non-finite input propagates to every later value
pub fn calculate_ema(values: &[f64], span: usize) -> Vec<f64> {
    if span == 0 || values.is_empty() {
        return Vec::new();
    }

    let multiplier = 2.0 / (span + 1) as f64;

    let mut result = Vec::with_capacity(values.len());
    let mut prev = values[0];
    result.push(prev);

    for &x in &values[1..] {
        prev = x * multiplier + prev * (1.0 - multiplier);
        result.push(prev);
    }

    result
}
