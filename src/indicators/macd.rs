// =============================================================================
// MACD — trend convergence/divergence
// =============================================================================
//
//   DIF       = EMA(C, fast) - EMA(C, slow)
//   DEA       = EMA(DIF, signal)
//   histogram = 2 * (DIF - DEA)
//
// Both averages are first-value seeded, so every column is defined from bar 0.
// =============================================================================

use serde::{Deserialize, Serialize};

use super::ema::calculate_ema;
use super::Column;

fn default_fast() -> usize {
    12
}

fn default_slow() -> usize {
    26
}

fn default_signal() -> usize {
    9
}

/// EMA spans for the MACD triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacdParams {
    #[serde(default = "default_fast")]
    pub fast: usize,
    #[serde(default = "default_slow")]
    pub slow: usize,
    #[serde(default = "default_signal")]
    pub signal: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast: default_fast(),
            slow: default_slow(),
            signal: default_signal(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Macd {
    pub dif: Column,
    pub dea: Column,
    pub histogram: Column,
}

/// Compute DIF/DEA/histogram aligned with `closes`.
///
/// A zero span leaves every column undefined.
pub fn calculate_macd(closes: &[f64], params: &MacdParams) -> Macd {
    let fast = calculate_ema(closes, params.fast);
    let slow = calculate_ema(closes, params.slow);

    if fast.len() != closes.len() || slow.len() != closes.len() {
        let empty = vec![None; closes.len()];
        return Macd {
            dif: empty.clone(),
            dea: empty.clone(),
            histogram: empty,
        };
    }

    let dif: Vec<f64> = fast.iter().zip(slow.iter()).map(|(f, s)| f - s).collect();
    let dea = calculate_ema(&dif, params.signal);

    if dea.len() != dif.len() {
        let empty = vec![None; closes.len()];
        return Macd {
            dif: dif.into_iter().map(Some).collect(),
            dea: empty.clone(),
            histogram: empty,
        };
    }

    let histogram = dif
        .iter()
        .zip(dea.iter())
        .map(|(d, e)| Some(2.0 * (d - e)))
        .collect();

    Macd {
        dif: dif.into_iter().map(Some).collect(),
        dea: dea.into_iter().map(Some).collect(),
        histogram,
    }
}

/// `DIF > 0` per bar.
pub fn dif_positive(dif: &[Option<f64>]) -> Vec<Option<bool>> {
    dif.iter().map(|v| v.map(|d| d > 0.0)).collect()
}
