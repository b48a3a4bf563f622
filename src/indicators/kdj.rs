// =============================================================================
// KDJ Oscillator
// =============================================================================
//
// Stochastic-style oscillator built on the recursive smoother:
//
//   RSV = (C - LLV(L, 9)) / (HHV(H, 9) - LLV(L, 9)) * 100   (50 when range = 0)
//   K   = SMA(RSV, 3, 1)
//   D   = SMA(K, 3, 1)
//   J   = 3K - 2D
//
// RSV is undefined until the 9-bar window is full.  The flat-range fallback
// of 50 only applies to full windows.
// =============================================================================

use super::rolling::{defined, rolling_max, rolling_min};
use super::sma::smooth;
use super::Column;

/// Look-back of the high/low range.
pub const RSV_WINDOW: usize = 9;

/// Aligned K/D/J columns plus the raw stochastic value they are built on.
#[derive(Debug, Clone, PartialEq)]
pub struct Kdj {
    pub rsv: Column,
    pub k: Column,
    pub d: Column,
    pub j: Column,
}

/// Compute the KDJ triple.  All three input slices must be aligned.
pub fn calculate_kdj(highs: &[f64], lows: &[f64], closes: &[f64]) -> Kdj {
    let hhv = rolling_max(&defined(highs), RSV_WINDOW);
    let llv = rolling_min(&defined(lows), RSV_WINDOW);

    let rsv: Column = closes
        .iter()
        .zip(hhv.iter().zip(llv.iter()))
        .map(|(&close, (&high, &low))| {
            let (high, low) = (high?, low?);
            let range = high - low;
            if range == 0.0 {
                Some(50.0)
            } else {
                Some((close - low) / range * 100.0)
            }
        })
        .collect();

    let k = smooth(&rsv, 3, 1);
    let d = smooth(&k, 3, 1);
    let j = k
        .iter()
        .zip(d.iter())
        .map(|(&k, &d)| Some(3.0 * k? - 2.0 * d?))
        .collect();

    Kdj { rsv, k, d, j }
}

/// `J <= threshold` per bar; undefined where J is undefined.
pub fn j_below(j: &[Option<f64>], threshold: f64) -> Vec<Option<bool>> {
    j.iter().map(|v| v.map(|j| j <= threshold)).collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_prices_pin_everything_at_fifty() {
        let flat = vec![100.0; 70];
        let kdj = calculate_kdj(&flat, &flat, &flat);

        for i in 0..RSV_WINDOW - 1 {
            assert_eq!(kdj.rsv[i], None, "rsv defined too early at {i}");
            assert_eq!(kdj.j[i], None);
        }
        for i in RSV_WINDOW - 1..70 {
            assert_eq!(kdj.rsv[i], Some(50.0));
            assert_eq!(kdj.k[i], Some(50.0));
            assert_eq!(kdj.d[i], Some(50.0));
            assert_eq!(kdj.j[i], Some(50.0));
        }

        let ok = j_below(&kdj.j, 13.0);
        assert_eq!(ok[69], Some(false));
    }

    #[test]
    fn close_at_window_low_gives_zero_rsv() {
        let highs = vec![20.0; 12];
        let lows = vec![10.0; 12];
        let mut closes = vec![15.0; 12];
        closes[11] = 10.0;

        let kdj = calculate_kdj(&highs, &lows, &closes);
        assert_eq!(kdj.rsv[11], Some(0.0));
        assert_eq!(kdj.rsv[10], Some(50.0));
    }

    #[test]
    fn k_reseeds_at_first_full_window() {
        let highs: Vec<f64> = (0..10).map(|i| 10.0 + i as f64).collect();
        let lows: Vec<f64> = (0..10).map(|i| 5.0 + i as f64).collect();
        let closes: Vec<f64> = (0..10).map(|i| 9.0 + i as f64).collect();

        let kdj = calculate_kdj(&highs, &lows, &closes);
        // First full window at index 8: K and D start from RSV itself.
        assert_eq!(kdj.k[8], kdj.rsv[8]);
        assert_eq!(kdj.d[8], kdj.rsv[8]);
        let rsv9 = kdj.rsv[9].unwrap();
        let k9 = (rsv9 + 2.0 * kdj.rsv[8].unwrap()) / 3.0;
        assert!((kdj.k[9].unwrap() - k9).abs() < 1e-9);
    }

    #[test]
    fn j_threshold_is_inclusive() {
        let flags = j_below(&[Some(13.0), Some(13.01), None], 13.0);
        assert_eq!(flags, vec![Some(true), Some(false), None]);
    }
}
