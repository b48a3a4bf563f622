// =============================================================================
// Candle & Volume Classifier
// =============================================================================
//
// Labels every bar against its own open and the previous close:
//
//   real bullish  = C > O  AND NOT(C < REF(C,1))
//   real bearish  = C < O  AND NOT(C > REF(C,1))
//   loose bullish = NOT(C < REF(C,1))          (flat closes included)
//   loose bearish = NOT(C > REF(C,1))          (flat closes included)
//
// Bar 0 has no previous close, so its labels are undefined.  Volume is then
// summed per label over trailing windows and compared up vs. down.
// =============================================================================

use crate::indicators::rolling::{defined, rolling_sum, shift};
use crate::indicators::Column;

use super::{all_defined, gt, holds, Flags};

#[derive(Debug, Clone, PartialEq)]
pub struct CandleLabels {
    pub real_bullish: Flags,
    pub real_bearish: Flags,
    pub loose_bullish: Flags,
    pub loose_bearish: Flags,
}

impl CandleLabels {
    pub fn classify(opens: &[f64], closes: &[f64]) -> Self {
        let prev_close = shift(&defined(closes), 1);

        let mut labels = Self {
            real_bullish: Vec::with_capacity(closes.len()),
            real_bearish: Vec::with_capacity(closes.len()),
            loose_bullish: Vec::with_capacity(closes.len()),
            loose_bearish: Vec::with_capacity(closes.len()),
        };

        for ((&open, &close), &prev) in opens.iter().zip(closes).zip(&prev_close) {
            let not_lower = prev.map(|p| !(close < p));
            let not_higher = prev.map(|p| !(close > p));

            labels
                .real_bullish
                .push(all_defined(&[Some(close > open), not_lower]));
            labels
                .real_bearish
                .push(all_defined(&[Some(close < open), not_higher]));
            labels.loose_bullish.push(not_lower);
            labels.loose_bearish.push(not_higher);
        }

        labels
    }
}

/// Volume carried by bars where `label` holds, zero elsewhere.
fn labelled_volume(volumes: &[f64], label: &[Option<bool>]) -> Column {
    volumes
        .iter()
        .zip(label)
        .map(|(&v, &l)| Some(if holds(l) { v } else { 0.0 }))
        .collect()
}

/// Rolling up/down volume sums and the resulting balance condition.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeBalance {
    pub real_bullish_21: Column,
    pub real_bearish_21: Column,
    pub real_bullish_14: Column,
    pub real_bearish_14: Column,
    pub loose_bullish_21: Column,
    pub loose_bearish_21: Column,
    pub loose_bullish_14: Column,
    pub loose_bearish_14: Column,
    pub loose_bullish_10: Column,
    pub loose_bearish_10: Column,
    /// Up-volume dominates down-volume on at least one window.
    pub ok: Vec<bool>,
}

impl VolumeBalance {
    pub fn compute(volumes: &[f64], labels: &CandleLabels) -> Self {
        let real_up = labelled_volume(volumes, &labels.real_bullish);
        let real_down = labelled_volume(volumes, &labels.real_bearish);
        let loose_up = labelled_volume(volumes, &labels.loose_bullish);
        let loose_down = labelled_volume(volumes, &labels.loose_bearish);

        let real_bullish_21 = rolling_sum(&real_up, 21);
        let real_bearish_21 = rolling_sum(&real_down, 21);
        let real_bullish_14 = rolling_sum(&real_up, 14);
        let real_bearish_14 = rolling_sum(&real_down, 14);
        let loose_bullish_21 = rolling_sum(&loose_up, 21);
        let loose_bearish_21 = rolling_sum(&loose_down, 21);
        let loose_bullish_14 = rolling_sum(&loose_up, 14);
        let loose_bearish_14 = rolling_sum(&loose_down, 14);
        let loose_bullish_10 = rolling_sum(&loose_up, 10);
        let loose_bearish_10 = rolling_sum(&loose_down, 10);

        let dominates = |up: Option<f64>, down: Option<f64>, factor: f64| {
            holds(gt(up, down.map(|d| factor * d)))
        };

        let ok = (0..volumes.len())
            .map(|i| {
                dominates(real_bullish_21[i], real_bearish_21[i], 1.5)
                    || dominates(real_bullish_14[i], real_bearish_14[i], 1.5)
                    || dominates(loose_bullish_21[i], loose_bearish_21[i], 1.5)
                    || dominates(loose_bullish_14[i], loose_bearish_14[i], 1.5)
                    || dominates(loose_bullish_10[i], loose_bearish_10[i], 1.8)
            })
            .collect();

        Self {
            real_bullish_21,
            real_bearish_21,
            real_bullish_14,
            real_bearish_14,
            loose_bullish_21,
            loose_bearish_21,
            loose_bullish_14,
            loose_bearish_14,
            loose_bullish_10,
            loose_bearish_10,
            ok,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    // ---- classify -----------------------------------------------------------

    #[test]
    fn first_bar_is_undefined() {
        let labels = CandleLabels::classify(&[10.0, 10.0], &[11.0, 11.0]);
        assert_eq!(labels.real_bullish[0], None);
        assert_eq!(labels.loose_bearish[0], None);
    }

    #[test]
    fn real_and_loose_labels() {
        // bar1: up close above open    -> real bullish
        // bar2: down close below open  -> real bearish
        // bar3: flat close, C > O      -> real bullish (not below prev close)
        // bar4: C > O but below prev   -> not real bullish, loose bearish
        let opens = [10.0, 10.0, 11.0, 9.0, 8.0];
        let closes = [10.0, 11.0, 10.0, 10.0, 9.0];
        let l = CandleLabels::classify(&opens, &closes);

        assert_eq!(l.real_bullish[1], Some(true));
        assert_eq!(l.real_bearish[1], Some(false));

        assert_eq!(l.real_bearish[2], Some(true));
        assert_eq!(l.loose_bullish[2], Some(false));

        assert_eq!(l.real_bullish[3], Some(true));
        assert_eq!(l.loose_bullish[3], Some(true));
        assert_eq!(l.loose_bearish[3], Some(true));

        assert_eq!(l.real_bullish[4], Some(false));
        assert_eq!(l.loose_bearish[4], Some(true));
    }

    #[test]
    fn flat_series_has_no_real_candles() {
        let flat = vec![100.0; 30];
        let l = CandleLabels::classify(&flat, &flat);
        for i in 1..30 {
            assert_eq!(l.real_bullish[i], Some(false));
            assert_eq!(l.real_bearish[i], Some(false));
            assert_eq!(l.loose_bullish[i], Some(true));
            assert_eq!(l.loose_bearish[i], Some(true));
        }
    }

    // ---- volume balance -----------------------------------------------------

    #[test]
    fn equal_up_and_down_volume_never_passes() {
        let flat = vec![100.0; 40];
        let volumes = vec![1000.0; 40];
        let labels = CandleLabels::classify(&flat, &flat);
        let balance = VolumeBalance::compute(&volumes, &labels);
        assert!(balance.ok.iter().all(|ok| !ok));
        assert_eq!(balance.loose_bullish_21[39], balance.loose_bearish_21[39]);
    }

    #[test]
    fn sums_are_undefined_until_window_fills() {
        let closes: Vec<f64> = (0..25).map(|i| 10.0 + i as f64).collect();
        let opens: Vec<f64> = closes.iter().map(|c| c - 0.5).collect();
        let labels = CandleLabels::classify(&opens, &closes);
        let balance = VolumeBalance::compute(&vec![100.0; 25], &labels);

        assert_eq!(balance.loose_bullish_10[8], None);
        assert!(balance.loose_bullish_10[9].is_some());
        assert_eq!(balance.real_bullish_21[19], None);
        // Bar 0 is unlabelled and contributes nothing.
        assert_eq!(balance.real_bullish_21[20], Some(2000.0));
        assert_eq!(balance.real_bearish_21[20], Some(0.0));
        assert!(!balance.ok[8]);
        assert!(balance.ok[9]);
    }

    #[test]
    fn ten_bar_window_needs_the_larger_factor() {
        // Alternate up/down closes so that loose up-volume is 1.6x down-volume
        // on the 10-bar window only.
        let mut closes = vec![10.0];
        let mut volumes = vec![0.0];
        for i in 0..10 {
            let last = *closes.last().unwrap();
            if i % 2 == 0 {
                closes.push(last + 1.0);
                volumes.push(160.0);
            } else {
                closes.push(last - 1.0);
                volumes.push(100.0);
            }
        }
        let labels = CandleLabels::classify(&closes, &closes);
        let balance = VolumeBalance::compute(&volumes, &labels);
        let last = closes.len() - 1;
        assert_eq!(balance.loose_bullish_10[last], Some(800.0));
        assert_eq!(balance.loose_bearish_10[last], Some(500.0));
        assert!(!balance.ok[last]);
    }
}
