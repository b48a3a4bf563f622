// =============================================================================
// Pattern & Liquidity Conditions
// =============================================================================
//
// Independent per-bar predicates over rolling extrema, counts and means:
//
//   LQ        = MA(AMOUNT, 28) / 1e8 >= 0.005
//   O85       = LLV(O,28) + 0.925 * (HHV(O,28) - LLV(O,28))
//   FD15      = C < REF(C,1) AND C <= O AND VOL >= 1.15 * REF(VOL,1)
//   GOOD28    = COUNT(O >= O85 AND FD15, 28) = 0
//   MAX28_OK  = COUNT(VOL = HHV(VOL,28) AND REAL_BEARISH, 28) = 0
//   PLRY      = VOL > 1.8 * REF(VOL,1) AND C > O AND VOL > MA(VOL,40)
//   V40P      = MA(REF(VOL,1), 40)
//   R55       = LLV(C,40) + 0.55 * (HHV(C,40) - LLV(C,40))
//   KEY_K     = C > REF(C,1) AND C >= O AND VOL > 1.75 * V40P AND C > R55
//   TRIGGER   = COUNT(PLRY, 28) >= 1 OR KEY_K
// =============================================================================

use crate::indicators::rolling::{
    defined, rolling_count, rolling_max, rolling_mean, rolling_min, shift,
};
use crate::indicators::Column;
use crate::market_data::market_cap::HUNDRED_MILLION;
use crate::market_data::Series;

use super::{all_defined, holds, CandleLabels, Flags};

/// Minimum 28-day average traded value, in hundred-millions.
pub const LIQUIDITY_FLOOR: f64 = 0.005;

const PATTERN_WINDOW: usize = 28;
const BREAKOUT_WINDOW: usize = 40;

/// Position of `fraction` inside the `[min, max]` range.
fn range_level(min: &Column, max: &Column, fraction: f64) -> Column {
    min.iter()
        .zip(max)
        .map(|(&lo, &hi)| Some(lo? + fraction * (hi? - lo?)))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternConditions {
    /// 28-bar mean traded value, in hundred-millions.
    pub amount_avg_28: Column,
    pub liquidity: Flags,

    pub gap_up_level: Column,
    pub gap_up: Flags,
    pub selloff: Flags,
    pub no_gap_selloff: Flags,

    pub peak_volume_ok: Flags,

    pub volume_avg_40: Column,
    pub volume_surge: Flags,
    pub volume_surge_recent: Flags,

    pub volume_avg_40_prev: Column,
    pub close_level_55: Column,
    pub momentum_breakout: Flags,

    pub trigger: Vec<bool>,
}

impl PatternConditions {
    pub fn compute(series: &Series, labels: &CandleLabels) -> Self {
        let opens = series.opens();
        let closes = series.closes();
        let volumes = series.volumes();

        let open_col = defined(&opens);
        let close_col = defined(&closes);
        let volume_col = defined(&volumes);
        let prev_close = shift(&close_col, 1);
        let prev_volume = shift(&volume_col, 1);

        // ── Liquidity ────────────────────────────────────────────────────
        let amount_avg_28: Column = rolling_mean(&defined(&series.amounts()), PATTERN_WINDOW)
            .into_iter()
            .map(|a| a.map(|a| a / HUNDRED_MILLION))
            .collect();
        let liquidity = amount_avg_28
            .iter()
            .map(|a| a.map(|a| a >= LIQUIDITY_FLOOR))
            .collect();

        // ── Gap-up followed by heavy sell-off ────────────────────────────
        let gap_up_level = range_level(
            &rolling_min(&open_col, PATTERN_WINDOW),
            &rolling_max(&open_col, PATTERN_WINDOW),
            0.925,
        );
        let gap_up: Flags = opens
            .iter()
            .zip(&gap_up_level)
            .map(|(&o, &level)| level.map(|l| o >= l))
            .collect();

        let selloff: Flags = (0..closes.len())
            .map(|i| {
                all_defined(&[
                    prev_close[i].map(|p| closes[i] < p),
                    Some(closes[i] <= opens[i]),
                    prev_volume[i].map(|p| volumes[i] >= 1.15 * p),
                ])
            })
            .collect();

        let gap_selloff: Flags = gap_up
            .iter()
            .zip(&selloff)
            .map(|(&g, &s)| all_defined(&[g, s]))
            .collect();
        let no_gap_selloff = rolling_count(&gap_selloff, PATTERN_WINDOW)
            .into_iter()
            .map(|c| c.map(|c| c == 0))
            .collect();

        // ── Peak-volume bearish candle ───────────────────────────────────
        let max_volume_28 = rolling_max(&volume_col, PATTERN_WINDOW);
        let peak_bearish: Flags = (0..volumes.len())
            .map(|i| {
                all_defined(&[
                    max_volume_28[i].map(|m| volumes[i] == m),
                    labels.real_bearish[i],
                ])
            })
            .collect();
        let peak_volume_ok = rolling_count(&peak_bearish, PATTERN_WINDOW)
            .into_iter()
            .map(|c| c.map(|c| c == 0))
            .collect();

        // ── Volume-surge breakout ────────────────────────────────────────
        let volume_avg_40 = rolling_mean(&volume_col, BREAKOUT_WINDOW);
        let volume_surge: Flags = (0..volumes.len())
            .map(|i| {
                all_defined(&[
                    prev_volume[i].map(|p| volumes[i] > 1.8 * p),
                    Some(closes[i] > opens[i]),
                    volume_avg_40[i].map(|a| volumes[i] > a),
                ])
            })
            .collect();
        let volume_surge_recent: Flags = rolling_count(&volume_surge, PATTERN_WINDOW)
            .into_iter()
            .map(|c| c.map(|c| c >= 1))
            .collect();

        // ── Momentum breakout ────────────────────────────────────────────
        let volume_avg_40_prev = rolling_mean(&prev_volume, BREAKOUT_WINDOW);
        let close_level_55 = range_level(
            &rolling_min(&close_col, BREAKOUT_WINDOW),
            &rolling_max(&close_col, BREAKOUT_WINDOW),
            0.55,
        );
        let momentum_breakout: Flags = (0..closes.len())
            .map(|i| {
                let bull_confirm = all_defined(&[
                    prev_close[i].map(|p| closes[i] > p),
                    Some(closes[i] >= opens[i]),
                ]);
                let big_volume = volume_avg_40_prev[i].map(|m| volumes[i] > 1.75 * m);
                let position_high = close_level_55[i].map(|r| closes[i] > r);
                all_defined(&[bull_confirm, big_volume, position_high])
            })
            .collect();

        let trigger = volume_surge_recent
            .iter()
            .zip(&momentum_breakout)
            .map(|(&recent, &breakout)| holds(recent) || holds(breakout))
            .collect();

        Self {
            amount_avg_28,
            liquidity,
            gap_up_level,
            gap_up,
            selloff,
            no_gap_selloff,
            peak_volume_ok,
            volume_avg_40,
            volume_surge,
            volume_surge_recent,
            volume_avg_40_prev,
            close_level_55,
            momentum_breakout,
            trigger,
        }
    }
}
