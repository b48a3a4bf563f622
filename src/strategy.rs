// =============================================================================
// Signal Aggregator — the selection formula
// =============================================================================
//
// Evaluates one instrument's full bar history and produces an AnalysisResult
// for its most recent bar.
//
// Pipeline:
//   1. Reject histories shorter than MIN_BARS (not evaluable, not an error)
//   2. KDJ oscillator           -> J <= 13
//   3. MACD                     -> DIF > 0
//   4. Candle classification    -> up/down volume balance
//   5. Pattern conditions       -> trigger, liquidity, peak-volume check
//   6. Market-cap floor from the injected snapshot
//   7. XG = J_OK AND TRIGGER AND LQ AND MVOK AND MAX28_OK AND YANGYIN_OK
//           AND DIF > 0
//
// Every stage consumes the whole series and appends aligned columns to the
// IndicatorFrame; only the final bar is surfaced.
// =============================================================================

use std::collections::BTreeMap;

use tracing::debug;

use crate::analysis_result::{AnalysisResult, ConditionVerdicts, IndicatorValue};
use crate::indicators::kdj::{calculate_kdj, j_below, Kdj};
use crate::indicators::macd::{calculate_macd, dif_positive, Macd, MacdParams};
use crate::market_data::{MarketCapTable, Series};
use crate::signals::{holds, CandleLabels, Flags, PatternConditions, VolumeBalance};
use crate::types::MarketCapPolicy;

/// Shortest history that seeds the longest window with real values.
pub const MIN_BARS: usize = 60;

/// J must be at or below this value.
pub const J_THRESHOLD: f64 = 13.0;

/// Minimum circulating market cap, in hundred-millions.
pub const MARKET_CAP_FLOOR: f64 = 30.0;

// =============================================================================
// IndicatorFrame
// =============================================================================

/// Every derived column for one series, aligned with its bars.
#[derive(Debug, Clone)]
pub struct IndicatorFrame {
    pub kdj: Kdj,
    pub j_ok: Flags,
    pub macd: Macd,
    pub macd_ok: Flags,
    pub volume_balance: VolumeBalance,
    pub patterns: PatternConditions,
}

impl IndicatorFrame {
    pub fn compute(series: &Series, macd_params: &MacdParams) -> Self {
        let closes = series.closes();

        let kdj = calculate_kdj(&series.highs(), &series.lows(), &closes);
        let j_ok = j_below(&kdj.j, J_THRESHOLD);

        let macd = calculate_macd(&closes, macd_params);
        let macd_ok = dif_positive(&macd.dif);

        let candles = CandleLabels::classify(&series.opens(), &closes);
        let volume_balance = VolumeBalance::compute(&series.volumes(), &candles);
        let patterns = PatternConditions::compute(series, &candles);

        Self {
            kdj,
            j_ok,
            macd,
            macd_ok,
            volume_balance,
            patterns,
        }
    }

    pub fn len(&self) -> usize {
        self.j_ok.len()
    }

    /// Condition verdicts at bar `i`.
    pub fn verdicts_at(&self, i: usize, market_cap_ok: bool) -> ConditionVerdicts {
        ConditionVerdicts {
            j_ok: holds(self.j_ok[i]),
            trigger: self.patterns.trigger[i],
            liquidity: holds(self.patterns.liquidity[i]),
            market_cap_ok,
            peak_volume_ok: holds(self.patterns.peak_volume_ok[i]),
            volume_balance_ok: self.volume_balance.ok[i],
            macd_ok: holds(self.macd_ok[i]),
            no_gap_selloff: holds(self.patterns.no_gap_selloff[i]),
        }
    }
}

// =============================================================================
// SignalAggregator
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct SignalAggregator {
    macd: MacdParams,
    market_cap_policy: MarketCapPolicy,
}

impl SignalAggregator {
    pub fn new(macd: MacdParams, market_cap_policy: MarketCapPolicy) -> Self {
        Self {
            macd,
            market_cap_policy,
        }
    }

    /// Evaluate `series` for `instrument`.
    ///
    /// Returns `None` when the series has fewer than [`MIN_BARS`] bars.
    pub fn evaluate(
        &self,
        instrument: &str,
        series: &Series,
        market_caps: &MarketCapTable,
    ) -> Option<AnalysisResult> {
        if series.len() < MIN_BARS {
            debug!(instrument, bars = series.len(), "not evaluable: insufficient history");
            return None;
        }

        let frame = IndicatorFrame::compute(series, &self.macd);
        let last = frame.len() - 1;
        let bar = series.last()?;

        let market_cap = market_caps.get(instrument);
        let market_cap_ok = self.market_cap_policy.passes(market_cap, MARKET_CAP_FLOOR);
        let verdicts = frame.verdicts_at(last, market_cap_ok);

        let j = frame.kdj.j[last];
        let dif = frame.macd.dif[last];
        let p = &frame.patterns;

        let mut indicators = BTreeMap::new();
        let mut number = |name: &str, v: Option<f64>| {
            indicators.insert(name.to_string(), IndicatorValue::Number(v));
        };
        number("J", j);
        number("K", frame.kdj.k[last]);
        number("D", frame.kdj.d[last]);
        number("A28", p.amount_avg_28[last]);
        number("MACD_DIF", dif);
        number("MACD_DEA", frame.macd.dea[last]);
        number("MACD_HIST", frame.macd.histogram[last]);
        number("MV", market_cap);

        let mut flag = |name: &str, v: bool| {
            indicators.insert(name.to_string(), IndicatorValue::Flag(v));
        };
        flag("J_OK", verdicts.j_ok);
        flag("TRIGGER", verdicts.trigger);
        flag("VOLUME_SURGE_RECENT", holds(p.volume_surge_recent[last]));
        flag("MOMENTUM_BREAKOUT", holds(p.momentum_breakout[last]));
        flag("LQ", verdicts.liquidity);
        flag("NO_GAP_SELLOFF_OK", verdicts.no_gap_selloff);
        flag("MAX28_OK", verdicts.peak_volume_ok);
        flag("YANGYIN_OK", verdicts.volume_balance_ok);
        flag("DIF>0", verdicts.macd_ok);
        flag("MVOK", verdicts.market_cap_ok);

        let result = AnalysisResult {
            instrument: instrument.to_string(),
            date: bar.date,
            selected: verdicts.selected(),
            close: bar.close,
            volume: bar.volume,
            j,
            dif,
            market_cap,
            verdicts,
            indicators,
        };

        debug!(
            instrument,
            date = %result.date,
            selected = result.selected,
            j = ?result.j,
            dif = ?result.dif,
            "analysis complete"
        );

        Some(result)
    }
}
