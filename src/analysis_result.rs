// =============================================================================
// Analysis Result — auditable verdict for one instrument's latest bar
// =============================================================================
//
// Built once by the aggregator after a full pass over a series and never
// mutated afterwards.  Besides the final flag it keeps each condition verdict
// and the indicator values behind them, so a non-selection can be explained.
// =============================================================================

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::strategy::{J_THRESHOLD, MARKET_CAP_FLOOR};

/// A diagnostic value: a numeric reading (possibly still warming up) or a
/// resolved condition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IndicatorValue {
    Flag(bool),
    Number(Option<f64>),
}

/// Per-condition verdicts for the latest bar, undefined operands resolved to
/// false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConditionVerdicts {
    pub j_ok: bool,
    pub trigger: bool,
    pub liquidity: bool,
    pub market_cap_ok: bool,
    pub peak_volume_ok: bool,
    pub volume_balance_ok: bool,
    pub macd_ok: bool,
    /// Reported only; not part of the selection formula.
    pub no_gap_selloff: bool,
}

impl ConditionVerdicts {
    /// The fixed selection formula.
    pub fn selected(&self) -> bool {
        self.j_ok
            && self.trigger
            && self.liquidity
            && self.market_cap_ok
            && self.peak_volume_ok
            && self.volume_balance_ok
            && self.macd_ok
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub instrument: String,
    pub date: NaiveDate,
    pub selected: bool,
    pub close: f64,
    pub volume: f64,
    pub j: Option<f64>,
    pub dif: Option<f64>,
    /// Circulating market cap in hundred-millions, when the snapshot has it.
    pub market_cap: Option<f64>,
    pub verdicts: ConditionVerdicts,
    pub indicators: BTreeMap<String, IndicatorValue>,
}

impl AnalysisResult {
    /// Human-readable list of every condition that failed.
    pub fn rejection_reasons(&self) -> Vec<String> {
        let v = &self.verdicts;
        let mut reasons = Vec::new();

        if !v.j_ok {
            match self.j {
                Some(j) => reasons.push(format!("J {j:.2} > {J_THRESHOLD}")),
                None => reasons.push("J not available".to_string()),
            }
        }
        if !v.trigger {
            reasons.push("no breakout trigger".to_string());
        }
        if !v.liquidity {
            reasons.push("insufficient liquidity".to_string());
        }
        if !v.peak_volume_ok {
            reasons.push("peak-volume bearish candle within 28 bars".to_string());
        }
        if !v.volume_balance_ok {
            reasons.push("up/down volume not balanced".to_string());
        }
        if !v.macd_ok {
            reasons.push("MACD DIF <= 0".to_string());
        }
        if !v.market_cap_ok {
            match self.market_cap {
                Some(cap) => reasons.push(format!("market cap {cap:.0} < {MARKET_CAP_FLOOR}")),
                None => reasons.push("market cap unavailable".to_string()),
            }
        }

        reasons
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passing() -> ConditionVerdicts {
        ConditionVerdicts {
            j_ok: true,
            trigger: true,
            liquidity: true,
            market_cap_ok: true,
            peak_volume_ok: true,
            volume_balance_ok: true,
            macd_ok: true,
            no_gap_selloff: false,
        }
    }

    fn result(verdicts: ConditionVerdicts) -> AnalysisResult {
        AnalysisResult {
            instrument: "sz000001".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 2, 6).unwrap(),
            selected: verdicts.selected(),
            close: 10.0,
            volume: 1000.0,
            j: Some(42.0),
            dif: Some(-0.1),
            market_cap: Some(12.0),
            verdicts,
            indicators: BTreeMap::new(),
        }
    }

    #[test]
    fn gap_selloff_does_not_gate_selection() {
        let r = result(passing());
        assert!(r.selected);
        assert!(r.rejection_reasons().is_empty());
    }

    #[test]
    fn each_failed_condition_is_explained() {
        let verdicts = ConditionVerdicts {
            j_ok: false,
            macd_ok: false,
            market_cap_ok: false,
            ..passing()
        };
        let r = result(verdicts);
        assert!(!r.selected);
        let reasons = r.rejection_reasons();
        assert_eq!(reasons.len(), 3);
        assert_eq!(reasons[0], "J 42.00 > 13");
        assert_eq!(reasons[1], "MACD DIF <= 0");
        assert_eq!(reasons[2], "market cap 12 < 30");
    }

    #[test]
    fn indicator_values_serialise_flat() {
        let mut r = result(passing());
        r.indicators.insert("J".into(), IndicatorValue::Number(Some(1.5)));
        r.indicators.insert("K".into(), IndicatorValue::Number(None));
        r.indicators.insert("J_OK".into(), IndicatorValue::Flag(true));
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["indicators"]["J"], 1.5);
        assert!(json["indicators"]["K"].is_null());
        assert_eq!(json["indicators"]["J_OK"], true);
        assert_eq!(json["date"], "2026-02-06");
    }
}
