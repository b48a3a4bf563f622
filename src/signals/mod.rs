// =============================================================================
// Signals Module
// =============================================================================
//
// Boolean conditions evaluated per bar on top of the indicator columns:
// - Candle classification and up/down volume balance
// - Price-pattern, breakout and liquidity conditions
//
// Flags are `Option<bool>`: `None` means an operand was still inside its
// warm-up window.  Consumers resolve `None` to false at the point of use.

pub mod candles;
pub mod patterns;

pub use candles::{CandleLabels, VolumeBalance};
pub use patterns::PatternConditions;

/// A per-bar boolean column aligned with the bar series.
pub type Flags = Vec<Option<bool>>;

/// `a > b`, undefined if either side is.
pub fn gt(a: Option<f64>, b: Option<f64>) -> Option<bool> {
    Some(a? > b?)
}

/// Conjunction that stays undefined while any operand is undefined.
pub fn all_defined(operands: &[Option<bool>]) -> Option<bool> {
    operands
        .iter()
        .try_fold(true, |acc, op| op.map(|v| acc && v))
}

/// Resolve a flag for final use: undefined counts as false.
pub fn holds(flag: Option<bool>) -> bool {
    flag.unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparison_propagates_undefined() {
        assert_eq!(gt(Some(2.0), Some(1.0)), Some(true));
        assert_eq!(gt(Some(1.0), Some(1.0)), Some(false));
        assert_eq!(gt(None, Some(1.0)), None);
    }

    #[test]
    fn conjunction_is_undefined_until_every_operand_is_known() {
        assert_eq!(all_defined(&[Some(true), Some(true)]), Some(true));
        assert_eq!(all_defined(&[Some(true), Some(false)]), Some(false));
        assert_eq!(all_defined(&[Some(false), None]), None);
        assert!(!holds(None));
        assert!(holds(Some(true)));
    }
}
