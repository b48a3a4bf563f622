// =============================================================================
// Shared types used across the screener
// =============================================================================

use serde::{Deserialize, Serialize};

/// How the market-cap floor treats an instrument missing from the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketCapPolicy {
    /// Unknown market cap passes the floor.
    PassWhenMissing,
    /// Unknown market cap fails the floor.
    FailWhenMissing,
}

impl Default for MarketCapPolicy {
    fn default() -> Self {
        Self::PassWhenMissing
    }
}

impl MarketCapPolicy {
    /// Apply `floor` (hundred-millions) to an optional snapshot value.
    pub fn passes(self, market_cap: Option<f64>, floor: f64) -> bool {
        match market_cap {
            Some(cap) => cap >= floor,
            None => self == Self::PassWhenMissing,
        }
    }
}

impl std::fmt::Display for MarketCapPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PassWhenMissing => write!(f, "PassWhenMissing"),
            Self::FailWhenMissing => write!(f, "FailWhenMissing"),
        }
    }
}
