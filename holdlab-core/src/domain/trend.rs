use serde::{Deserialize, Serialize};

use super::security::Security;

/// What happened to one security between two consecutive snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendDirection {
    New,
    Increased,
    Decreased,
    Sold,
    Stable,
}

impl TrendDirection {
    pub fn is_buy_side(self) -> bool {
        matches!(self, Self::New | Self::Increased)
    }

    pub fn is_sell_side(self) -> bool {
        matches!(self, Self::Decreased | Self::Sold)
    }

    /// Anything other than `Stable`.
    pub fn is_activity(self) -> bool {
        self != Self::Stable
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Increased => "increased",
            Self::Decreased => "decreased",
            Self::Sold => "sold",
            Self::Stable => "stable",
        }
    }
}

/// Derived change record for one security in one transition.
///
/// Never stored as authoritative state; recomputed from the two snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub security: Security,
    pub direction: TrendDirection,
    pub previous_shares: u64,
    pub current_shares: u64,
    pub previous_value: f64,
    pub current_value: f64,
    pub share_delta: i64,
    /// `None` when the change cannot be valued (a sold position with no
    /// known current price).
    pub value_delta: Option<f64>,
    /// Share change relative to the previous holding, in percent.
    pub share_percent_delta: f64,
    pub is_major_move: bool,
    pub is_significant: bool,
}

impl Trend {
    pub fn abs_value_delta(&self) -> f64 {
        self.value_delta.map_or(0.0, f64::abs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sides_partition_activity() {
        for d in [
            TrendDirection::New,
            TrendDirection::Increased,
            TrendDirection::Decreased,
            TrendDirection::Sold,
        ] {
            assert!(d.is_activity());
            assert_ne!(d.is_buy_side(), d.is_sell_side());
        }
        assert!(!TrendDirection::Stable.is_buy_side());
        assert!(!TrendDirection::Stable.is_sell_side());
    }

    #[test]
    fn serializes_screaming_case() {
        let json = serde_json::to_string(&TrendDirection::Sold).unwrap();
        assert_eq!(json, "\"SOLD\"");
    }
}
