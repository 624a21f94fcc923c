use serde::{Deserialize, Serialize};

use super::security::Security;

/// One line of an information table, before merging.
///
/// Filings routinely list the same security several times (different
/// managers, share classes, or voting-authority splits). These are collapsed
/// by the merge engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLineItem {
    #[serde(default, alias = "cusip")]
    pub identifier: Option<String>,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub shares: u64,
    #[serde(alias = "value")]
    pub market_value: f64,
}

impl RawLineItem {
    pub fn new(identifier: &str, name: &str, shares: u64, market_value: f64) -> Self {
        Self {
            identifier: Some(identifier.to_string()),
            ticker: None,
            name: Some(name.to_string()),
            shares,
            market_value,
        }
    }

    pub fn with_ticker(mut self, ticker: &str) -> Self {
        self.ticker = Some(ticker.to_string());
        self
    }

    /// Number of descriptive fields present; used to pick the best label
    /// among duplicates.
    pub(crate) fn information_score(&self) -> usize {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        usize::from(present(&self.ticker)) + usize::from(present(&self.name))
    }
}

/// A merged holding: exactly one per security within a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub security: Security,
    pub shares: u64,
    pub market_value: f64,
}

impl Position {
    /// Implied price per share, when any shares are held.
    pub fn price_per_share(&self) -> Option<f64> {
        (self.shares > 0).then(|| self.market_value / self.shares as f64)
    }

    /// Convert back into a raw line item (used for re-merging).
    pub fn to_line_item(&self) -> RawLineItem {
        RawLineItem {
            identifier: Some(self.security.identifier.as_str().to_string()),
            ticker: self.security.ticker.clone(),
            name: Some(self.security.name.clone()),
            shares: self.shares,
            market_value: self.market_value,
        }
    }
}
