//! Ownership percentages against two denominators.
//!
//! - Portfolio weight: a position's value over its snapshot's total value.
//! - Company ownership: holder shares over the security's shares
//!   outstanding, rolled up by holder category.
//!
//! Company ownership refuses to run without a shares-outstanding figure.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::warn;

use crate::classify::Classifier;
use crate::domain::{Security, SecurityId, Snapshot};

/// Label for the share of a company not held by tracked institutions.
pub const PUBLIC_AND_OTHER: &str = "Public & Other";

#[derive(Debug, Error, PartialEq)]
pub enum OwnershipError {
    #[error("shares outstanding unavailable for {security}; cannot compute ownership")]
    MissingDenominator { security: SecurityId },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OwnershipConfig {
    /// Allowed |category sum − 100| in percentage points before warning.
    pub drift_tolerance: f64,
    pub top_holders: usize,
    /// Categories at or below this percentage are left out of the display
    /// list. The drift check still covers them.
    pub min_category_percentage: f64,
}

impl Default for OwnershipConfig {
    fn default() -> Self {
        Self {
            drift_tolerance: 0.5,
            top_holders: 10,
            min_category_percentage: 0.1,
        }
    }
}

// ── Portfolio weights ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedPosition {
    pub security: Security,
    pub shares: u64,
    pub market_value: f64,
    /// Percent of the snapshot's total value.
    pub percentage: f64,
}

/// Per-position share of portfolio value, largest first. A snapshot worth
/// nothing yields 0% everywhere.
pub fn portfolio_weights(snapshot: &Snapshot) -> Vec<WeightedPosition> {
    let total = snapshot.total_value();
    snapshot
        .by_value_desc()
        .into_iter()
        .map(|p| WeightedPosition {
            security: p.security.clone(),
            shares: p.shares,
            market_value: p.market_value,
            percentage: if total > 0.0 {
                p.market_value / total * 100.0
            } else {
                0.0
            },
        })
        .collect()
}

// ── Company ownership ──

/// One holder's stake in the security being analyzed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolderPosition {
    pub holder: String,
    pub shares: u64,
    pub market_value: f64,
}

impl HolderPosition {
    pub fn new(holder: impl Into<String>, shares: u64, market_value: f64) -> Self {
        Self {
            holder: holder.into(),
            shares,
            market_value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedHolder {
    pub holder: String,
    pub category: String,
    pub shares: u64,
    pub market_value: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub shares: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnershipBreakdown {
    pub security: Security,
    pub shares_outstanding: u64,
    pub top_holders: Vec<RankedHolder>,
    /// Displayed categories including "Public & Other", largest first.
    pub categories: Vec<CategoryTotal>,
    pub institutional_shares: u64,
    pub institutional_percentage: f64,
    pub public_and_other_percentage: f64,
    /// Sum over every category (displayed or not) plus "Public & Other".
    pub category_sum: f64,
    /// Whether `category_sum` strays from 100 beyond the tolerance.
    pub drift: bool,
}

impl OwnershipBreakdown {
    pub fn category(&self, name: &str) -> Option<&CategoryTotal> {
        self.categories.iter().find(|c| c.category == name)
    }
}

/// Compute the ownership breakdown of `security` across `holders`.
///
/// Holders are summed per name, classified with `classifier`, and rolled up
/// by category. Fails with [`OwnershipError::MissingDenominator`] when
/// `shares_outstanding` is absent or zero.
pub fn company_ownership(
    security: &Security,
    holders: &[HolderPosition],
    shares_outstanding: Option<u64>,
    classifier: &Classifier,
    config: &OwnershipConfig,
) -> Result<OwnershipBreakdown, OwnershipError> {
    let outstanding = shares_outstanding
        .filter(|n| *n > 0)
        .ok_or_else(|| OwnershipError::MissingDenominator {
            security: security.identifier.clone(),
        })?;
    let pct = |shares: u64| shares as f64 / outstanding as f64 * 100.0;

    let mut per_holder: HashMap<&str, (u64, f64)> = HashMap::new();
    for h in holders.iter().filter(|h| h.shares > 0) {
        let entry = per_holder.entry(h.holder.trim()).or_insert((0, 0.0));
        entry.0 = entry.0.saturating_add(h.shares);
        entry.1 += h.market_value;
    }

    let mut ranked: Vec<RankedHolder> = per_holder
        .into_iter()
        .map(|(holder, (shares, market_value))| RankedHolder {
            holder: holder.to_string(),
            category: classifier.classify(holder, None).category,
            shares,
            market_value,
            percentage: pct(shares),
        })
        .collect();
    ranked.sort_by(|a, b| b.shares.cmp(&a.shares).then_with(|| a.holder.cmp(&b.holder)));

    let mut by_category: BTreeMap<&str, u64> = BTreeMap::new();
    for h in &ranked {
        let slot = by_category.entry(h.category.as_str()).or_insert(0);
        *slot = slot.saturating_add(h.shares);
    }

    let institutional_shares = ranked
        .iter()
        .fold(0u64, |acc, h| acc.saturating_add(h.shares));
    let institutional_percentage = pct(institutional_shares);
    let public_and_other_percentage = (100.0 - institutional_percentage).max(0.0);

    let mut all: Vec<CategoryTotal> = by_category
        .into_iter()
        .map(|(category, shares)| CategoryTotal {
            category: category.to_string(),
            shares,
            percentage: pct(shares),
        })
        .collect();
    all.push(CategoryTotal {
        category: PUBLIC_AND_OTHER.to_string(),
        shares: outstanding.saturating_sub(institutional_shares),
        percentage: public_and_other_percentage,
    });

    let category_sum: f64 = all.iter().map(|c| c.percentage).sum();
    let drift = (category_sum - 100.0).abs() > config.drift_tolerance;
    if drift {
        warn!(
            security = %security.identifier,
            category_sum,
            institutional_percentage,
            "ownership category percentages drift from 100%"
        );
    }

    let mut categories: Vec<CategoryTotal> = all
        .into_iter()
        .filter(|c| c.percentage > config.min_category_percentage)
        .collect();
    categories.sort_by(|a, b| {
        b.percentage
            .total_cmp(&a.percentage)
            .then_with(|| a.category.cmp(&b.category))
    });

    ranked.truncate(config.top_holders);

    Ok(OwnershipBreakdown {
        security: security.clone(),
        shares_outstanding: outstanding,
        top_holders: ranked,
        categories,
        institutional_shares,
        institutional_percentage,
        public_and_other_percentage,
        category_sum,
        drift,
    })
}
