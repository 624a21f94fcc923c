//! Position merge engine.
//!
//! Collapses the raw line items of one filing into a [`Snapshot`] holding
//! exactly one position per security identifier:
//! 1. Resolve each item's identifier (falling back to a ticker lookup in the
//!    reference catalog when the identifier is missing)
//! 2. Group by identifier, summing shares and market value
//! 3. Label each group from its most information-rich item, filling gaps
//!    from the catalog
//!
//! Items that cannot be resolved are reported individually and skipped. Only
//! when every item of a non-empty filing is malformed does the whole merge
//! fail with [`MergeError::EmptySnapshot`].

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{
    EntityId, PeriodKey, Position, RawLineItem, Security, SecurityId, Snapshot, SnapshotError,
    UNKNOWN_SECTOR,
};
use crate::provider::SecurityCatalog;

/// Why a single line item was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum MalformedReason {
    /// Neither an identifier nor a ticker was present.
    MissingIdentifier,
    /// No identifier, and the ticker is not in the catalog.
    UnresolvableTicker(String),
    /// Market value is negative, NaN, or infinite.
    InvalidMarketValue(f64),
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingIdentifier => write!(f, "no security identifier or ticker"),
            Self::UnresolvableTicker(t) => write!(f, "ticker '{t}' not found in reference catalog"),
            Self::InvalidMarketValue(v) => write!(f, "invalid market value {v}"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MergeError {
    #[error("malformed filing record #{index}: {reason}")]
    MalformedFilingRecord { index: usize, reason: MalformedReason },

    #[error("all {count} line items for {entity} {period} are malformed")]
    EmptySnapshot {
        entity: EntityId,
        period: PeriodKey,
        count: usize,
    },

    #[error("merged snapshot violates invariants: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// A merged snapshot plus the per-item rejections that were skipped.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub snapshot: Snapshot,
    pub rejected: Vec<MergeError>,
    /// Number of raw items folded into an existing position.
    pub duplicates_merged: usize,
}

struct Group<'a> {
    shares: u64,
    market_value: f64,
    best: &'a RawLineItem,
    best_score: usize,
    items: usize,
    resolved: Option<Security>,
}

/// Merge one filing's raw line items into a snapshot.
pub fn merge_line_items(
    entity_id: &EntityId,
    period: &PeriodKey,
    as_of: NaiveDate,
    items: &[RawLineItem],
    catalog: &dyn SecurityCatalog,
) -> Result<MergeOutcome, MergeError> {
    let mut groups: BTreeMap<SecurityId, Group<'_>> = BTreeMap::new();
    let mut rejected = Vec::new();

    for (index, item) in items.iter().enumerate() {
        let (identifier, resolved) = match resolve_identifier(item, catalog) {
            Ok(found) => found,
            Err(reason) => {
                warn!(
                    entity = %entity_id,
                    period = %period,
                    index,
                    %reason,
                    "skipping malformed filing record"
                );
                rejected.push(MergeError::MalformedFilingRecord { index, reason });
                continue;
            }
        };

        if !item.market_value.is_finite() || item.market_value < 0.0 {
            let reason = MalformedReason::InvalidMarketValue(item.market_value);
            warn!(
                entity = %entity_id,
                period = %period,
                index,
                %reason,
                "skipping malformed filing record"
            );
            rejected.push(MergeError::MalformedFilingRecord { index, reason });
            continue;
        }

        let score = item.information_score();
        let group = groups.entry(identifier).or_insert_with(|| Group {
            shares: 0,
            market_value: 0.0,
            best: item,
            best_score: score,
            items: 0,
            resolved: None,
        });
        group.shares = group.shares.saturating_add(item.shares);
        group.market_value += item.market_value;
        group.items += 1;
        if score > group.best_score {
            group.best = item;
            group.best_score = score;
        }
        if group.resolved.is_none() {
            group.resolved = resolved;
        }
    }

    if !items.is_empty() && rejected.len() == items.len() {
        return Err(MergeError::EmptySnapshot {
            entity: entity_id.clone(),
            period: period.clone(),
            count: items.len(),
        });
    }

    let mut duplicates_merged = 0;
    let mut positions = Vec::with_capacity(groups.len());
    for (identifier, group) in groups {
        duplicates_merged += group.items - 1;
        if group.shares == 0 {
            debug!(entity = %entity_id, period = %period, %identifier, "dropping zero-share position");
            continue;
        }
        let reference = group
            .resolved
            .or_else(|| catalog.by_identifier(&identifier));
        positions.push(Position {
            security: label_security(identifier, group.best, reference),
            shares: group.shares,
            market_value: group.market_value,
        });
    }

    let snapshot = Snapshot::new(entity_id.clone(), period.clone(), as_of, positions)?;
    Ok(MergeOutcome {
        snapshot,
        rejected,
        duplicates_merged,
    })
}

/// Identifier for an item, plus the catalog record if a ticker lookup was
/// needed to find it.
fn resolve_identifier(
    item: &RawLineItem,
    catalog: &dyn SecurityCatalog,
) -> Result<(SecurityId, Option<Security>), MalformedReason> {
    if let Some(id) = item.identifier.as_deref().and_then(SecurityId::parse) {
        return Ok((id, None));
    }
    match non_blank(&item.ticker) {
        Some(ticker) => catalog
            .by_ticker(ticker)
            .map(|sec| (sec.identifier.clone(), Some(sec)))
            .ok_or_else(|| MalformedReason::UnresolvableTicker(ticker.to_string())),
        None => Err(MalformedReason::MissingIdentifier),
    }
}

fn label_security(
    identifier: SecurityId,
    best: &RawLineItem,
    reference: Option<Security>,
) -> Security {
    let ticker = non_blank(&best.ticker)
        .map(|t| t.to_ascii_uppercase())
        .or_else(|| reference.as_ref().and_then(|r| r.ticker.clone()));
    let name = non_blank(&best.name)
        .map(str::to_string)
        .or_else(|| reference.as_ref().map(|r| r.name.clone()))
        .unwrap_or_else(|| identifier.as_str().to_string());
    let sector = reference
        .map(|r| r.sector)
        .unwrap_or_else(|| UNKNOWN_SECTOR.to_string());

    Security {
        identifier,
        ticker,
        name,
        sector,
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
