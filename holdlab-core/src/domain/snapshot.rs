//! Snapshot: one entity's merged portfolio for one filing period.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use super::ids::{EntityId, SecurityId};
use super::period::PeriodKey;
use super::position::{Position, RawLineItem};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SnapshotError {
    #[error("duplicate position for security {0}; raw items must go through the merge engine")]
    DuplicatePosition(SecurityId),

    #[error("position {0} holds zero shares")]
    ZeroShares(SecurityId),

    #[error("position {identifier} has invalid market value {value}")]
    InvalidMarketValue { identifier: SecurityId, value: f64 },
}

/// Immutable merged portfolio.
///
/// Invariants (checked by [`Snapshot::new`]):
/// - at most one position per security identifier;
/// - no zero-share positions;
/// - every market value is finite and non-negative.
///
/// Positions are stored sorted by identifier so lookups are a binary search
/// and iteration order is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    entity_id: EntityId,
    period: PeriodKey,
    as_of: NaiveDate,
    positions: Vec<Position>,
    total_value: f64,
}

impl Snapshot {
    pub fn new(
        entity_id: EntityId,
        period: PeriodKey,
        as_of: NaiveDate,
        mut positions: Vec<Position>,
    ) -> Result<Self, SnapshotError> {
        for p in &positions {
            if p.shares == 0 {
                return Err(SnapshotError::ZeroShares(p.security.identifier.clone()));
            }
            if !p.market_value.is_finite() || p.market_value < 0.0 {
                return Err(SnapshotError::InvalidMarketValue {
                    identifier: p.security.identifier.clone(),
                    value: p.market_value,
                });
            }
        }

        positions.sort_by(|a, b| a.security.identifier.cmp(&b.security.identifier));
        if let Some(dup) = positions
            .windows(2)
            .find(|w| w[0].security.identifier == w[1].security.identifier)
        {
            return Err(SnapshotError::DuplicatePosition(dup[0].security.identifier.clone()));
        }

        let total_value = positions.iter().map(|p| p.market_value).sum();
        Ok(Self {
            entity_id,
            period,
            as_of,
            positions,
            total_value,
        })
    }

    /// A snapshot with no holdings (e.g. a notice filing).
    pub fn empty(entity_id: EntityId, period: PeriodKey, as_of: NaiveDate) -> Self {
        Self {
            entity_id,
            period,
            as_of,
            positions: Vec::new(),
            total_value: 0.0,
        }
    }

    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    pub fn period(&self) -> &PeriodKey {
        &self.period
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn total_value(&self) -> f64 {
        self.total_value
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn position(&self, identifier: &SecurityId) -> Option<&Position> {
        self.positions
            .binary_search_by(|p| p.security.identifier.cmp(identifier))
            .ok()
            .map(|idx| &self.positions[idx])
    }

    pub fn holds(&self, identifier: &SecurityId) -> bool {
        self.position(identifier).is_some()
    }

    /// Positions sorted by market value, largest first.
    pub fn by_value_desc(&self) -> Vec<&Position> {
        let mut sorted: Vec<&Position> = self.positions.iter().collect();
        sorted.sort_by(|a, b| b.market_value.total_cmp(&a.market_value));
        sorted
    }

    /// The snapshot's positions as raw line items, one per security.
    pub fn to_line_items(&self) -> Vec<RawLineItem> {
        self.positions.iter().map(Position::to_line_item).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Security;

    fn pos(id: &str, shares: u64, value: f64) -> Position {
        Position {
            security: Security::new(SecurityId::new(id), None, format!("{id} CORP")),
            shares,
            market_value: value,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 30).unwrap()
    }

    #[test]
    fn total_value_is_sum_of_positions() {
        let snap = Snapshot::new(
            EntityId::from("e"),
            PeriodKey::quarter(2024, 3),
            date(),
            vec![pos("B", 10, 250.0), pos("A", 5, 750.0)],
        )
        .unwrap();
        assert_eq!(snap.total_value(), 1000.0);
        assert_eq!(snap.positions()[0].security.identifier.as_str(), "A");
        assert!(snap.holds(&SecurityId::new("b")));
        assert!(!snap.holds(&SecurityId::new("C")));
    }

    #[test]
    fn duplicate_identifiers_rejected() {
        let err = Snapshot::new(
            EntityId::from("e"),
            PeriodKey::quarter(2024, 3),
            date(),
            vec![pos("A", 1, 1.0), pos("A", 2, 2.0)],
        )
        .unwrap_err();
        assert_eq!(err, SnapshotError::DuplicatePosition(SecurityId::new("A")));
    }

    #[test]
    fn zero_share_positions_rejected() {
        let err = Snapshot::new(
            EntityId::from("e"),
            PeriodKey::quarter(2024, 3),
            date(),
            vec![pos("A", 0, 1.0)],
        )
        .unwrap_err();
        assert!(matches!(err, SnapshotError::ZeroShares(_)));
    }

    #[test]
    fn negative_value_rejected() {
        let err = Snapshot::new(
            EntityId::from("e"),
            PeriodKey::quarter(2024, 3),
            date(),
            vec![pos("A", 1, -5.0)],
        )
        .unwrap_err();
        assert!(matches!(err, SnapshotError::InvalidMarketValue { .. }));
    }

    #[test]
    fn by_value_desc_orders_largest_first() {
        let snap = Snapshot::new(
            EntityId::from("e"),
            PeriodKey::quarter(2024, 3),
            date(),
            vec![pos("A", 1, 10.0), pos("B", 1, 30.0), pos("C", 1, 20.0)],
        )
        .unwrap();
        let ids: Vec<&str> = snap
            .by_value_desc()
            .iter()
            .map(|p| p.security.identifier.as_str())
            .collect();
        assert_eq!(ids, vec!["B", "C", "A"]);
    }
}
