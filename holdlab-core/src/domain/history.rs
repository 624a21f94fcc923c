//! History: append-only, period-ordered snapshots for one entity.

use serde::Serialize;
use thiserror::Error;

use super::ids::EntityId;
use super::period::PeriodKey;
use super::snapshot::Snapshot;

#[derive(Debug, Error, PartialEq)]
pub enum HistoryError {
    #[error(
        "inconsistent history order for {entity}: period {attempted} is not after latest {latest}"
    )]
    InconsistentHistoryOrder {
        entity: EntityId,
        latest: PeriodKey,
        attempted: PeriodKey,
    },

    #[error("snapshot for {found} appended to history of {expected}")]
    EntityMismatch { expected: EntityId, found: EntityId },
}

/// Snapshots for one entity, strictly increasing by period key.
///
/// Existing snapshots are never mutated or reordered; the only way in is
/// [`History::append`], which rejects anything not strictly after the latest.
///
/// Periods whose filing was dropped are remembered separately, so a
/// transition that spans one can be told apart from two adjacent quarters.
#[derive(Debug, Clone, Serialize)]
pub struct History {
    entity_id: EntityId,
    snapshots: Vec<Snapshot>,
    skipped: Vec<PeriodKey>,
}

impl History {
    pub fn new(entity_id: EntityId) -> Self {
        Self {
            entity_id,
            snapshots: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Build a history by appending in the given order.
    pub fn from_snapshots(
        entity_id: EntityId,
        snapshots: impl IntoIterator<Item = Snapshot>,
    ) -> Result<Self, HistoryError> {
        let mut history = Self::new(entity_id);
        for snapshot in snapshots {
            history.append(snapshot)?;
        }
        Ok(history)
    }

    pub fn append(&mut self, snapshot: Snapshot) -> Result<(), HistoryError> {
        if snapshot.entity_id() != &self.entity_id {
            return Err(HistoryError::EntityMismatch {
                expected: self.entity_id.clone(),
                found: snapshot.entity_id().clone(),
            });
        }
        if let Some(latest) = self.latest() {
            if !snapshot.period().is_after(latest.period()) {
                return Err(HistoryError::InconsistentHistoryOrder {
                    entity: self.entity_id.clone(),
                    latest: latest.period().clone(),
                    attempted: snapshot.period().clone(),
                });
            }
        }
        self.snapshots.push(snapshot);
        Ok(())
    }

    /// Record a period whose filing produced no snapshot. Periods that
    /// already hold a snapshot are ignored.
    pub fn record_skipped(&mut self, period: PeriodKey) {
        if self.get(&period).is_some() {
            return;
        }
        if let Err(at) = self.skipped.binary_search(&period) {
            self.skipped.insert(at, period);
        }
    }

    /// Skipped periods in ascending order.
    pub fn skipped_periods(&self) -> &[PeriodKey] {
        &self.skipped
    }

    /// Skipped periods strictly between `from` and `to`.
    pub fn skipped_between(&self, from: &PeriodKey, to: &PeriodKey) -> Vec<PeriodKey> {
        self.skipped
            .iter()
            .filter(|p| p.is_after(from) && to.is_after(p))
            .cloned()
            .collect()
    }

    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }

    pub fn get(&self, period: &PeriodKey) -> Option<&Snapshot> {
        self.snapshots
            .binary_search_by(|s| s.period().cmp(period))
            .ok()
            .map(|idx| &self.snapshots[idx])
    }

    /// `(previous, current)` for the most recent transition.
    ///
    /// `previous` is `None` when only one snapshot exists; the whole result
    /// is `None` for an empty history.
    pub fn latest_transition(&self) -> Option<(Option<&Snapshot>, &Snapshot)> {
        let n = self.snapshots.len();
        let current = self.snapshots.last()?;
        let previous = n.checked_sub(2).map(|i| &self.snapshots[i]);
        Some((previous, current))
    }

    /// Consecutive `(previous, current)` pairs, oldest first.
    pub fn transitions(&self) -> impl Iterator<Item = (&Snapshot, &Snapshot)> {
        self.snapshots.windows(2).map(|w| (&w[0], &w[1]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn snap(entity: &str, year: i32, q: u8) -> Snapshot {
        let period = PeriodKey::quarter(year, q);
        let as_of = period.quarter_end().unwrap();
        Snapshot::empty(EntityId::from(entity), period, as_of)
    }

    #[test]
    fn append_in_order_succeeds() {
        let mut h = History::new(EntityId::from("e"));
        h.append(snap("e", 2024, 1)).unwrap();
        h.append(snap("e", 2024, 2)).unwrap();
        assert_eq!(h.len(), 2);
        assert_eq!(h.latest().unwrap().period().as_str(), "2024-Q2");
    }

    #[test]
    fn out_of_order_append_rejected() {
        let mut h = History::new(EntityId::from("e"));
        h.append(snap("e", 2024, 2)).unwrap();
        let err = h.append(snap("e", 2024, 1)).unwrap_err();
        assert!(matches!(err, HistoryError::InconsistentHistoryOrder { .. }));
        assert_eq!(h.len(), 1, "rejected snapshot must not be stored");
    }

    #[test]
    fn duplicate_period_rejected() {
        let mut h = History::new(EntityId::from("e"));
        h.append(snap("e", 2024, 2)).unwrap();
        assert!(h.append(snap("e", 2024, 2)).is_err());
    }

    #[test]
    fn same_quarter_in_other_case_rejected() {
        let mut h = History::new(EntityId::from("e"));
        let as_of = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let upper = PeriodKey::parse("2024-Q1").unwrap();
        let lower = PeriodKey::parse("2024-q1").unwrap();
        h.append(Snapshot::empty(EntityId::from("e"), upper, as_of))
            .unwrap();
        let err = h
            .append(Snapshot::empty(EntityId::from("e"), lower, as_of))
            .unwrap_err();
        assert!(matches!(err, HistoryError::InconsistentHistoryOrder { .. }));
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn skipped_periods_are_tracked_between_snapshots() {
        let mut h = History::from_snapshots(
            EntityId::from("e"),
            vec![snap("e", 2024, 1), snap("e", 2024, 3)],
        )
        .unwrap();
        h.record_skipped(PeriodKey::quarter(2024, 2));
        h.record_skipped(PeriodKey::quarter(2024, 2));
        // Already has a snapshot.
        h.record_skipped(PeriodKey::quarter(2024, 3));
        assert_eq!(h.skipped_periods(), &[PeriodKey::quarter(2024, 2)]);
        assert_eq!(
            h.skipped_between(&PeriodKey::quarter(2024, 1), &PeriodKey::quarter(2024, 3)),
            vec![PeriodKey::quarter(2024, 2)]
        );
        assert!(h
            .skipped_between(&PeriodKey::quarter(2024, 2), &PeriodKey::quarter(2024, 3))
            .is_empty());
    }

    #[test]
    fn foreign_entity_rejected() {
        let mut h = History::new(EntityId::from("e"));
        let err = h.append(snap("other", 2024, 2)).unwrap_err();
        assert!(matches!(err, HistoryError::EntityMismatch { .. }));
    }

    #[test]
    fn latest_transition_shapes() {
        let mut h = History::new(EntityId::from("e"));
        assert!(h.latest_transition().is_none());

        h.append(snap("e", 2023, 4)).unwrap();
        let (prev, cur) = h.latest_transition().unwrap();
        assert!(prev.is_none());
        assert_eq!(cur.period().as_str(), "2023-Q4");

        h.append(snap("e", 2024, 1)).unwrap();
        let (prev, cur) = h.latest_transition().unwrap();
        assert_eq!(prev.unwrap().period().as_str(), "2023-Q4");
        assert_eq!(cur.period().as_str(), "2024-Q1");
        assert_eq!(h.transitions().count(), 1);
    }

    #[test]
    fn get_by_period() {
        let h = History::from_snapshots(
            EntityId::from("e"),
            vec![snap("e", 2023, 3), snap("e", 2023, 4), snap("e", 2024, 1)],
        )
        .unwrap();
        let found = h.get(&PeriodKey::quarter(2023, 4)).unwrap();
        assert_eq!(found.as_of(), NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
        assert!(h.get(&PeriodKey::quarter(2022, 1)).is_none());
    }
}
