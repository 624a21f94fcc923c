//! Shared fixtures for unit tests.

use chrono::NaiveDate;

use crate::domain::{EntityId, PeriodKey, Position, Security, SecurityId, Snapshot};

pub fn security(id: &str, name: &str) -> Security {
    Security::new(SecurityId::new(id), None, name)
}

pub fn position(id: &str, shares: u64, value: f64) -> Position {
    Position {
        security: security(id, &format!("{id} CORP")),
        shares,
        market_value: value,
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Snapshot for entity `entity` in `year`-Q`q`, dated at quarter end.
pub fn snapshot(entity: &str, year: i32, q: u8, positions: Vec<Position>) -> Snapshot {
    let period = PeriodKey::quarter(year, q);
    let as_of = period.quarter_end().unwrap();
    Snapshot::new(EntityId::from(entity), period, as_of, positions).unwrap()
}
