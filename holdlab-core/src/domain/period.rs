//! Filing period keys.
//!
//! Quarterly keys of the form `YYYY-QN` are parsed and ordered by
//! `(year, quarter)` and stored in canonical form, so `"2024-q1"` and
//! `"2024-Q1"` are the same key. Any other token is kept verbatim, ordered
//! lexicographically among its kind and before every parsed quarter, so a
//! malformed key can never become the latest period.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeriodKeyError {
    #[error("empty period key")]
    Empty,
}

/// Sortable filing-period token such as `"2024-Q3"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PeriodKey {
    raw: String,
    quarter: Option<(i32, u8)>,
}

impl PeriodKey {
    pub fn parse(raw: &str) -> Result<Self, PeriodKeyError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PeriodKeyError::Empty);
        }
        Ok(match parse_quarter(raw) {
            Some((year, q)) => Self::quarter(year, q),
            None => Self {
                raw: raw.to_string(),
                quarter: None,
            },
        })
    }

    /// Quarter key for a year/quarter pair. `quarter` is clamped to 1..=4.
    pub fn quarter(year: i32, quarter: u8) -> Self {
        let q = quarter.clamp(1, 4);
        Self {
            raw: format!("{year}-Q{q}"),
            quarter: Some((year, q)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// `(year, quarter)` when the key is a quarterly key.
    pub fn year_quarter(&self) -> Option<(i32, u8)> {
        self.quarter
    }

    /// Last calendar day of the quarter, for quarterly keys.
    pub fn quarter_end(&self) -> Option<NaiveDate> {
        let (year, q) = self.quarter?;
        let (month, day) = match q {
            1 => (3, 31),
            2 => (6, 30),
            3 => (9, 30),
            _ => (12, 31),
        };
        NaiveDate::from_ymd_opt(year, month, day)
    }

    /// True when `self` sorts strictly after `other`.
    pub fn is_after(&self, other: &PeriodKey) -> bool {
        self > other
    }
}

fn parse_quarter(raw: &str) -> Option<(i32, u8)> {
    let upper = raw.to_ascii_uppercase();
    let (year, quarter) = upper.split_once("-Q")?;
    if year.len() != 4 {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    let quarter: u8 = quarter.parse().ok()?;
    (1..=4).contains(&quarter).then_some((year, quarter))
}

impl Ord for PeriodKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.quarter, other.quarter) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.raw.cmp(&other.raw)),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => self.raw.cmp(&other.raw),
        }
    }
}

impl PartialOrd for PeriodKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl TryFrom<String> for PeriodKey {
    type Error = PeriodKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PeriodKey> for String {
    fn from(key: PeriodKey) -> Self {
        key.raw
    }
}
