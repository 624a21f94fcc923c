//! Collaborator traits and in-memory implementations.
//!
//! The engine never fetches reference data itself. These traits abstract the
//! security reference catalog, shares-outstanding figures, and last-known
//! prices so callers can back them with files, a database, or test fixtures.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::domain::{Security, SecurityId};

/// How a caller identifies a security when asking the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityRef<'a> {
    Identifier(&'a str),
    Ticker(&'a str),
}

/// Reference catalog mapping identifiers and tickers to canonical records.
pub trait SecurityCatalog: Send + Sync {
    fn by_identifier(&self, identifier: &SecurityId) -> Option<Security>;

    fn by_ticker(&self, ticker: &str) -> Option<Security>;

    fn resolve(&self, key: SecurityRef<'_>) -> Option<Security> {
        match key {
            SecurityRef::Identifier(raw) => {
                SecurityId::parse(raw).and_then(|id| self.by_identifier(&id))
            }
            SecurityRef::Ticker(t) => self.by_ticker(t),
        }
    }
}

/// Total shares outstanding for a security as of a date.
///
/// `None` means the figure is unavailable. That is an expected outcome and
/// callers must surface it rather than substitute a default.
pub trait SharesOutstandingProvider: Send + Sync {
    fn shares_outstanding(&self, security: &Security, as_of: NaiveDate) -> Option<u64>;
}

/// Last-known price per share. Used only to value fully sold positions.
pub trait PriceProvider: Send + Sync {
    fn last_price(&self, security: &Security) -> Option<f64>;
}

/// Catalog backed by two hash maps.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    by_id: HashMap<SecurityId, Security>,
    ticker_index: HashMap<String, SecurityId>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a security. Tickers are indexed case-insensitively.
    pub fn insert(&mut self, security: Security) {
        if let Some(ticker) = security.ticker.as_deref() {
            self.ticker_index
                .insert(ticker.trim().to_ascii_uppercase(), security.identifier.clone());
        }
        self.by_id.insert(security.identifier.clone(), security);
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl FromIterator<Security> for InMemoryCatalog {
    fn from_iter<I: IntoIterator<Item = Security>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for sec in iter {
            catalog.insert(sec);
        }
        catalog
    }
}

impl SecurityCatalog for InMemoryCatalog {
    fn by_identifier(&self, identifier: &SecurityId) -> Option<Security> {
        self.by_id.get(identifier).cloned()
    }

    fn by_ticker(&self, ticker: &str) -> Option<Security> {
        let key = ticker.trim().to_ascii_uppercase();
        self.ticker_index
            .get(&key)
            .and_then(|id| self.by_id.get(id))
            .cloned()
    }
}

/// Per-security lookup table keyed by identifier.
///
/// Serves as both a price table and a shares-outstanding table.
#[derive(Debug, Clone, Default)]
pub struct SecurityTable<T> {
    values: HashMap<SecurityId, T>,
}

impl<T: Copy> SecurityTable<T> {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    pub fn insert(&mut self, identifier: SecurityId, value: T) {
        self.values.insert(identifier, value);
    }

    pub fn get(&self, identifier: &SecurityId) -> Option<T> {
        self.values.get(identifier).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<T: Copy> FromIterator<(SecurityId, T)> for SecurityTable<T> {
    fn from_iter<I: IntoIterator<Item = (SecurityId, T)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Last-known prices keyed by identifier.
pub type PriceTable = SecurityTable<f64>;

/// Shares outstanding keyed by identifier. The table is not date-aware; the
/// figure applies to every `as_of`.
pub type SharesOutstandingTable = SecurityTable<u64>;

impl PriceProvider for PriceTable {
    fn last_price(&self, security: &Security) -> Option<f64> {
        self.get(&security.identifier).filter(|p| p.is_finite() && *p > 0.0)
    }
}

impl SharesOutstandingProvider for SharesOutstandingTable {
    fn shares_outstanding(&self, security: &Security, _as_of: NaiveDate) -> Option<u64> {
        self.get(&security.identifier).filter(|n| *n > 0)
    }
}
