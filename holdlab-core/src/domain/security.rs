use serde::{Deserialize, Serialize};

use super::ids::SecurityId;

/// Sector label used when the reference catalog has nothing for a security.
pub const UNKNOWN_SECTOR: &str = "Unknown";

/// Canonical reference record for a tradable instrument.
///
/// Owned by the reference catalog; the engine only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Security {
    pub identifier: SecurityId,
    pub ticker: Option<String>,
    pub name: String,
    pub sector: String,
}

impl Security {
    pub fn new(identifier: SecurityId, ticker: Option<String>, name: impl Into<String>) -> Self {
        Self {
            identifier,
            ticker,
            name: name.into(),
            sector: UNKNOWN_SECTOR.to_string(),
        }
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = sector.into();
        self
    }

    /// Whether the catalog supplied a usable sector.
    pub fn has_known_sector(&self) -> bool {
        let s = self.sector.trim();
        !s.is_empty() && !s.eq_ignore_ascii_case(UNKNOWN_SECTOR)
    }

    /// Ticker if known, otherwise the canonical name.
    pub fn display_label(&self) -> &str {
        self.ticker.as_deref().unwrap_or(&self.name)
    }
}
