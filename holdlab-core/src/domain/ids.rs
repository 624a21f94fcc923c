use serde::{Deserialize, Serialize};
use std::fmt;

/// Tracked investor or fund (e.g. a 13F filer slug).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Opaque security identifier (typically a 9-character CUSIP).
///
/// Normalized on construction: surrounding whitespace is trimmed and letters
/// are uppercased, so `" 037833100 "` and `"037833100"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecurityId(String);

impl SecurityId {
    /// Normalize a raw identifier. Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_ascii_uppercase()))
        }
    }

    /// Build from an identifier that is already known to be non-blank.
    ///
    /// Blank input still yields a (blank) id; prefer [`SecurityId::parse`]
    /// for untrusted filing data.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SecurityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn security_id_is_normalized() {
        assert_eq!(SecurityId::parse(" 037833100 "), Some(SecurityId::new("037833100")));
        assert_eq!(SecurityId::new("g0176j109").as_str(), "G0176J109");
    }

    #[test]
    fn blank_security_id_is_rejected() {
        assert_eq!(SecurityId::parse("   "), None);
        assert_eq!(SecurityId::parse(""), None);
    }

    #[test]
    fn entity_id_display() {
        assert_eq!(EntityId::from("buffett").to_string(), "buffett");
    }
}
