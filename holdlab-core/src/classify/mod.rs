//! Category classifier built as a layered fallback chain.
//!
//! Every lookup walks the same stages and stops at the first hit:
//! 1. **Registry**: curated identifier/ticker → category table
//! 2. **Catalog**: the security's own sector label, when it maps onto the
//!    canonical taxonomy (security lookups only)
//! 3. **Name table**: exact company (or holder) name → category
//! 4. **Keyword rules**: ordered `(keywords, category)` rules over the
//!    uppercased name; the first matching rule wins
//! 5. **Default** category
//!
//! The chain is a plain value. The sector breakdown and the institutional
//! ownership categorizer use the same [`Classifier`] type with different rule
//! sets ([`Classifier::sectors`], [`Classifier::institutions`]), so both
//! features share one lookup algorithm.

pub mod rules;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::Security;

/// Which stage of the chain produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Registry,
    Catalog,
    NameTable,
    Keyword,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: String,
    pub stage: Stage,
}

/// One keyword rule: matches when the uppercased name contains any keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub category: String,
    pub keywords: Vec<String>,
}

impl KeywordRule {
    pub fn new(category: &str, keywords: &[&str]) -> Self {
        Self {
            category: category.to_string(),
            keywords: keywords.iter().map(|k| k.to_ascii_uppercase()).collect(),
        }
    }

    /// `upper_name` must already be uppercased.
    pub fn matches(&self, upper_name: &str) -> bool {
        self.keywords.iter().any(|k| upper_name.contains(k.as_str()))
    }
}

/// Ordered fallback chain. Deterministic and total: `classify` always
/// returns a category.
#[derive(Debug, Clone)]
pub struct Classifier {
    registry: HashMap<String, String>,
    names: HashMap<String, String>,
    rules: Vec<KeywordRule>,
    aliases: HashMap<String, String>,
    default: String,
}

impl Classifier {
    /// An empty chain that classifies everything as `default`.
    pub fn new(default: &str) -> Self {
        Self {
            registry: HashMap::new(),
            names: HashMap::new(),
            rules: Vec::new(),
            aliases: HashMap::new(),
            default: default.to_string(),
        }
    }

    /// Sector taxonomy: name table of large caps, sector keyword rules,
    /// provider-label aliases, default `"Other"`.
    pub fn sectors() -> Self {
        let mut c = Self::new(rules::DEFAULT_SECTOR);
        for (name, sector) in rules::SECTOR_NAME_TABLE {
            c.names.insert(name_key(name), sector.to_string());
        }
        for (label, canonical) in rules::SECTOR_ALIASES {
            c.aliases.insert(label.to_ascii_uppercase(), canonical.to_string());
        }
        c.rules = rules::sector_rules();
        c
    }

    /// Holder-category taxonomy for ownership roll-ups, default
    /// `"Other Institutions"`.
    pub fn institutions() -> Self {
        let mut c = Self::new(rules::DEFAULT_INSTITUTION);
        c.rules = rules::institution_rules();
        c
    }

    /// Register a curated identifier or ticker → category entry.
    pub fn register(&mut self, key: &str, category: &str) {
        self.registry
            .insert(key.trim().to_ascii_uppercase(), category.to_string());
    }

    pub fn with_registry_entry(mut self, key: &str, category: &str) -> Self {
        self.register(key, category);
        self
    }

    pub fn with_name(mut self, name: &str, category: &str) -> Self {
        self.names.insert(name_key(name), category.to_string());
        self
    }

    /// Append a keyword rule after the existing ones.
    pub fn with_rule(mut self, rule: KeywordRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }

    pub fn default_category(&self) -> &str {
        &self.default
    }

    /// Map a provider label (e.g. `"Financial Services"`) onto the canonical
    /// taxonomy. `None` for labels the taxonomy does not know.
    pub fn normalize(&self, label: &str) -> Option<&str> {
        self.aliases
            .get(&label.trim().to_ascii_uppercase())
            .map(String::as_str)
    }

    /// Classify by name and optional ticker.
    pub fn classify(&self, name: &str, ticker: Option<&str>) -> Classification {
        if let Some(category) = ticker.and_then(|t| self.registry_lookup(t)) {
            return hit(category, Stage::Registry);
        }
        self.classify_name(name)
    }

    /// Classify a resolved security. Curated registry entries for its
    /// identifier or ticker win, then a recognised catalog sector, then the
    /// name-based stages.
    pub fn classify_security(&self, security: &Security) -> Classification {
        let curated = self
            .registry_lookup(security.identifier.as_str())
            .or_else(|| security.ticker.as_deref().and_then(|t| self.registry_lookup(t)));
        if let Some(category) = curated {
            return hit(category, Stage::Registry);
        }
        if security.has_known_sector() {
            if let Some(category) = self.normalize(&security.sector) {
                return hit(category, Stage::Catalog);
            }
        }
        self.classify_name(&security.name)
    }

    fn registry_lookup(&self, key: &str) -> Option<&str> {
        self.registry
            .get(&key.trim().to_ascii_uppercase())
            .map(String::as_str)
    }

    fn classify_name(&self, name: &str) -> Classification {
        let key = name_key(name);
        if let Some(category) = self.names.get(&key) {
            return hit(category, Stage::NameTable);
        }
        if let Some(rule) = self.rules.iter().find(|r| r.matches(&key)) {
            return hit(&rule.category, Stage::Keyword);
        }
        hit(&self.default, Stage::Default)
    }
}

fn hit(category: &str, stage: Stage) -> Classification {
    Classification {
        category: category.to_string(),
        stage,
    }
}

/// Uppercase with whitespace runs collapsed, so `"Apple  Inc"` and
/// `"APPLE INC"` share a key.
fn name_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SecurityId;

    #[test]
    fn registry_beats_name_table_and_keywords() {
        let c = Classifier::sectors().with_registry_entry("BAC", "Custom Bucket");
        let got = c.classify("BANK OF AMERICA CORP", Some("bac"));
        assert_eq!(got.category, "Custom Bucket");
        assert_eq!(got.stage, Stage::Registry);
    }

    #[test]
    fn name_table_beats_keywords() {
        // "MEDICAL" would hit Healthcare, but the name table says otherwise.
        let c = Classifier::sectors().with_name("Medical Properties Trust", "Real Estate");
        let got = c.classify("MEDICAL PROPERTIES TRUST", None);
        assert_eq!(got.category, "Real Estate");
        assert_eq!(got.stage, Stage::NameTable);
    }

    #[test]
    fn name_table_is_case_and_space_insensitive() {
        let c = Classifier::sectors();
        let got = c.classify("UnitedHealth  Group Inc", None);
        assert_eq!(got.category, "Healthcare");
        assert_eq!(got.stage, Stage::NameTable);
    }

    #[test]
    fn first_matching_keyword_rule_wins() {
        let c = Classifier::sectors();
        // Contains both TECH (Technology) and HEALTH (Healthcare); Technology
        // is earlier in the rule list.
        assert_eq!(c.classify("HEALTHTECH SOLUTIONS", None).category, "Technology");
        // BANK (Financials) precedes TECH.
        assert_eq!(c.classify("TECH BANK HOLDINGS", None).category, "Financials");
    }

    #[test]
    fn unmatched_name_falls_to_default() {
        let got = Classifier::sectors().classify("ZYX HOLDINGS", None);
        assert_eq!(got.category, "Other");
        assert_eq!(got.stage, Stage::Default);
    }

    #[test]
    fn catalog_sector_is_normalized() {
        let c = Classifier::sectors();
        let sec = Security::new(SecurityId::new("060505104"), Some("BAC".into()), "BANK AMER CORP")
            .with_sector("Financial Services");
        let got = c.classify_security(&sec);
        assert_eq!(got.category, "Financials");
        assert_eq!(got.stage, Stage::Catalog);
    }

    #[test]
    fn registry_beats_catalog_sector() {
        let c = Classifier::sectors().with_registry_entry("037833100", "Communication Services");
        let sec = Security::new(SecurityId::new("037833100"), Some("AAPL".into()), "APPLE INC")
            .with_sector("Technology");
        let got = c.classify_security(&sec);
        assert_eq!(got.category, "Communication Services");
        assert_eq!(got.stage, Stage::Registry);

        // Ticker entries also outrank the catalog label.
        let c = Classifier::sectors().with_registry_entry("aapl", "Communication Services");
        assert_eq!(c.classify_security(&sec).stage, Stage::Registry);
    }

    #[test]
    fn unrecognised_catalog_sector_continues_down_the_chain() {
        let c = Classifier::sectors();
        let sec = Security::new(SecurityId::new("320209109"), None, "FIRST BANK CORP")
            .with_sector("Conglomerates");
        let got = c.classify_security(&sec);
        assert_eq!(got.category, "Financials");
        assert_eq!(got.stage, Stage::Keyword);
        assert!(rules::CANONICAL_SECTORS.contains(&got.category.as_str()));

        let odd = Security::new(SecurityId::new("999999999"), None, "ZYX HOLDINGS")
            .with_sector("Conglomerates");
        assert_eq!(c.classify_security(&odd).category, "Other");
    }

    #[test]
    fn unknown_catalog_sector_falls_through_to_name() {
        let c = Classifier::sectors();
        let sec = Security::new(SecurityId::new("166764100"), None, "CHEVRON CORP NEW");
        assert_eq!(c.classify_security(&sec).category, "Energy");
    }

    #[test]
    fn registry_by_identifier() {
        let c = Classifier::sectors().with_registry_entry("g0176j109", "Industrials");
        let sec = Security::new(SecurityId::new("G0176J109"), None, "ALLEGION PLC");
        let got = c.classify_security(&sec);
        assert_eq!(got.category, "Industrials");
        assert_eq!(got.stage, Stage::Registry);
    }

    #[test]
    fn normalize_maps_known_labels_only() {
        let c = Classifier::sectors();
        assert_eq!(c.normalize(" health care "), Some("Healthcare"));
        assert_eq!(c.normalize("Conglomerates"), None);
    }

    #[test]
    fn institution_rules_follow_order() {
        let c = Classifier::institutions();
        assert_eq!(c.classify("Vanguard Group Inc", None).category, "Mutual Funds");
        assert_eq!(c.classify("iShares Trust", None).category, "ETFs");
        assert_eq!(c.classify("Bridgewater Capital", None).category, "Investment Advisors");
        assert_eq!(c.classify("CalPERS", None).category, "Pension Funds");
        assert_eq!(c.classify("MetLife Inc", None).category, "Insurance Companies");
        assert_eq!(c.classify("Norges Bank", None).category, "Other Institutions");
        // "FUND" precedes "PENSION": order is part of the contract.
        assert_eq!(c.classify("Pension Fund of Ohio", None).category, "Mutual Funds");
    }

    #[test]
    fn classify_is_total() {
        let c = Classifier::new("Bucket");
        assert_eq!(c.classify("", None).category, "Bucket");
    }
}
