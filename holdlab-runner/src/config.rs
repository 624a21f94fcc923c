//! Engine configuration loaded from TOML.
//!
//! Every field has a default, so an empty file is a valid configuration:
//!
//! ```toml
//! [diff]
//! relative_threshold = 0.01
//! absolute_share_floor = 1000
//! materiality_floor = 100000000.0
//!
//! [ownership]
//! drift_tolerance = 0.5
//!
//! [aggregator]
//! min_entities = 2
//! max_threads = 8
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use holdlab_core::{DiffConfig, OwnershipConfig};

use crate::aggregator::AggregatorConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub diff: DiffConfig,
    pub ownership: OwnershipConfig,
    pub aggregator: AggregatorConfig,
}

impl EngineConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.diff;
        let fractions = [
            ("diff.relative_threshold", d.relative_threshold),
            ("diff.absolute_relative_floor", d.absolute_relative_floor),
        ];
        for (name, v) in fractions {
            if !(v.is_finite() && (0.0..=1.0).contains(&v)) {
                return Err(ConfigError::Invalid(format!("{name} must be within [0, 1], got {v}")));
            }
        }
        let amounts = [
            ("diff.materiality_floor", d.materiality_floor),
            ("diff.major_move_value", d.major_move_value),
            ("diff.significant_value", d.significant_value),
            ("diff.significant_percent", d.significant_percent),
            ("ownership.drift_tolerance", self.ownership.drift_tolerance),
            ("ownership.min_category_percentage", self.ownership.min_category_percentage),
            ("aggregator.min_value_change", self.aggregator.min_value_change),
            ("aggregator.entity_weight", self.aggregator.entity_weight),
            ("aggregator.value_weight", self.aggregator.value_weight),
        ];
        for (name, v) in amounts {
            if !(v.is_finite() && v >= 0.0) {
                return Err(ConfigError::Invalid(format!("{name} must be non-negative, got {v}")));
            }
        }
        if self.aggregator.entity_weight <= 0.0 || self.aggregator.value_weight <= 0.0 {
            return Err(ConfigError::Invalid(
                "aggregator weights must be positive so the score grows with both factors".into(),
            ));
        }
        if self.aggregator.max_threads == Some(0) {
            return Err(ConfigError::Invalid("aggregator.max_threads must be at least 1".into()));
        }
        Ok(())
    }

    /// BLAKE3 hash of the canonical JSON form. Two configs with the same
    /// fingerprint classify every transition identically.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"));
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(format!("serialize: {e}")))
    }
}
