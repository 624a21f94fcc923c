//! Snapshot loaders: where entity histories come from.
//!
//! [`FilingDirectoryLoader`] reads an archive laid out as
//! `<root>/<entity>/<period>.json`, one filing document per file, and merges
//! each filing through the position merge engine. [`InMemoryLoader`] serves
//! prebuilt histories (tests, benches, embedding callers).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use holdlab_core::domain::{
    EntityId, History, HistoryError, PeriodKey, PeriodKeyError, RawLineItem, Snapshot,
};
use holdlab_core::{merge_line_items, MergeError, SecurityCatalog};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse filing {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("bad period key in {path}: {source}")]
    Period {
        path: PathBuf,
        source: PeriodKeyError,
    },

    #[error("filing {path} has no date and period {period} is not a calendar quarter")]
    MissingDate { path: PathBuf, period: PeriodKey },

    #[error("merge {path}: {source}")]
    Merge { path: PathBuf, source: MergeError },

    #[error("read table {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("{path} line {line}: {reason}")]
    InvalidRow {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),

    #[error(transparent)]
    History(#[from] HistoryError),
}

/// Source of entity histories.
pub trait SnapshotLoader: Send + Sync {
    /// Every tracked entity, sorted.
    fn list_entities(&self) -> Result<Vec<EntityId>, LoadError>;

    /// One entity's snapshots in period order.
    fn load_history(&self, entity: &EntityId) -> Result<History, LoadError>;
}

// ── Filing documents ──

/// One filing as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilingDocument {
    #[serde(default)]
    pub form: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub quarter_key: Option<String>,
    #[serde(default)]
    pub positions: Vec<RawLineItem>,
}

impl FilingDocument {
    pub fn from_file(path: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The filing's period: `quarterKey` if present, else the file stem.
    pub fn period(&self, path: &Path) -> Result<PeriodKey, LoadError> {
        let raw = self
            .quarter_key
            .clone()
            .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_default();
        PeriodKey::parse(&raw).map_err(|source| LoadError::Period {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Filing date, falling back to the period's quarter end.
    pub fn as_of(&self, period: &PeriodKey, path: &Path) -> Result<NaiveDate, LoadError> {
        self.date
            .or_else(|| period.quarter_end())
            .ok_or_else(|| LoadError::MissingDate {
                path: path.to_path_buf(),
                period: period.clone(),
            })
    }
}

// ── Directory-backed loader ──

pub struct FilingDirectoryLoader {
    root: PathBuf,
    catalog: Arc<dyn SecurityCatalog>,
}

impl FilingDirectoryLoader {
    pub fn new(root: impl Into<PathBuf>, catalog: Arc<dyn SecurityCatalog>) -> Self {
        Self {
            root: root.into(),
            catalog,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read and merge one filing file into a snapshot for `entity`.
    pub fn load_filing(&self, entity: &EntityId, path: &Path) -> Result<Snapshot, LoadError> {
        let doc = FilingDocument::from_file(path)?;
        let period = doc.period(path)?;
        let as_of = doc.as_of(&period, path)?;
        let outcome = merge_line_items(entity, &period, as_of, &doc.positions, self.catalog.as_ref())
            .map_err(|source| LoadError::Merge {
                path: path.to_path_buf(),
                source,
            })?;
        if !outcome.rejected.is_empty() || outcome.duplicates_merged > 0 {
            debug!(
                entity = %entity,
                period = %period,
                rejected = outcome.rejected.len(),
                duplicates_merged = outcome.duplicates_merged,
                "merged filing"
            );
        }
        Ok(outcome.snapshot)
    }

    fn filing_paths(&self, dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
        let entries = std::fs::read_dir(dir).map_err(|source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| LoadError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

impl SnapshotLoader for FilingDirectoryLoader {
    fn list_entities(&self) -> Result<Vec<EntityId>, LoadError> {
        let entries = std::fs::read_dir(&self.root).map_err(|source| LoadError::Io {
            path: self.root.clone(),
            source,
        })?;
        let mut entities = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| LoadError::Io {
                path: self.root.clone(),
                source,
            })?;
            if entry.path().is_dir() {
                entities.push(EntityId::new(entry.file_name().to_string_lossy()));
            }
        }
        entities.sort();
        Ok(entities)
    }

    /// Filings that merge to nothing at all (every line malformed) are
    /// skipped with a warning and recorded as skipped periods on the
    /// history; any other failure aborts the entity.
    fn load_history(&self, entity: &EntityId) -> Result<History, LoadError> {
        let dir = self.root.join(entity.as_str());
        if !dir.is_dir() {
            return Err(LoadError::UnknownEntity(entity.clone()));
        }

        let mut snapshots = Vec::new();
        let mut skipped = Vec::new();
        for path in self.filing_paths(&dir)? {
            match self.load_filing(entity, &path) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(LoadError::Merge {
                    path,
                    source: MergeError::EmptySnapshot { period, count, .. },
                }) => {
                    warn!(
                        entity = %entity,
                        period = %period,
                        path = %path.display(),
                        malformed = count,
                        "skipping empty filing"
                    );
                    skipped.push(period);
                }
                Err(e) => return Err(e),
            }
        }
        snapshots.sort_by(|a, b| a.period().cmp(b.period()));
        let mut history = History::from_snapshots(entity.clone(), snapshots)?;
        for period in skipped {
            history.record_skipped(period);
        }
        Ok(history)
    }
}

// ── In-memory loader ──

#[derive(Debug, Clone, Default)]
pub struct InMemoryLoader {
    histories: BTreeMap<EntityId, History>,
}

impl InMemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, history: History) {
        self.histories.insert(history.entity_id().clone(), history);
    }

    pub fn len(&self) -> usize {
        self.histories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }
}

impl FromIterator<History> for InMemoryLoader {
    fn from_iter<I: IntoIterator<Item = History>>(iter: I) -> Self {
        let mut loader = Self::new();
        for h in iter {
            loader.insert(h);
        }
        loader
    }
}

impl SnapshotLoader for InMemoryLoader {
    fn list_entities(&self) -> Result<Vec<EntityId>, LoadError> {
        Ok(self.histories.keys().cloned().collect())
    }

    fn load_history(&self, entity: &EntityId) -> Result<History, LoadError> {
        self.histories
            .get(entity)
            .cloned()
            .ok_or_else(|| LoadError::UnknownEntity(entity.clone()))
    }
}

// ── Dataset fingerprint ──

/// BLAKE3 digest of one history: entity, then every snapshot's period, date
/// and positions in identifier order, then the skipped periods.
pub fn history_digest(history: &History) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(history.entity_id().as_str().as_bytes());
    for snap in history.snapshots() {
        hasher.update(snap.period().as_str().as_bytes());
        hasher.update(snap.as_of().to_string().as_bytes());
        for p in snap.positions() {
            hasher.update(p.security.identifier.as_str().as_bytes());
            hasher.update(&p.shares.to_le_bytes());
            hasher.update(&p.market_value.to_le_bytes());
        }
    }
    for period in history.skipped_periods() {
        hasher.update(b"skipped:");
        hasher.update(period.as_str().as_bytes());
    }
    *hasher.finalize().as_bytes()
}

/// Combine per-entity digests into one dataset hash, independent of the
/// order they were computed in.
pub fn combine_digests(mut digests: Vec<(EntityId, [u8; 32])>) -> String {
    digests.sort_by(|a, b| a.0.cmp(&b.0));
    let mut hasher = blake3::Hasher::new();
    for (entity, digest) in &digests {
        hasher.update(entity.as_str().as_bytes());
        hasher.update(digest);
    }
    hasher.finalize().to_hex().to_string()
}
