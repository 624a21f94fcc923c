//! HoldLab Runner: configuration, file-backed inputs, and cross-entity runs.
//!
//! This crate builds on `holdlab-core` to provide:
//! - TOML engine configuration with a provenance fingerprint
//! - Filing-directory and in-memory snapshot loaders
//! - CSV reference data (catalog, prices, shares outstanding, registry)
//! - Parallel cross-entity trend aggregation on a bounded worker pool
//! - The `HoldingsEngine` facade over all of the above
//! - JSON and CSV report export

pub mod aggregator;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod loader;
pub mod report;

pub use aggregator::{
    aggregate, ActiveEntity, AggregateError, AggregatorConfig, EntityAction, Priority, Sentiment,
    TrendAggregator, TrendingAnalysis, TrendingSecurity, TrendingSummary,
};
pub use catalog::{load_catalog, load_prices, load_registry, load_shares_outstanding};
pub use config::{ConfigError, EngineConfig};
pub use engine::{EngineError, EntityBreakdown, HoldingsEngine};
pub use loader::{
    combine_digests, history_digest, FilingDirectoryLoader, FilingDocument, InMemoryLoader,
    LoadError, SnapshotLoader,
};
pub use report::{TrendingReport, SCHEMA_VERSION};
