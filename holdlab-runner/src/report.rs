//! Trending report export: JSON with provenance, CSV for spreadsheets.
//!
//! The JSON report carries a `schema_version`, the config fingerprint and the
//! dataset hash so a ranking can be traced back to its inputs. Unknown
//! (newer) schema versions are rejected on load.

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregator::TrendingAnalysis;
use crate::config::EngineConfig;

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    pub config_fingerprint: String,
    pub dataset_hash: String,
    pub top_n: usize,
    pub analysis: TrendingAnalysis,
}

impl TrendingReport {
    pub fn new(analysis: TrendingAnalysis, config: &EngineConfig, top_n: usize) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            config_fingerprint: config.fingerprint(),
            dataset_hash: analysis.dataset_hash.clone(),
            top_n,
            analysis,
        }
    }
}

// ── JSON ──

pub fn export_json(report: &TrendingReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize TrendingReport to JSON")
}

pub fn import_json(json: &str) -> Result<TrendingReport> {
    let report: TrendingReport =
        serde_json::from_str(json).context("failed to deserialize TrendingReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

pub fn save_json(report: &TrendingReport, path: &Path) -> Result<()> {
    let json = export_json(report)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

pub fn load_json(path: &Path) -> Result<TrendingReport> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

// ── CSV ──

/// One row per trending security.
///
/// Columns: rank, identifier, ticker, name, sector, entities, net_share_change,
/// total_value_change, buys, sells, sentiment, score, priority
pub fn export_trending_csv(analysis: &TrendingAnalysis) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "identifier",
        "ticker",
        "name",
        "sector",
        "entities",
        "net_share_change",
        "total_value_change",
        "buys",
        "sells",
        "sentiment",
        "score",
        "priority",
    ])?;
    for (i, s) in analysis.securities.iter().enumerate() {
        wtr.write_record([
            (i + 1).to_string(),
            s.security.identifier.to_string(),
            s.security.ticker.clone().unwrap_or_default(),
            s.security.name.clone(),
            s.security.sector.clone(),
            s.total_entities_involved.to_string(),
            s.net_share_change.to_string(),
            format!("{:.2}", s.total_value_change),
            s.buy_count.to_string(),
            s.sell_count.to_string(),
            format!("{:?}", s.sentiment).to_lowercase(),
            format!("{:.4}", s.trending_score),
            format!("{:?}", s.priority).to_lowercase(),
        ])?;
    }
    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{aggregate, AggregatorConfig};
    use holdlab_core::diff_transition;
    use holdlab_core::domain::{EntityId, PeriodKey, Position, Security, SecurityId, Snapshot};
    use holdlab_core::DiffConfig;

    fn analysis() -> TrendingAnalysis {
        let period = PeriodKey::quarter(2024, 2);
        let as_of = period.quarter_end().unwrap();
        let prev = Snapshot::empty(EntityId::from("e"), PeriodKey::quarter(2024, 1), as_of);
        let cur = Snapshot::new(
            EntityId::from("e"),
            period,
            as_of,
            vec![Position {
                security: Security::new(SecurityId::new("AAA"), Some("AAA".into()), "ALPHA, INC"),
                shares: 5_000,
                market_value: 2.5e9,
            }],
        )
        .unwrap();
        let tr = diff_transition(Some(&prev), &cur, &DiffConfig::default(), None);
        let mut a = aggregate(&[tr], &AggregatorConfig::default(), 10);
        a.dataset_hash = "abc".into();
        a
    }

    #[test]
    fn json_round_trip_keeps_provenance() {
        let cfg = EngineConfig::default();
        let report = TrendingReport::new(analysis(), &cfg, 10);
        let back = import_json(&export_json(&report).unwrap()).unwrap();
        assert_eq!(back, report);
        assert_eq!(back.config_fingerprint, cfg.fingerprint());
        assert_eq!(back.dataset_hash, "abc");
    }

    #[test]
    fn rejects_future_schema() {
        let mut report = TrendingReport::new(analysis(), &EngineConfig::default(), 10);
        report.schema_version = SCHEMA_VERSION + 1;
        let json = serde_json::to_string(&report).unwrap();
        assert!(import_json(&json).is_err());
    }

    #[test]
    fn csv_has_one_row_per_security() {
        let csv = export_trending_csv(&analysis()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("rank,identifier"));
        // The comma in the name is quoted.
        assert!(lines[1].contains("\"ALPHA, INC\""));
        assert!(lines[1].ends_with("bullish,22.5000,low"));
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trending.json");
        let report = TrendingReport::new(analysis(), &EngineConfig::default(), 3);
        save_json(&report, &path).unwrap();
        assert_eq!(load_json(&path).unwrap(), report);
    }
}
