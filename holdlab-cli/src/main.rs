//! HoldLab CLI: merge filings, diff quarters, and rank trending securities.
//!
//! Commands:
//! - `merge`: merge one filing document into a snapshot
//! - `diff`: latest transition for one entity
//! - `breakdown`: sector breakdown, concentration and turnover for one entity
//! - `ownership`: who owns a security across tracked entities
//! - `trending`: cross-entity ranking, optionally saved as a JSON/CSV report

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use holdlab_core::domain::{EntityId, Snapshot, TrendDirection};
use holdlab_core::{Classifier, SecurityRef, Transition};
use holdlab_runner::report::{export_trending_csv, save_json};
use holdlab_runner::{
    load_catalog, load_prices, load_registry, load_shares_outstanding, EngineConfig,
    FilingDirectoryLoader, FilingDocument, HoldingsEngine, TrendingAnalysis, TrendingReport,
};

#[derive(Parser)]
#[command(
    name = "holdlab",
    about = "HoldLab CLI: quarterly holdings snapshots, diffs and cross-entity trends"
)]
struct Cli {
    /// Engine config TOML. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level logging (overridden by RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Inputs shared by every archive-backed command.
#[derive(Args)]
struct DataArgs {
    /// Filing archive laid out as <data>/<entity>/<period>.json.
    #[arg(long, default_value = "data/filings")]
    data: PathBuf,

    /// Security catalog CSV (identifier,ticker,name,sector).
    #[arg(long, default_value = "data/catalog.csv")]
    catalog: PathBuf,

    /// Last-price CSV (identifier,price); values fully sold positions.
    #[arg(long)]
    prices: Option<PathBuf>,

    /// Shares-outstanding CSV (identifier,shares_outstanding).
    #[arg(long)]
    shares: Option<PathBuf>,

    /// Sector registry CSV (key,category) consulted before name rules.
    #[arg(long)]
    registry: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge one filing document into a snapshot and print it.
    Merge {
        /// Filing JSON file.
        filing: PathBuf,

        /// Entity the filing belongs to. Defaults to the parent directory name.
        #[arg(long)]
        entity: Option<String>,

        /// Security catalog CSV.
        #[arg(long, default_value = "data/catalog.csv")]
        catalog: PathBuf,

        /// Print the snapshot as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Diff the latest two snapshots of one entity.
    Diff {
        entity: String,

        #[command(flatten)]
        data: DataArgs,

        /// Include stable positions in the listing.
        #[arg(long, default_value_t = false)]
        all: bool,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Sector breakdown and history statistics for one entity.
    Breakdown {
        entity: String,

        #[command(flatten)]
        data: DataArgs,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Ownership breakdown of one security across tracked entities.
    Ownership {
        /// Ticker, or identifier with --by-id.
        security: String,

        /// Treat SECURITY as an identifier (CUSIP) instead of a ticker.
        #[arg(long, default_value_t = false)]
        by_id: bool,

        #[command(flatten)]
        data: DataArgs,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Rank securities by coordinated activity across entities.
    Trending {
        #[command(flatten)]
        data: DataArgs,

        /// Number of securities to return.
        #[arg(long, default_value_t = 25)]
        top: usize,

        /// Write the stamped JSON report here.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write a CSV of the ranking here.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Merge {
            filing,
            entity,
            catalog,
            json,
        } => run_merge(&filing, entity, &catalog, json),
        Commands::Diff {
            entity,
            data,
            all,
            json,
        } => run_diff(config, &data, &entity, all, json),
        Commands::Breakdown { entity, data, json } => run_breakdown(config, &data, &entity, json),
        Commands::Ownership {
            security,
            by_id,
            data,
            json,
        } => run_ownership(config, &data, &security, by_id, json),
        Commands::Trending {
            data,
            top,
            output,
            csv,
        } => run_trending(config, &data, top, output, csv),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_engine(config: EngineConfig, data: &DataArgs) -> Result<HoldingsEngine> {
    if !data.data.is_dir() {
        bail!("filing archive not found: {}", data.data.display());
    }
    let catalog = Arc::new(
        load_catalog(&data.catalog)
            .with_context(|| format!("failed to load catalog {}", data.catalog.display()))?,
    );
    info!(securities = catalog.len(), "loaded security catalog");

    let loader = FilingDirectoryLoader::new(&data.data, catalog.clone());
    let mut engine = HoldingsEngine::new(config, Arc::new(loader), catalog);

    if let Some(path) = &data.prices {
        engine = engine.with_prices(Arc::new(load_prices(path)?));
    }
    if let Some(path) = &data.shares {
        engine = engine.with_shares_outstanding(Arc::new(load_shares_outstanding(path)?));
    }
    if let Some(path) = &data.registry {
        let mut sectors = Classifier::sectors();
        let n = load_registry(path, &mut sectors)?;
        info!(entries = n, "loaded sector registry");
        engine = engine.with_sector_classifier(sectors);
    }
    Ok(engine)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn fmt_money(v: f64) -> String {
    let abs = v.abs();
    let sign = if v < 0.0 { "-" } else { "" };
    if abs >= 1e9 {
        format!("{sign}${:.2}B", abs / 1e9)
    } else if abs >= 1e6 {
        format!("{sign}${:.2}M", abs / 1e6)
    } else if abs >= 1e3 {
        format!("{sign}${:.1}K", abs / 1e3)
    } else {
        format!("{sign}${abs:.0}")
    }
}

// ── Commands ──

fn run_merge(filing: &Path, entity: Option<String>, catalog: &Path, json: bool) -> Result<()> {
    let entity = match entity {
        Some(e) => EntityId::new(e),
        None => filing
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| EntityId::new(n.to_string_lossy()))
            .context("cannot infer entity from filing path; pass --entity")?,
    };
    let catalog = Arc::new(load_catalog(catalog)?);
    let loader = FilingDirectoryLoader::new(
        filing.parent().unwrap_or_else(|| Path::new(".")),
        catalog.clone(),
    );
    let doc = FilingDocument::from_file(filing)?;
    let snapshot = loader.load_filing(&entity, filing)?;
    info!(
        entity = %entity,
        period = %snapshot.period(),
        raw_items = doc.positions.len(),
        positions = snapshot.len(),
        "merged filing"
    );

    if json {
        return print_json(&snapshot);
    }
    print_snapshot(&snapshot);
    Ok(())
}

fn print_snapshot(snapshot: &Snapshot) {
    println!(
        "{} {} (as of {}): {} positions, {}",
        snapshot.entity_id(),
        snapshot.period(),
        snapshot.as_of(),
        snapshot.len(),
        fmt_money(snapshot.total_value())
    );
    for p in snapshot.by_value_desc() {
        println!(
            "  {:<10} {:<32} {:>14} sh {:>12}",
            p.security.identifier.as_str(),
            p.security.display_label(),
            p.shares,
            fmt_money(p.market_value)
        );
    }
}

fn run_diff(config: EngineConfig, data: &DataArgs, entity: &str, all: bool, json: bool) -> Result<()> {
    let engine = build_engine(config, data)?;
    let tr = engine.diff_entity(&EntityId::from(entity))?;
    if json {
        return print_json(&tr);
    }
    print_transition(&tr, all);
    Ok(())
}

fn print_transition(tr: &Transition, all: bool) {
    let from = tr
        .previous_period
        .as_ref()
        .map_or_else(|| "(none)".to_string(), |p| p.to_string());
    println!("{}: {} -> {}", tr.entity_id, from, tr.current_period);
    if tr.is_spliced() {
        let skipped: Vec<String> = tr.skipped_periods.iter().map(|p| p.to_string()).collect();
        println!("  spans dropped filings: {}", skipped.join(", "));
    }
    let s = &tr.summary;
    println!(
        "  new {}  increased {}  decreased {}  sold {}  stable {}  major {}",
        s.new_positions, s.increased, s.decreased, s.sold_positions, s.stable, s.major_moves
    );
    println!(
        "  portfolio {} -> {} ({})",
        fmt_money(s.previous_total_value),
        fmt_money(s.current_total_value),
        fmt_money(s.portfolio_value_change)
    );
    for t in tr.trends.iter().filter(|t| all || t.direction != TrendDirection::Stable) {
        let value = t.value_delta.map_or_else(|| "n/a".to_string(), fmt_money);
        let flag = if t.is_major_move {
            "!!"
        } else if t.is_significant {
            "!"
        } else {
            ""
        };
        println!(
            "  {:<9} {:<10} {:<32} {:>+14} sh {:>12} {}",
            t.direction.label(),
            t.security.identifier.as_str(),
            t.security.display_label(),
            t.share_delta,
            value,
            flag
        );
    }
}

fn run_breakdown(config: EngineConfig, data: &DataArgs, entity: &str, json: bool) -> Result<()> {
    let engine = build_engine(config, data)?;
    let b = engine.entity_breakdown(&EntityId::from(entity))?;
    if json {
        return print_json(&b);
    }
    let p = &b.portfolio;
    println!("{} {}: {}", p.entity_id, p.period, fmt_money(p.total_value));
    println!("  top-10 concentration {:.1}%", p.top10_percentage);
    println!(
        "  {} periods, avg holding {:.1} quarters, avg turnover {:.1}%",
        b.stats.periods, b.stats.average_holding_period, b.stats.average_turnover
    );
    for s in &p.sectors {
        println!(
            "  {:<24} {:>12} {:>6.2}% ({} positions)",
            s.sector,
            fmt_money(s.value),
            s.percentage,
            s.count
        );
    }
    Ok(())
}

fn run_ownership(
    config: EngineConfig,
    data: &DataArgs,
    security: &str,
    by_id: bool,
    json: bool,
) -> Result<()> {
    if data.shares.is_none() {
        bail!("ownership needs a shares-outstanding table; pass --shares");
    }
    let engine = build_engine(config, data)?;
    let key = if by_id {
        SecurityRef::Identifier(security)
    } else {
        SecurityRef::Ticker(security)
    };
    let b = engine.ownership_for(key)?;
    if json {
        return print_json(&b);
    }
    println!(
        "{} ({} shares outstanding)",
        b.security.display_label(),
        b.shares_outstanding
    );
    println!(
        "  tracked institutions {:.2}%, public & other {:.2}%",
        b.institutional_percentage, b.public_and_other_percentage
    );
    if b.drift {
        println!("  warning: categories sum to {:.2}%", b.category_sum);
    }
    for c in &b.categories {
        println!("  {:<24} {:>6.2}%", c.category, c.percentage);
    }
    for h in &b.top_holders {
        println!(
            "  {:<32} {:<22} {:>14} sh {:>6.2}%",
            h.holder, h.category, h.shares, h.percentage
        );
    }
    Ok(())
}

fn run_trending(
    config: EngineConfig,
    data: &DataArgs,
    top: usize,
    output: Option<PathBuf>,
    csv: Option<PathBuf>,
) -> Result<()> {
    if top == 0 {
        bail!("--top must be at least 1");
    }
    let engine = build_engine(config, data)?;
    let analysis = engine.trending_securities(top)?;
    print_trending(&analysis);

    if let Some(path) = csv {
        let body = export_trending_csv(&analysis)?;
        std::fs::write(&path, body)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("CSV saved to: {}", path.display());
    }
    if let Some(path) = output {
        let report = TrendingReport::new(analysis, engine.config(), top);
        save_json(&report, &path)?;
        println!("Report saved to: {}", path.display());
    }
    Ok(())
}

fn print_trending(analysis: &TrendingAnalysis) {
    let s = &analysis.summary;
    let latest = s
        .latest_period
        .as_ref()
        .map_or_else(|| "-".to_string(), |p| p.to_string());
    println!(
        "{} of {} entities analyzed (latest period {}), {} candidates: {} bullish, {} bearish, {} mixed",
        s.entities_analyzed, s.entities_tracked, latest, s.candidates, s.bullish, s.bearish, s.mixed
    );
    if s.spliced_transitions > 0 {
        println!(
            "  {} transition(s) span dropped filings",
            s.spliced_transitions
        );
    }
    for (i, t) in analysis.securities.iter().enumerate() {
        println!(
            "  {:>3}. {:<10} {:<32} {:>3} entities {:>12} {:<8} {:>8.2} {:?}",
            i + 1,
            t.security.identifier.as_str(),
            t.security.display_label(),
            t.total_entities_involved,
            fmt_money(t.total_value_change),
            format!("{:?}", t.sentiment).to_lowercase(),
            t.trending_score,
            t.priority
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn money_formatting() {
        assert_eq!(fmt_money(2.5e9), "$2.50B");
        assert_eq!(fmt_money(-1.25e6), "-$1.25M");
        assert_eq!(fmt_money(1_500.0), "$1.5K");
        assert_eq!(fmt_money(12.0), "$12");
    }

    #[test]
    fn parses_trending_with_global_flags() {
        let cli = Cli::try_parse_from([
            "holdlab", "trending", "--top", "5", "--prices", "p.csv", "--config", "c.toml", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
        match cli.command {
            Commands::Trending { top, data, .. } => {
                assert_eq!(top, 5);
                assert_eq!(data.prices, Some(PathBuf::from("p.csv")));
            }
            _ => panic!("expected trending"),
        }
    }
}
