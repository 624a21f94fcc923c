//! Portfolio analytics: sector breakdown, concentration, holding period and
//! turnover.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::classify::Classifier;
use crate::domain::{EntityId, History, PeriodKey, SecurityId, Snapshot};
use crate::ownership::{portfolio_weights, WeightedPosition};

/// Positions counted in the concentration figure.
pub const TOP_N_CONCENTRATION: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorSlice {
    pub sector: String,
    pub value: f64,
    pub percentage: f64,
    pub count: usize,
}

/// Sector and weight report for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioBreakdown {
    pub entity_id: EntityId,
    pub period: PeriodKey,
    pub total_value: f64,
    /// Largest first.
    pub positions: Vec<WeightedPosition>,
    /// Largest first.
    pub sectors: Vec<SectorSlice>,
    /// Share of total value held in the ten largest positions.
    pub top10_percentage: f64,
}

pub fn portfolio_breakdown(snapshot: &Snapshot, classifier: &Classifier) -> PortfolioBreakdown {
    let total = snapshot.total_value();
    let positions = portfolio_weights(snapshot);

    let mut by_sector: HashMap<String, (f64, usize)> = HashMap::new();
    for p in &positions {
        let sector = classifier.classify_security(&p.security).category;
        let slot = by_sector.entry(sector).or_insert((0.0, 0));
        slot.0 += p.market_value;
        slot.1 += 1;
    }
    let mut sectors: Vec<SectorSlice> = by_sector
        .into_iter()
        .map(|(sector, (value, count))| SectorSlice {
            sector,
            percentage: share_of(value, total),
            value,
            count,
        })
        .collect();
    sectors.sort_by(|a, b| b.value.total_cmp(&a.value).then_with(|| a.sector.cmp(&b.sector)));

    let top_value: f64 = positions
        .iter()
        .take(TOP_N_CONCENTRATION)
        .map(|p| p.market_value)
        .sum();

    PortfolioBreakdown {
        entity_id: snapshot.entity_id().clone(),
        period: snapshot.period().clone(),
        total_value: total,
        top10_percentage: share_of(top_value, total),
        positions,
        sectors,
    }
}

fn share_of(value: f64, total: f64) -> f64 {
    if total > 0.0 {
        value / total * 100.0
    } else {
        0.0
    }
}

// ── History statistics ──

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub periods: usize,
    /// Mean number of periods between a security's first and last
    /// appearance, inclusive.
    pub average_holding_period: f64,
    /// Mean per-transition turnover, in percent.
    pub average_turnover: f64,
}

/// Both figures are 0 for a history with fewer than two snapshots.
pub fn history_stats(history: &History) -> HistoryStats {
    let snapshots = history.snapshots();
    if snapshots.len() < 2 {
        return HistoryStats {
            periods: snapshots.len(),
            ..HistoryStats::default()
        };
    }
    HistoryStats {
        periods: snapshots.len(),
        average_holding_period: average_holding_period(snapshots),
        average_turnover: average_turnover(history),
    }
}

fn average_holding_period(snapshots: &[Snapshot]) -> f64 {
    let mut seen: HashMap<&SecurityId, (usize, usize)> = HashMap::new();
    for (idx, snap) in snapshots.iter().enumerate() {
        for p in snap.positions() {
            seen.entry(&p.security.identifier)
                .and_modify(|span| span.1 = idx)
                .or_insert((idx, idx));
        }
    }
    if seen.is_empty() {
        return 0.0;
    }
    let total: usize = seen.values().map(|(first, last)| last - first + 1).sum();
    total as f64 / seen.len() as f64
}

/// Half the traded value over the average portfolio value, per transition.
/// Transitions where both sides are worth nothing are skipped.
fn average_turnover(history: &History) -> f64 {
    let mut sum = 0.0;
    let mut counted = 0usize;
    for (prev, cur) in history.transitions() {
        let avg_value = (prev.total_value() + cur.total_value()) / 2.0;
        if avg_value <= 0.0 {
            continue;
        }
        let mut traded: f64 = cur
            .positions()
            .iter()
            .map(|p| {
                let before = prev
                    .position(&p.security.identifier)
                    .map_or(0.0, |q| q.market_value);
                (p.market_value - before).abs()
            })
            .sum();
        traded += prev
            .positions()
            .iter()
            .filter(|p| !cur.holds(&p.security.identifier))
            .map(|p| p.market_value)
            .sum::<f64>();
        sum += traded / 2.0 / avg_value;
        counted += 1;
    }
    if counted == 0 {
        0.0
    } else {
        sum / counted as f64 * 100.0
    }
}
