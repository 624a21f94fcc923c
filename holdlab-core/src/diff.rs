//! Snapshot diff engine.
//!
//! Compares two snapshots of the same entity and emits one [`Trend`] per
//! security present in either. Small share-count changes are treated as
//! filing noise: a held-in-both position only counts as activity when the
//! change clears both the relative threshold and the absolute floor.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::domain::{EntityId, History, PeriodKey, Position, Snapshot, Trend, TrendDirection};
use crate::provider::PriceProvider;

/// Slack for float comparisons at the threshold boundaries, so a change of
/// exactly 1% is not lost to rounding.
const EPS: f64 = 1e-9;

/// Noise thresholds and change-flag cutoffs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Minimum |Δshares| as a fraction of previous shares.
    pub relative_threshold: f64,
    /// Absolute floor in shares; the effective floor is the larger of this
    /// and `absolute_relative_floor × previous`.
    pub absolute_share_floor: u64,
    pub absolute_relative_floor: f64,
    /// Dollar value above which a first-seen position counts as new.
    pub materiality_floor: f64,
    pub major_move_value: f64,
    pub significant_value: f64,
    /// Percent (not fraction).
    pub significant_percent: f64,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            relative_threshold: 0.01,
            absolute_share_floor: 1_000,
            absolute_relative_floor: 0.001,
            materiality_floor: 100_000_000.0,
            major_move_value: 1_000_000_000.0,
            significant_value: 100_000_000.0,
            significant_percent: 10.0,
        }
    }
}

impl DiffConfig {
    /// Whether a change of `delta` shares on a `previous_shares` holding
    /// clears both noise thresholds.
    pub fn exceeds_noise(&self, previous_shares: u64, delta: i64) -> bool {
        let prev = previous_shares as f64;
        let abs = delta.unsigned_abs() as f64;
        let floor = (self.absolute_share_floor as f64).max(self.absolute_relative_floor * prev);
        abs + EPS >= self.relative_threshold * prev && abs + EPS >= floor
    }

    fn flag(&self, trend: &mut Trend) {
        if trend.direction == TrendDirection::Stable {
            return;
        }
        let abs_value = trend.abs_value_delta();
        trend.is_major_move = abs_value > self.major_move_value;
        // A new position is always +100% in shares, so only its value counts.
        let percent_move = trend.direction != TrendDirection::New
            && trend.share_percent_delta.abs() > self.significant_percent;
        trend.is_significant = percent_move || abs_value > self.significant_value;
    }
}

/// Diff two snapshots. `previous == None` means the entity has no earlier
/// filing; every position is then new if material and stable otherwise.
///
/// The result is sorted with major moves first, then by |value delta|
/// descending, then by identifier.
pub fn diff(
    previous: Option<&Snapshot>,
    current: &Snapshot,
    config: &DiffConfig,
    prices: Option<&dyn PriceProvider>,
) -> Vec<Trend> {
    let mut trends = Vec::with_capacity(current.len());

    for cur in current.positions() {
        let trend = match previous {
            None if cur.market_value > config.materiality_floor => opened(cur),
            None => unchanged(cur, 0, 0.0),
            Some(prev_snap) => match prev_snap.position(&cur.security.identifier) {
                None => opened(cur),
                Some(prev) => held(prev, cur, config),
            },
        };
        trends.push(trend);
    }

    if let Some(prev_snap) = previous {
        for prev in prev_snap.positions() {
            if !current.holds(&prev.security.identifier) {
                trends.push(sold(prev, prices));
            }
        }
    }

    for t in &mut trends {
        config.flag(t);
    }
    trends.sort_by(rank_order);
    trends
}

fn opened(cur: &Position) -> Trend {
    Trend {
        security: cur.security.clone(),
        direction: TrendDirection::New,
        previous_shares: 0,
        current_shares: cur.shares,
        previous_value: 0.0,
        current_value: cur.market_value,
        share_delta: to_signed(cur.shares),
        value_delta: Some(cur.market_value),
        share_percent_delta: 100.0,
        is_major_move: false,
        is_significant: false,
    }
}

fn unchanged(cur: &Position, previous_shares: u64, previous_value: f64) -> Trend {
    Trend {
        security: cur.security.clone(),
        direction: TrendDirection::Stable,
        previous_shares,
        current_shares: cur.shares,
        previous_value,
        current_value: cur.market_value,
        share_delta: 0,
        value_delta: Some(0.0),
        share_percent_delta: 0.0,
        is_major_move: false,
        is_significant: false,
    }
}

fn held(prev: &Position, cur: &Position, config: &DiffConfig) -> Trend {
    let delta = signed_delta(prev.shares, cur.shares);
    if delta == 0 || !config.exceeds_noise(prev.shares, delta) {
        return unchanged(cur, prev.shares, prev.market_value);
    }
    let direction = if delta > 0 {
        TrendDirection::Increased
    } else {
        TrendDirection::Decreased
    };
    Trend {
        security: cur.security.clone(),
        direction,
        previous_shares: prev.shares,
        current_shares: cur.shares,
        previous_value: prev.market_value,
        current_value: cur.market_value,
        share_delta: delta,
        value_delta: Some(cur.market_value - prev.market_value),
        share_percent_delta: delta as f64 / prev.shares as f64 * 100.0,
        is_major_move: false,
        is_significant: false,
    }
}

fn sold(prev: &Position, prices: Option<&dyn PriceProvider>) -> Trend {
    let value_delta = prices
        .and_then(|p| p.last_price(&prev.security))
        .map(|price| -(prev.shares as f64 * price));
    Trend {
        security: prev.security.clone(),
        direction: TrendDirection::Sold,
        previous_shares: prev.shares,
        current_shares: 0,
        previous_value: prev.market_value,
        current_value: 0.0,
        share_delta: -to_signed(prev.shares),
        value_delta,
        share_percent_delta: -100.0,
        is_major_move: false,
        is_significant: false,
    }
}

fn to_signed(shares: u64) -> i64 {
    i64::try_from(shares).unwrap_or(i64::MAX)
}

fn signed_delta(previous: u64, current: u64) -> i64 {
    let d = i128::from(current) - i128::from(previous);
    i64::try_from(d).unwrap_or(if d > 0 { i64::MAX } else { i64::MIN })
}

fn rank_order(a: &Trend, b: &Trend) -> Ordering {
    b.is_major_move
        .cmp(&a.is_major_move)
        .then_with(|| b.abs_value_delta().total_cmp(&a.abs_value_delta()))
        .then_with(|| a.security.identifier.cmp(&b.security.identifier))
}

// ── Transitions ──

/// Counts and totals for one transition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub new_positions: usize,
    pub sold_positions: usize,
    pub increased: usize,
    pub decreased: usize,
    pub stable: usize,
    pub major_moves: usize,
    pub previous_total_value: f64,
    pub current_total_value: f64,
    pub portfolio_value_change: f64,
}

impl DiffSummary {
    pub fn from_trends(trends: &[Trend], previous_total: f64, current_total: f64) -> Self {
        let mut s = Self {
            previous_total_value: previous_total,
            current_total_value: current_total,
            portfolio_value_change: current_total - previous_total,
            ..Self::default()
        };
        for t in trends {
            match t.direction {
                TrendDirection::New => s.new_positions += 1,
                TrendDirection::Sold => s.sold_positions += 1,
                TrendDirection::Increased => s.increased += 1,
                TrendDirection::Decreased => s.decreased += 1,
                TrendDirection::Stable => s.stable += 1,
            }
            if t.is_major_move {
                s.major_moves += 1;
            }
        }
        s
    }

    /// Number of non-stable trends.
    pub fn activity(&self) -> usize {
        self.new_positions + self.sold_positions + self.increased + self.decreased
    }
}

/// One entity's diffed transition between two periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub entity_id: EntityId,
    pub previous_period: Option<PeriodKey>,
    pub current_period: PeriodKey,
    pub trends: Vec<Trend>,
    pub summary: DiffSummary,
    /// Periods between `previous_period` and `current_period` whose filing
    /// was dropped.
    #[serde(default)]
    pub skipped_periods: Vec<PeriodKey>,
}

impl Transition {
    /// Trends other than `Stable`.
    pub fn activity(&self) -> impl Iterator<Item = &Trend> {
        self.trends.iter().filter(|t| t.direction.is_activity())
    }

    /// True when the two snapshots are not adjacent filings.
    pub fn is_spliced(&self) -> bool {
        !self.skipped_periods.is_empty()
    }
}

pub fn diff_transition(
    previous: Option<&Snapshot>,
    current: &Snapshot,
    config: &DiffConfig,
    prices: Option<&dyn PriceProvider>,
) -> Transition {
    let trends = diff(previous, current, config, prices);
    let previous_total = previous.map_or(0.0, Snapshot::total_value);
    let summary = DiffSummary::from_trends(&trends, previous_total, current.total_value());
    Transition {
        entity_id: current.entity_id().clone(),
        previous_period: previous.map(|p| p.period().clone()),
        current_period: current.period().clone(),
        trends,
        summary,
        skipped_periods: Vec::new(),
    }
}

/// Diff the most recent transition of `history`. `None` for an empty history.
pub fn diff_latest(
    history: &History,
    config: &DiffConfig,
    prices: Option<&dyn PriceProvider>,
) -> Option<Transition> {
    let (previous, current) = history.latest_transition()?;
    let mut transition = diff_transition(previous, current, config, prices);
    if let Some(prev) = previous {
        transition.skipped_periods = history.skipped_between(prev.period(), current.period());
    }
    Some(transition)
}
