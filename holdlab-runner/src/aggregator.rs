//! Cross-entity trend aggregation.
//!
//! Fan-out: every tracked entity's latest transition is loaded and diffed on
//! a private rayon pool. Fan-in: a single-threaded reduction groups the
//! non-stable trends by security, scores each group, and ranks them.
//!
//! Entities with fewer than two snapshots, or whose history fails to load,
//! are skipped. A timeout fails the whole batch because a ranking over a
//! partial entity set is misleading.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use rayon::prelude::*;

use holdlab_core::domain::{EntityId, PeriodKey, Security, SecurityId, TrendDirection};
use holdlab_core::{diff_latest, DiffConfig, PriceProvider, Transition};

use crate::loader::{combine_digests, history_digest, LoadError, SnapshotLoader};

/// Aggregate value change that one unit of `value_weight` stands for.
const VALUE_UNIT: f64 = 1_000_000_000.0;

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("aggregation exceeded {limit:?} after {elapsed:?}; partial rankings are not returned")]
    Timeout { limit: Duration, elapsed: Duration },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),

    #[error("list tracked entities: {0}")]
    Load(#[from] LoadError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Minimum distinct entities acting on a security for it to rank.
    pub min_entities: usize,
    /// Minimum aggregate |value change| for a security to rank.
    pub min_value_change: f64,
    /// Worker threads; `None` uses every core.
    pub max_threads: Option<usize>,
    pub timeout_secs: Option<u64>,
    /// Score per involved entity.
    pub entity_weight: f64,
    /// Score per $1B of aggregate value change.
    pub value_weight: f64,
    /// Entities listed in the summary's most-active table.
    pub most_active_entities: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            min_entities: 1,
            min_value_change: 0.0,
            max_threads: None,
            timeout_secs: None,
            entity_weight: 10.0,
            value_weight: 5.0,
            most_active_entities: 10,
        }
    }
}

impl AggregatorConfig {
    /// Strictly increasing in both arguments for positive weights.
    pub fn trending_score(&self, entities: usize, total_value_change: f64) -> f64 {
        self.entity_weight * entities as f64 + self.value_weight * total_value_change / VALUE_UNIT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Bullish,
    Bearish,
    Mixed,
}

impl Sentiment {
    /// Bullish at ≥ 2/3 buy-side, bearish at ≥ 2/3 sell-side.
    pub fn from_counts(buys: usize, sells: usize) -> Self {
        let n = buys + sells;
        if n == 0 {
            Self::Mixed
        } else if 3 * buys >= 2 * n {
            Self::Bullish
        } else if 3 * sells >= 2 * n {
            Self::Bearish
        } else {
            Self::Mixed
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn from_score(score: f64) -> Self {
        if score > 100.0 {
            Self::High
        } else if score > 50.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// One entity's move in a trending security.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityAction {
    pub entity_id: EntityId,
    pub direction: TrendDirection,
    pub share_delta: i64,
    pub value_delta: Option<f64>,
    pub current_period: PeriodKey,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingSecurity {
    pub security: Security,
    pub total_entities_involved: usize,
    pub net_share_change: i64,
    /// Sum of |value delta|; unknown deltas count as 0.
    pub total_value_change: f64,
    pub buy_count: usize,
    pub sell_count: usize,
    pub sentiment: Sentiment,
    pub trending_score: f64,
    pub priority: Priority,
    pub actions: Vec<EntityAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveEntity {
    pub entity_id: EntityId,
    pub actions: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendingSummary {
    pub entities_tracked: usize,
    pub entities_analyzed: usize,
    pub entities_skipped: usize,
    /// Securities that passed the filters, before truncation.
    pub candidates: usize,
    pub bullish: usize,
    pub bearish: usize,
    pub mixed: usize,
    /// Most common current period among analyzed transitions.
    pub latest_period: Option<PeriodKey>,
    /// Most common predecessor of `latest_period`.
    pub previous_period: Option<PeriodKey>,
    /// Analyzed transitions that span a dropped filing.
    #[serde(default)]
    pub spliced_transitions: usize,
    pub most_active: Vec<ActiveEntity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingAnalysis {
    pub securities: Vec<TrendingSecurity>,
    pub summary: TrendingSummary,
    /// BLAKE3 over the analyzed histories; empty for [`aggregate`] calls
    /// that did not load anything.
    pub dataset_hash: String,
}

// ── Reduction ──

#[derive(Default)]
struct Group {
    security: Option<Security>,
    entities: BTreeSet<EntityId>,
    actions: Vec<EntityAction>,
    net_share_change: i64,
    total_value_change: f64,
    buys: usize,
    sells: usize,
}

/// Rank securities by coordinated activity across `transitions`.
///
/// Pure and single-threaded. The summary's entity counters describe only
/// the transitions given; [`TrendAggregator::run`] fills in the rest.
pub fn aggregate(
    transitions: &[Transition],
    config: &AggregatorConfig,
    top_n: usize,
) -> TrendingAnalysis {
    let mut groups: BTreeMap<SecurityId, Group> = BTreeMap::new();
    let mut activity: HashMap<&EntityId, usize> = HashMap::new();

    for tr in transitions {
        for trend in tr.activity() {
            let g = groups.entry(trend.security.identifier.clone()).or_default();
            if g.security.is_none() {
                g.security = Some(trend.security.clone());
            }
            g.entities.insert(tr.entity_id.clone());
            g.net_share_change = g.net_share_change.saturating_add(trend.share_delta);
            g.total_value_change += trend.abs_value_delta();
            if trend.direction.is_buy_side() {
                g.buys += 1;
            } else {
                g.sells += 1;
            }
            g.actions.push(EntityAction {
                entity_id: tr.entity_id.clone(),
                direction: trend.direction,
                share_delta: trend.share_delta,
                value_delta: trend.value_delta,
                current_period: tr.current_period.clone(),
            });
            *activity.entry(&tr.entity_id).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<TrendingSecurity> = groups
        .into_values()
        .filter_map(|g| {
            let security = g.security?;
            let n = g.entities.len();
            if n < config.min_entities || g.total_value_change < config.min_value_change {
                return None;
            }
            let score = config.trending_score(n, g.total_value_change);
            Some(TrendingSecurity {
                security,
                total_entities_involved: n,
                net_share_change: g.net_share_change,
                total_value_change: g.total_value_change,
                buy_count: g.buys,
                sell_count: g.sells,
                sentiment: Sentiment::from_counts(g.buys, g.sells),
                trending_score: score,
                priority: Priority::from_score(score),
                actions: g.actions,
            })
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.trending_score
            .total_cmp(&a.trending_score)
            .then_with(|| a.security.identifier.cmp(&b.security.identifier))
    });

    let mut summary = TrendingSummary {
        entities_tracked: transitions.len(),
        entities_analyzed: transitions.len(),
        candidates: ranked.len(),
        spliced_transitions: transitions.iter().filter(|t| t.is_spliced()).count(),
        ..TrendingSummary::default()
    };
    for s in &ranked {
        match s.sentiment {
            Sentiment::Bullish => summary.bullish += 1,
            Sentiment::Bearish => summary.bearish += 1,
            Sentiment::Mixed => summary.mixed += 1,
        }
    }
    let (latest, previous) = dominant_periods(transitions);
    summary.latest_period = latest;
    summary.previous_period = previous;

    let mut most_active: Vec<ActiveEntity> = activity
        .into_iter()
        .map(|(entity_id, actions)| ActiveEntity {
            entity_id: entity_id.clone(),
            actions,
        })
        .collect();
    most_active.sort_by(|a, b| b.actions.cmp(&a.actions).then_with(|| a.entity_id.cmp(&b.entity_id)));
    most_active.truncate(config.most_active_entities);
    summary.most_active = most_active;

    ranked.truncate(top_n);
    TrendingAnalysis {
        securities: ranked,
        summary,
        dataset_hash: String::new(),
    }
}

/// Most frequent current period (later period wins ties), and the most
/// frequent previous period among transitions ending there.
fn dominant_periods(transitions: &[Transition]) -> (Option<PeriodKey>, Option<PeriodKey>) {
    fn mode<'a>(keys: impl Iterator<Item = &'a PeriodKey>) -> Option<PeriodKey> {
        let mut counts: BTreeMap<&PeriodKey, usize> = BTreeMap::new();
        for k in keys {
            *counts.entry(k).or_insert(0) += 1;
        }
        // BTreeMap iterates ascending, so `max_by_key` keeps the latest on ties.
        counts
            .into_iter()
            .max_by_key(|(_, n)| *n)
            .map(|(k, _)| k.clone())
    }

    let latest = mode(transitions.iter().map(|t| &t.current_period));
    let previous = latest.as_ref().and_then(|l| {
        mode(
            transitions
                .iter()
                .filter(|t| &t.current_period == l)
                .filter_map(|t| t.previous_period.as_ref()),
        )
    });
    (latest, previous)
}

// ── Parallel driver ──

enum EntityOutcome {
    Analyzed {
        transition: Transition,
        digest: [u8; 32],
    },
    Skipped,
    TimedOut,
}

/// Loads and diffs every tracked entity, then aggregates.
#[derive(Debug, Clone, Default)]
pub struct TrendAggregator {
    pub diff: DiffConfig,
    pub config: AggregatorConfig,
}

impl TrendAggregator {
    pub fn new(diff: DiffConfig, config: AggregatorConfig) -> Self {
        Self { diff, config }
    }

    pub fn run(
        &self,
        loader: &dyn SnapshotLoader,
        prices: Option<&dyn PriceProvider>,
        top_n: usize,
    ) -> Result<TrendingAnalysis, AggregateError> {
        let started = Instant::now();
        let limit = self.config.timeout_secs.map(Duration::from_secs);
        let entities = loader.list_entities()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.max_threads.unwrap_or(0))
            .build()
            .map_err(|e| AggregateError::ThreadPool(e.to_string()))?;

        let outcomes: Vec<EntityOutcome> = pool.install(|| {
            entities
                .par_iter()
                .map(|entity| self.process(loader, prices, entity, started, limit))
                .collect()
        });

        let timed_out = outcomes.iter().any(|o| matches!(o, EntityOutcome::TimedOut));
        if let Some(limit) = limit {
            let elapsed = started.elapsed();
            if timed_out || elapsed > limit {
                return Err(AggregateError::Timeout { limit, elapsed });
            }
        }

        let mut transitions = Vec::with_capacity(outcomes.len());
        let mut digests = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            if let EntityOutcome::Analyzed { transition, digest } = outcome {
                digests.push((transition.entity_id.clone(), digest));
                transitions.push(transition);
            }
        }

        let mut analysis = aggregate(&transitions, &self.config, top_n);
        analysis.summary.entities_tracked = entities.len();
        analysis.summary.entities_skipped = entities.len() - transitions.len();
        analysis.dataset_hash = combine_digests(digests);

        info!(
            tracked = analysis.summary.entities_tracked,
            analyzed = analysis.summary.entities_analyzed,
            skipped = analysis.summary.entities_skipped,
            candidates = analysis.summary.candidates,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "trend aggregation complete"
        );
        Ok(analysis)
    }

    fn process(
        &self,
        loader: &dyn SnapshotLoader,
        prices: Option<&dyn PriceProvider>,
        entity: &EntityId,
        started: Instant,
        limit: Option<Duration>,
    ) -> EntityOutcome {
        if limit.is_some_and(|l| started.elapsed() > l) {
            return EntityOutcome::TimedOut;
        }
        let history = match loader.load_history(entity) {
            Ok(h) => h,
            Err(e) => {
                warn!(entity = %entity, error = %e, "skipping entity: history failed to load");
                return EntityOutcome::Skipped;
            }
        };
        if history.len() < 2 {
            debug!(entity = %entity, snapshots = history.len(), "skipping entity: no transition yet");
            return EntityOutcome::Skipped;
        }
        match diff_latest(&history, &self.diff, prices) {
            Some(transition) => EntityOutcome::Analyzed {
                transition,
                digest: history_digest(&history),
            },
            None => EntityOutcome::Skipped,
        }
    }
}
