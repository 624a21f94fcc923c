//! Property tests for cross-entity aggregation.
//!
//! Uses proptest to verify:
//! 1. Monotonicity: at equal aggregate value, more entities rank at least as high
//! 2. Score monotonicity in both factors
//! 3. Ranking is sorted by score and never exceeds top_n

use proptest::prelude::*;

use holdlab_core::domain::{EntityId, PeriodKey, Position, Security, SecurityId, Snapshot};
use holdlab_core::{diff_transition, DiffConfig, Transition};
use holdlab_runner::{aggregate, AggregatorConfig};

// ── Fixtures ─────────────────────────────────────────────────────────

fn position(id: &str, value: f64) -> Position {
    Position {
        security: Security::new(SecurityId::new(id), None, format!("{id} CORP")),
        shares: 10_000,
        market_value: value,
    }
}

/// Entity `i` opens every security whose holder count exceeds `i`, each
/// security's total value split evenly across its holders.
fn transitions(holders: &[(String, usize)], total_value: f64) -> Vec<Transition> {
    let max = holders.iter().map(|(_, n)| *n).max().unwrap_or(0);
    let q1 = PeriodKey::quarter(2024, 1);
    let q2 = PeriodKey::quarter(2024, 2);
    let as_of = q2.quarter_end().unwrap();
    (0..max)
        .map(|i| {
            let entity = EntityId::new(format!("fund-{i:03}"));
            let positions = holders
                .iter()
                .filter(|(_, n)| *n > i)
                .map(|(id, n)| position(id, total_value / *n as f64))
                .collect();
            let prev = Snapshot::empty(entity.clone(), q1.clone(), as_of);
            let cur = Snapshot::new(entity, q2.clone(), as_of, positions).unwrap();
            diff_transition(Some(&prev), &cur, &DiffConfig::default(), None)
        })
        .collect()
}

// ── Properties ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn more_entities_rank_at_least_as_high(
        few in 1usize..6,
        extra in 1usize..6,
        value in 1.0e6..5.0e9_f64,
    ) {
        let many = few + extra;
        let holders = vec![("FEW".to_string(), few), ("MANY".to_string(), many)];
        let analysis = aggregate(&transitions(&holders, value), &AggregatorConfig::default(), 10);

        let rank = |id: &str| {
            analysis
                .securities
                .iter()
                .position(|s| s.security.identifier.as_str() == id)
                .unwrap()
        };
        prop_assert!(rank("MANY") < rank("FEW"));
        prop_assert_eq!(analysis.securities[0].total_entities_involved, many);
    }

    #[test]
    fn score_grows_with_each_factor(
        entities in 0usize..50,
        value in 0.0..1.0e11_f64,
        bump in 1.0e6..1.0e9_f64,
    ) {
        let cfg = AggregatorConfig::default();
        let base = cfg.trending_score(entities, value);
        prop_assert!(cfg.trending_score(entities + 1, value) > base);
        prop_assert!(cfg.trending_score(entities, value + bump) > base);
    }

    #[test]
    fn ranking_is_sorted_and_truncated(
        counts in prop::collection::vec(1usize..8, 1..8),
        top_n in 1usize..10,
    ) {
        let holders: Vec<(String, usize)> = counts
            .iter()
            .enumerate()
            .map(|(i, n)| (format!("SEC{i:02}"), *n))
            .collect();
        let analysis = aggregate(&transitions(&holders, 1.0e8), &AggregatorConfig::default(), top_n);

        prop_assert!(analysis.securities.len() <= top_n);
        prop_assert_eq!(analysis.summary.candidates, holders.len());
        for w in analysis.securities.windows(2) {
            prop_assert!(w[0].trending_score >= w[1].trending_score);
        }
    }
}
