//! Property tests for snapshot invariants.
//!
//! Uses proptest to verify:
//! 1. Merge idempotence: re-merging a merged snapshot changes nothing
//! 2. Merge uniqueness: one position per identifier, sums preserved
//! 3. Percentage closure: portfolio weights sum to 100
//! 4. Diff no-op symmetry: diff(S, S) is all stable with zero deltas
//! 5. Noise threshold: a stable verdict always carries zero deltas

use chrono::NaiveDate;
use proptest::prelude::*;
use std::collections::HashSet;

use holdlab_core::domain::{EntityId, PeriodKey, RawLineItem, TrendDirection};
use holdlab_core::{diff, merge_line_items, portfolio_weights, DiffConfig, InMemoryCatalog};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_item() -> impl Strategy<Value = RawLineItem> {
    (
        prop::sample::select(vec!["AAA", "BBB", "CCC", "DDD", "EEE", "FFF"]),
        1u64..5_000_000,
        (0.0..1.0e9_f64).prop_map(|v| v.round()),
    )
        .prop_map(|(id, shares, value)| RawLineItem::new(id, &format!("{id} INC"), shares, value))
}

fn arb_items() -> impl Strategy<Value = Vec<RawLineItem>> {
    prop::collection::vec(arb_item(), 1..40)
}

fn entity() -> EntityId {
    EntityId::from("fund-a")
}

fn period() -> PeriodKey {
    PeriodKey::quarter(2024, 3)
}

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 9, 30).unwrap()
}

// ── 1. Merge Idempotence ─────────────────────────────────────────────

proptest! {
    #[test]
    fn merge_is_idempotent(items in arb_items()) {
        let catalog = InMemoryCatalog::new();
        let once = merge_line_items(&entity(), &period(), as_of(), &items, &catalog).unwrap();
        let twice = merge_line_items(
            &entity(),
            &period(),
            as_of(),
            &once.snapshot.to_line_items(),
            &catalog,
        )
        .unwrap();
        prop_assert_eq!(&once.snapshot, &twice.snapshot);
        prop_assert_eq!(twice.duplicates_merged, 0);
    }
}

// ── 2. Merge Uniqueness ──────────────────────────────────────────────

proptest! {
    #[test]
    fn merge_keeps_one_position_per_identifier(items in arb_items()) {
        let catalog = InMemoryCatalog::new();
        let out = merge_line_items(&entity(), &period(), as_of(), &items, &catalog).unwrap();

        let ids: HashSet<_> = out.snapshot.positions().iter().map(|p| &p.security.identifier).collect();
        prop_assert_eq!(ids.len(), out.snapshot.len());

        let raw_shares: u64 = items.iter().map(|i| i.shares).sum();
        let merged_shares: u64 = out.snapshot.positions().iter().map(|p| p.shares).sum();
        prop_assert_eq!(raw_shares, merged_shares);

        let raw_value: f64 = items.iter().map(|i| i.market_value).sum();
        prop_assert!((raw_value - out.snapshot.total_value()).abs() <= raw_value * 1e-12 + 1e-6);
    }
}

// ── 3. Percentage Closure ────────────────────────────────────────────

proptest! {
    #[test]
    fn portfolio_weights_sum_to_100(items in arb_items()) {
        let catalog = InMemoryCatalog::new();
        let snapshot = merge_line_items(&entity(), &period(), as_of(), &items, &catalog)
            .unwrap()
            .snapshot;
        let sum: f64 = portfolio_weights(&snapshot).iter().map(|w| w.percentage).sum();
        if snapshot.total_value() > 0.0 {
            prop_assert!((sum - 100.0).abs() < 0.01, "sum = {}", sum);
        } else {
            prop_assert_eq!(sum, 0.0);
        }
    }
}

// ── 4. Diff No-op Symmetry ───────────────────────────────────────────

proptest! {
    #[test]
    fn diff_against_itself_is_stable(items in arb_items()) {
        let catalog = InMemoryCatalog::new();
        let snapshot = merge_line_items(&entity(), &period(), as_of(), &items, &catalog)
            .unwrap()
            .snapshot;
        let trends = diff(Some(&snapshot), &snapshot, &DiffConfig::default(), None);
        prop_assert_eq!(trends.len(), snapshot.len());
        for t in trends {
            prop_assert_eq!(t.direction, TrendDirection::Stable);
            prop_assert_eq!(t.share_delta, 0);
            prop_assert_eq!(t.value_delta, Some(0.0));
        }
    }
}

// ── 5. Stable Verdict Zeroes Deltas ──────────────────────────────────

proptest! {
    #[test]
    fn stable_verdict_zeroes_deltas(prev in 1u64..10_000_000, delta in -500_000i64..500_000) {
        let cfg = DiffConfig::default();
        let cur = (prev as i64 + delta).max(1) as u64;
        let delta = cur as i64 - prev as i64;

        let before = merge_line_items(
            &entity(),
            &PeriodKey::quarter(2024, 2),
            as_of(),
            &[RawLineItem::new("AAA", "AAA INC", prev, prev as f64)],
            &InMemoryCatalog::new(),
        )
        .unwrap()
        .snapshot;
        let after = merge_line_items(
            &entity(),
            &period(),
            as_of(),
            &[RawLineItem::new("AAA", "AAA INC", cur, cur as f64)],
            &InMemoryCatalog::new(),
        )
        .unwrap()
        .snapshot;

        let trends = diff(Some(&before), &after, &cfg, None);
        let t = &trends[0];
        if cfg.exceeds_noise(prev, delta) && delta != 0 {
            prop_assert_eq!(t.share_delta, delta);
            prop_assert!(t.direction.is_activity());
        } else {
            prop_assert_eq!(t.direction, TrendDirection::Stable);
            prop_assert_eq!(t.share_delta, 0);
            prop_assert_eq!(t.value_delta, Some(0.0));
        }
    }
}
