//! HoldLab Core: quarterly holdings snapshots and the math over them.
//!
//! This crate is pure computation, no I/O:
//! - Domain types (securities, positions, snapshots, histories, trends)
//! - Position merge engine turning raw filing line items into snapshots
//! - Ordered-rule classifier shared by sector and holder categorization
//! - Snapshot diff engine with noise thresholds and a materiality floor
//! - Ownership math against portfolio value and shares outstanding
//! - Portfolio analytics (sector breakdown, concentration, turnover)
//! - Collaborator traits for reference data (catalog, prices, shares outstanding)

pub mod analytics;
pub mod classify;
pub mod diff;
pub mod domain;
pub mod merge;
pub mod ownership;
pub mod provider;

#[cfg(test)]
mod test_helpers;

pub use analytics::{history_stats, portfolio_breakdown, HistoryStats, PortfolioBreakdown, SectorSlice};
pub use classify::{Classification, Classifier, KeywordRule, Stage};
pub use diff::{diff, diff_latest, diff_transition, DiffConfig, DiffSummary, Transition};
pub use merge::{merge_line_items, MalformedReason, MergeError, MergeOutcome};
pub use ownership::{
    company_ownership, portfolio_weights, CategoryTotal, HolderPosition, OwnershipBreakdown,
    OwnershipConfig, OwnershipError, RankedHolder, WeightedPosition, PUBLIC_AND_OTHER,
};
pub use provider::{
    InMemoryCatalog, PriceProvider, PriceTable, SecurityCatalog, SecurityRef, SecurityTable,
    SharesOutstandingProvider, SharesOutstandingTable,
};
