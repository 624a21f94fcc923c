//! `HoldingsEngine`: the operations callers use, wired to their collaborators.
//!
//! Five entry points:
//! - `merge_snapshot()`: raw filing line items → one Snapshot.
//! - `diff_entity()`: the latest transition of one tracked entity.
//! - `portfolio_breakdown()` / `entity_breakdown()`: weights, sectors, turnover.
//! - `ownership_breakdown()` / `ownership_for()`: who owns a security.
//! - `trending_securities()`: cross-entity ranking over every tracked entity.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use holdlab_core::domain::{EntityId, History, PeriodKey, RawLineItem, Security, Snapshot};
use holdlab_core::{
    company_ownership, diff_latest, history_stats, merge_line_items, portfolio_breakdown,
    Classifier, HistoryStats, HolderPosition, MergeError, MergeOutcome, OwnershipBreakdown,
    OwnershipError, PortfolioBreakdown, PriceProvider, SecurityCatalog, SecurityRef,
    SharesOutstandingProvider, Transition,
};

use crate::aggregator::{AggregateError, TrendAggregator, TrendingAnalysis};
use crate::config::EngineConfig;
use crate::loader::{LoadError, SnapshotLoader};

/// Errors from engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("load error: {0}")]
    Load(#[from] LoadError),
    #[error("merge error: {0}")]
    Merge(#[from] MergeError),
    #[error("ownership error: {0}")]
    Ownership(#[from] OwnershipError),
    #[error("aggregation error: {0}")]
    Aggregate(#[from] AggregateError),
    #[error("no snapshots on file for entity '{0}'")]
    NoSnapshots(EntityId),
    #[error("security '{0}' not found in the reference catalog")]
    UnknownSecurity(String),
}

/// Current-period breakdown plus statistics over the whole history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityBreakdown {
    pub portfolio: PortfolioBreakdown,
    pub stats: HistoryStats,
}

pub struct HoldingsEngine {
    config: EngineConfig,
    loader: Arc<dyn SnapshotLoader>,
    catalog: Arc<dyn SecurityCatalog>,
    shares: Option<Arc<dyn SharesOutstandingProvider>>,
    prices: Option<Arc<dyn PriceProvider>>,
    sectors: Classifier,
    institutions: Classifier,
}

impl HoldingsEngine {
    pub fn new(
        config: EngineConfig,
        loader: Arc<dyn SnapshotLoader>,
        catalog: Arc<dyn SecurityCatalog>,
    ) -> Self {
        Self {
            config,
            loader,
            catalog,
            shares: None,
            prices: None,
            sectors: Classifier::sectors(),
            institutions: Classifier::institutions(),
        }
    }

    pub fn with_shares_outstanding(mut self, provider: Arc<dyn SharesOutstandingProvider>) -> Self {
        self.shares = Some(provider);
        self
    }

    pub fn with_prices(mut self, provider: Arc<dyn PriceProvider>) -> Self {
        self.prices = Some(provider);
        self
    }

    pub fn with_sector_classifier(mut self, classifier: Classifier) -> Self {
        self.sectors = classifier;
        self
    }

    pub fn with_institution_classifier(mut self, classifier: Classifier) -> Self {
        self.institutions = classifier;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn prices(&self) -> Option<&dyn PriceProvider> {
        self.prices.as_deref()
    }

    fn history(&self, entity: &EntityId) -> Result<History, EngineError> {
        let history = self.loader.load_history(entity)?;
        if history.is_empty() {
            return Err(EngineError::NoSnapshots(entity.clone()));
        }
        Ok(history)
    }

    // ── Operations ──

    pub fn merge_snapshot(
        &self,
        entity: &EntityId,
        period: &PeriodKey,
        as_of: NaiveDate,
        items: &[RawLineItem],
    ) -> Result<MergeOutcome, EngineError> {
        Ok(merge_line_items(entity, period, as_of, items, self.catalog.as_ref())?)
    }

    /// Latest transition for `entity`. A single-snapshot history diffs
    /// against nothing, so only material positions come back as new.
    pub fn diff_entity(&self, entity: &EntityId) -> Result<Transition, EngineError> {
        let history = self.history(entity)?;
        diff_latest(&history, &self.config.diff, self.prices())
            .ok_or_else(|| EngineError::NoSnapshots(entity.clone()))
    }

    pub fn portfolio_breakdown(&self, snapshot: &Snapshot) -> PortfolioBreakdown {
        portfolio_breakdown(snapshot, &self.sectors)
    }

    /// Breakdown of the entity's latest snapshot with holding-period and
    /// turnover statistics over its whole history.
    pub fn entity_breakdown(&self, entity: &EntityId) -> Result<EntityBreakdown, EngineError> {
        let history = self.history(entity)?;
        let latest = history
            .latest()
            .ok_or_else(|| EngineError::NoSnapshots(entity.clone()))?;
        Ok(EntityBreakdown {
            portfolio: self.portfolio_breakdown(latest),
            stats: history_stats(&history),
        })
    }

    /// Ownership of `security` across explicit holders, using the
    /// shares-outstanding figure as of `as_of`.
    pub fn ownership_breakdown(
        &self,
        security: &Security,
        holders: &[HolderPosition],
        as_of: NaiveDate,
    ) -> Result<OwnershipBreakdown, EngineError> {
        let outstanding = self
            .shares
            .as_deref()
            .and_then(|p| p.shares_outstanding(security, as_of));
        Ok(company_ownership(
            security,
            holders,
            outstanding,
            &self.institutions,
            &self.config.ownership,
        )?)
    }

    /// Ownership of a catalog security across every tracked entity's latest
    /// snapshot. Entities whose history fails to load are skipped.
    pub fn ownership_for(&self, key: SecurityRef<'_>) -> Result<OwnershipBreakdown, EngineError> {
        let security = self.catalog.resolve(key).ok_or_else(|| {
            let raw = match key {
                SecurityRef::Identifier(s) | SecurityRef::Ticker(s) => s,
            };
            EngineError::UnknownSecurity(raw.to_string())
        })?;

        let mut holders = Vec::new();
        let mut as_of: Option<NaiveDate> = None;
        for entity in self.loader.list_entities()? {
            let history = match self.loader.load_history(&entity) {
                Ok(h) => h,
                Err(e) => {
                    warn!(entity = %entity, error = %e, "skipping holder: history failed to load");
                    continue;
                }
            };
            let Some(latest) = history.latest() else {
                continue;
            };
            if let Some(p) = latest.position(&security.identifier) {
                holders.push(HolderPosition::new(entity.as_str(), p.shares, p.market_value));
                as_of = as_of.max(Some(latest.as_of()));
            }
        }

        // No holders still needs a denominator; fall back to today's figure.
        let as_of = as_of.unwrap_or_else(|| chrono::Utc::now().date_naive());
        self.ownership_breakdown(&security, &holders, as_of)
    }

    pub fn trending_securities(&self, top_n: usize) -> Result<TrendingAnalysis, EngineError> {
        let aggregator =
            TrendAggregator::new(self.config.diff.clone(), self.config.aggregator.clone());
        Ok(aggregator.run(self.loader.as_ref(), self.prices(), top_n)?)
    }
}
