//! Global stats recomputation over every domain record.

use std::sync::Arc;

use aioscan_core::{compute_global_stats, GlobalStats};
use aioscan_db::DbError;
use chrono::Utc;

use crate::store::ScanStore;

/// Outcome of a scheduled reconciliation pass.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub stats: GlobalStats,
    /// The stored row differed from a from-scratch recomputation.
    pub drifted: bool,
}

#[derive(Clone)]
pub struct StatsAggregator {
    store: Arc<dyn ScanStore>,
}

impl StatsAggregator {
    #[must_use]
    pub fn new(store: Arc<dyn ScanStore>) -> Self {
        Self { store }
    }

    /// Recompute from all domain counters and overwrite the stored row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if reading domains or writing the row fails.
    pub async fn recompute(&self) -> Result<GlobalStats, DbError> {
        let counters = self.store.domain_counters().await?;
        let stats = compute_global_stats(&counters, Utc::now());
        self.store.write_global_stats(&stats).await?;
        tracing::debug!(
            total_domains = stats.total_domains,
            total_keywords = stats.total_keywords,
            "global stats recomputed"
        );
        Ok(stats)
    }

    /// Recompute and report whether the previously stored row had drifted.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if any store call fails.
    pub async fn reconcile(&self) -> Result<Reconciliation, DbError> {
        let stored = self.store.global_stats().await?;
        let stats = self.recompute().await?;
        let drifted = stored.is_some_and(|previous| !previous.same_figures(&stats));
        if drifted {
            tracing::warn!(
                total_domains = stats.total_domains,
                total_keywords = stats.total_keywords,
                "stored global stats drifted from recomputation; overwritten"
            );
        }
        Ok(Reconciliation { stats, drifted })
    }

    /// The stored snapshot, or all zeros if stats were never written.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the read fails.
    pub async fn snapshot(&self) -> Result<GlobalStats, DbError> {
        Ok(self
            .store
            .global_stats()
            .await?
            .unwrap_or_else(|| GlobalStats::empty(Utc::now())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::InMemoryStore;
    use aioscan_core::{IntentCounts, KeywordStats};
    use aioscan_db::DomainRow;

    fn row(domain: &str, affected: i64, total: i64) -> DomainRow {
        let stats = KeywordStats {
            total,
            with_overview: affected,
            without_overview: total - affected,
            by_intent: IntentCounts {
                commercial: total,
                ..IntentCounts::default()
            },
            total_search_volume: total * 10,
            overview_search_volume: affected * 10,
        };
        DomainRow::from_stats(domain, None, &stats, Utc::now())
    }

    #[tokio::test]
    async fn recompute_over_no_domains_writes_zeros() {
        let store = Arc::new(InMemoryStore::default());
        let aggregator = StatsAggregator::new(store.clone());

        let stats = aggregator.recompute().await.expect("recompute");
        assert_eq!(stats.total_domains, 0);
        assert!(stats.same_figures(&GlobalStats::empty(Utc::now())));
        assert!(store.stored_stats().is_some());
    }

    #[tokio::test]
    async fn recompute_builds_histogram() {
        let store = Arc::new(InMemoryStore::default());
        for (domain, affected) in [("a.com", 80), ("b.com", 60), ("c.com", 30), ("d.com", 10)] {
            store.put_domain(row(domain, affected, 100), Vec::new());
        }
        let aggregator = StatsAggregator::new(store.clone());

        let stats = aggregator.recompute().await.expect("recompute");
        assert_eq!(stats.severity.critical, 1);
        assert_eq!(stats.severity.high, 1);
        assert_eq!(stats.severity.medium, 1);
        assert_eq!(stats.severity.low, 1);
        assert_eq!(stats.by_intent.commercial, 400);
    }

    #[tokio::test]
    async fn reconcile_flags_drift_only_when_figures_change() {
        let store = Arc::new(InMemoryStore::default());
        store.put_domain(row("a.com", 5, 10), Vec::new());
        let aggregator = StatsAggregator::new(store.clone());

        let first = aggregator.reconcile().await.expect("reconcile");
        assert!(!first.drifted, "no stored row is not drift");

        let again = aggregator.reconcile().await.expect("reconcile");
        assert!(!again.drifted);

        store.put_domain(row("b.com", 1, 10), Vec::new());
        let after_change = aggregator.reconcile().await.expect("reconcile");
        assert!(after_change.drifted);
        assert_eq!(after_change.stats.total_domains, 2);
    }

    #[tokio::test]
    async fn snapshot_defaults_to_zeros() {
        let store = Arc::new(InMemoryStore::default());
        let aggregator = StatsAggregator::new(store);
        let snapshot = aggregator.snapshot().await.expect("snapshot");
        assert_eq!(snapshot.total_domains, 0);
    }
}
