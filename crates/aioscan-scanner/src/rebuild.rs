//! Replays the scan archive into domain and keyword records.
//!
//! For each archived domain the latest raw payload is re-parsed, the domain
//! record rewritten with archive timestamps, and its keywords replaced.
//! Global stats are recomputed once at the end. Safe to run repeatedly.

use aioscan_core::GlobalStats;
use aioscan_dataforseo::parse_ranked_keywords;
use aioscan_db::{DbError, DomainRow, LatestScanRow};
use serde::Serialize;

use crate::aggregate::StatsAggregator;
use crate::store::ScanStore;

#[derive(Debug, Clone, Serialize)]
pub struct RebuildReport {
    pub domains_rebuilt: usize,
    pub domains_failed: usize,
    pub keywords_written: usize,
    pub stats: GlobalStats,
}

/// Rebuild every domain from its newest archived payload.
///
/// Per-domain failures are logged and counted, not fatal.
///
/// # Errors
///
/// Returns [`DbError`] if the archive cannot be read or the final stats
/// recomputation fails.
pub async fn rebuild_from_archive(
    store: &dyn ScanStore,
    aggregator: &StatsAggregator,
) -> Result<RebuildReport, DbError> {
    let latest = store.latest_scans().await?;
    tracing::info!(domains = latest.len(), "rebuilding domains from scan archive");

    let mut domains_rebuilt = 0;
    let mut domains_failed = 0;
    let mut keywords_written = 0;

    for scan in latest {
        let domain = scan.domain.clone();
        match rebuild_domain(store, scan).await {
            Ok(written) => {
                domains_rebuilt += 1;
                keywords_written += written;
            }
            Err(e) => {
                domains_failed += 1;
                tracing::error!(domain = %domain, error = %e, "failed to rebuild domain");
            }
        }
    }

    let stats = aggregator.recompute().await?;
    tracing::info!(
        domains_rebuilt,
        domains_failed,
        keywords_written,
        "archive rebuild complete"
    );

    Ok(RebuildReport {
        domains_rebuilt,
        domains_failed,
        keywords_written,
        stats,
    })
}

async fn rebuild_domain(store: &dyn ScanStore, scan: LatestScanRow) -> Result<usize, DbError> {
    let parsed = parse_ranked_keywords(&scan.raw_response);

    let mut row = DomainRow::from_stats(&scan.domain, Some(scan.id), &parsed.stats, scan.created_at);
    row.first_scanned_at = scan.first_created_at;
    store.upsert_domain(&row).await?;

    store
        .replace_keywords(&scan.domain, Some(scan.id), &parsed.keywords)
        .await?;
    Ok(parsed.keywords.len())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::test_support::{payload, InMemoryStore};
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn rebuild_uses_latest_payload_and_archive_times() {
        let store = Arc::new(InMemoryStore::default());
        let now = Utc::now();
        let first = now - Duration::days(10);
        let latest = now - Duration::days(2);
        store.archive_payload_at("a.com", None, payload(&[("old", 5, 1, false)]), first);
        store.archive_payload_at(
            "a.com",
            None,
            payload(&[("new-1", 100, 1, true), ("new-2", 50, 2, false)]),
            latest,
        );
        store.archive_payload_at("b.com", None, serde_json::json!({}), latest);

        let aggregator = StatsAggregator::new(store.clone());
        let report = rebuild_from_archive(&*store, &aggregator)
            .await
            .expect("rebuild");

        assert_eq!(report.domains_rebuilt, 2);
        assert_eq!(report.domains_failed, 0);
        assert_eq!(report.keywords_written, 2);
        assert_eq!(report.stats.total_domains, 2);

        let row = store.domain_row("a.com").expect("a.com rebuilt");
        assert_eq!(row.keywords_analyzed, 2);
        assert_eq!(row.first_scanned_at, first);
        assert_eq!(row.last_scanned_at, latest);
        assert_eq!(store.keywords_of("b.com").len(), 0);
    }

    #[tokio::test]
    async fn rebuild_is_idempotent() {
        let store = Arc::new(InMemoryStore::default());
        store.archive_payload_at(
            "a.com",
            None,
            payload(&[("k", 100, 1, true)]),
            Utc::now() - Duration::hours(3),
        );
        let aggregator = StatsAggregator::new(store.clone());

        let first = rebuild_from_archive(&*store, &aggregator)
            .await
            .expect("first");
        let second = rebuild_from_archive(&*store, &aggregator)
            .await
            .expect("second");
        assert!(first.stats.same_figures(&second.stats));
        assert_eq!(store.keywords_of("a.com").len(), 1);
    }

    #[tokio::test]
    async fn per_domain_failures_are_counted() {
        let store = Arc::new(InMemoryStore::default());
        store.archive_payload_at("a.com", None, payload(&[]), Utc::now());
        store.fail_upserts(true);
        let aggregator = StatsAggregator::new(store.clone());

        let report = rebuild_from_archive(&*store, &aggregator)
            .await
            .expect("rebuild");
        assert_eq!(report.domains_rebuilt, 0);
        assert_eq!(report.domains_failed, 1);
    }
}
