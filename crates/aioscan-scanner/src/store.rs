//! Durable-store seam used by the coordinator, limiter and aggregator.
//!
//! [`PgScanStore`] delegates to `aioscan-db`; tests substitute an in-memory
//! implementation.

use aioscan_core::{DomainCounters, GlobalStats, ScoredKeyword};
use aioscan_db::{DbError, DomainRow, LatestScanRow, ScanRow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

#[async_trait]
pub trait ScanStore: Send + Sync {
    async fn insert_scan(
        &self,
        domain: &str,
        raw_response: &serde_json::Value,
        client_identity: Option<&str>,
    ) -> Result<ScanRow, DbError>;

    /// Creation times of at most `limit` archived scans for `identity`
    /// newer than `since`, oldest first.
    async fn identity_scan_times_since(
        &self,
        identity: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<DateTime<Utc>>, DbError>;

    async fn latest_scans(&self) -> Result<Vec<LatestScanRow>, DbError>;

    async fn domain(&self, domain: &str) -> Result<Option<DomainRow>, DbError>;

    async fn fresh_domain(
        &self,
        domain: &str,
        fresh_since: DateTime<Utc>,
    ) -> Result<Option<DomainRow>, DbError>;

    async fn upsert_domain(&self, row: &DomainRow) -> Result<DomainRow, DbError>;

    async fn domain_counters(&self) -> Result<Vec<DomainCounters>, DbError>;

    async fn replace_keywords(
        &self,
        domain: &str,
        scan_id: Option<Uuid>,
        keywords: &[ScoredKeyword],
    ) -> Result<(), DbError>;

    /// Highest-risk keywords of a domain, at most `limit`.
    async fn top_keywords(&self, domain: &str, limit: usize)
        -> Result<Vec<ScoredKeyword>, DbError>;

    async fn global_stats(&self) -> Result<Option<GlobalStats>, DbError>;

    async fn write_global_stats(&self, stats: &GlobalStats) -> Result<(), DbError>;
}

/// Postgres-backed store.
#[derive(Debug, Clone)]
pub struct PgScanStore {
    pool: PgPool,
}

impl PgScanStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn to_sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait]
impl ScanStore for PgScanStore {
    async fn insert_scan(
        &self,
        domain: &str,
        raw_response: &serde_json::Value,
        client_identity: Option<&str>,
    ) -> Result<ScanRow, DbError> {
        aioscan_db::insert_scan(&self.pool, domain, raw_response, client_identity).await
    }

    async fn identity_scan_times_since(
        &self,
        identity: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<DateTime<Utc>>, DbError> {
        aioscan_db::list_identity_scan_times_since(&self.pool, identity, since, to_sql_limit(limit))
            .await
    }

    async fn latest_scans(&self) -> Result<Vec<LatestScanRow>, DbError> {
        aioscan_db::latest_scans_per_domain(&self.pool).await
    }

    async fn domain(&self, domain: &str) -> Result<Option<DomainRow>, DbError> {
        aioscan_db::get_domain(&self.pool, domain).await
    }

    async fn fresh_domain(
        &self,
        domain: &str,
        fresh_since: DateTime<Utc>,
    ) -> Result<Option<DomainRow>, DbError> {
        aioscan_db::get_fresh_domain(&self.pool, domain, fresh_since).await
    }

    async fn upsert_domain(&self, row: &DomainRow) -> Result<DomainRow, DbError> {
        aioscan_db::upsert_domain(&self.pool, row).await
    }

    async fn domain_counters(&self) -> Result<Vec<DomainCounters>, DbError> {
        let rows = aioscan_db::list_domains(&self.pool).await?;
        Ok(rows.iter().map(DomainRow::counters).collect())
    }

    async fn replace_keywords(
        &self,
        domain: &str,
        scan_id: Option<Uuid>,
        keywords: &[ScoredKeyword],
    ) -> Result<(), DbError> {
        aioscan_db::replace_keywords(&self.pool, domain, scan_id, keywords).await
    }

    async fn top_keywords(
        &self,
        domain: &str,
        limit: usize,
    ) -> Result<Vec<ScoredKeyword>, DbError> {
        aioscan_db::list_keywords_by_domain(&self.pool, domain, Some(to_sql_limit(limit)))
            .await?
            .into_iter()
            .map(aioscan_db::KeywordRow::into_scored)
            .collect()
    }

    async fn global_stats(&self) -> Result<Option<GlobalStats>, DbError> {
        aioscan_db::get_global_stats(&self.pool).await
    }

    async fn write_global_stats(&self, stats: &GlobalStats) -> Result<(), DbError> {
        aioscan_db::write_global_stats(&self.pool, stats).await
    }
}
