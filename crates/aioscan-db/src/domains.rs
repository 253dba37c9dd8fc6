//! Database operations for the `domains` table.

use aioscan_core::{DomainCounters, IntentCounts, KeywordStats};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const DOMAIN_COLUMNS: &str = "domain, last_scan_id, keywords_analyzed, keywords_with_overview, \
     keywords_without_overview, intent_informational, intent_commercial, \
     intent_transactional, intent_navigational, total_search_volume, \
     overview_search_volume, first_scanned_at, last_scanned_at";

/// A row from the `domains` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DomainRow {
    pub domain: String,
    pub last_scan_id: Option<Uuid>,
    pub keywords_analyzed: i64,
    pub keywords_with_overview: i64,
    pub keywords_without_overview: i64,
    pub intent_informational: i64,
    pub intent_commercial: i64,
    pub intent_transactional: i64,
    pub intent_navigational: i64,
    pub total_search_volume: i64,
    pub overview_search_volume: i64,
    pub first_scanned_at: DateTime<Utc>,
    pub last_scanned_at: DateTime<Utc>,
}

impl DomainRow {
    /// Builds the row a fresh scan produces. `first_scanned_at` equals
    /// `scanned_at` here; the upsert keeps the earlier stored value.
    #[must_use]
    pub fn from_stats(
        domain: &str,
        last_scan_id: Option<Uuid>,
        stats: &KeywordStats,
        scanned_at: DateTime<Utc>,
    ) -> Self {
        Self {
            domain: domain.to_string(),
            last_scan_id,
            keywords_analyzed: stats.total,
            keywords_with_overview: stats.with_overview,
            keywords_without_overview: stats.without_overview,
            intent_informational: stats.by_intent.informational,
            intent_commercial: stats.by_intent.commercial,
            intent_transactional: stats.by_intent.transactional,
            intent_navigational: stats.by_intent.navigational,
            total_search_volume: stats.total_search_volume,
            overview_search_volume: stats.overview_search_volume,
            first_scanned_at: scanned_at,
            last_scanned_at: scanned_at,
        }
    }

    #[must_use]
    pub fn counters(&self) -> DomainCounters {
        DomainCounters {
            keywords_analyzed: self.keywords_analyzed,
            keywords_with_overview: self.keywords_with_overview,
            by_intent: IntentCounts {
                informational: self.intent_informational,
                commercial: self.intent_commercial,
                transactional: self.intent_transactional,
                navigational: self.intent_navigational,
            },
            total_search_volume: self.total_search_volume,
            overview_search_volume: self.overview_search_volume,
        }
    }
}

/// Fetches a domain row regardless of age.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_domain(pool: &PgPool, domain: &str) -> Result<Option<DomainRow>, DbError> {
    let row = sqlx::query_as::<_, DomainRow>(&format!(
        "SELECT {DOMAIN_COLUMNS} FROM domains WHERE domain = $1"
    ))
    .bind(domain)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Fetches a domain row only if it was scanned at or after `fresh_since`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_fresh_domain(
    pool: &PgPool,
    domain: &str,
    fresh_since: DateTime<Utc>,
) -> Result<Option<DomainRow>, DbError> {
    let row = sqlx::query_as::<_, DomainRow>(&format!(
        "SELECT {DOMAIN_COLUMNS} FROM domains WHERE domain = $1 AND last_scanned_at >= $2"
    ))
    .bind(domain)
    .bind(fresh_since)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Inserts or fully replaces the counters of a domain row.
///
/// On conflict every counter and `last_scanned_at` are overwritten, while
/// `first_scanned_at` keeps the earlier of the stored and supplied values.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails, including when the row
/// violates the counter-split check constraints.
pub async fn upsert_domain(pool: &PgPool, row: &DomainRow) -> Result<DomainRow, DbError> {
    let stored = sqlx::query_as::<_, DomainRow>(&format!(
        "INSERT INTO domains ({DOMAIN_COLUMNS}) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
         ON CONFLICT (domain) DO UPDATE SET \
             last_scan_id = EXCLUDED.last_scan_id, \
             keywords_analyzed = EXCLUDED.keywords_analyzed, \
             keywords_with_overview = EXCLUDED.keywords_with_overview, \
             keywords_without_overview = EXCLUDED.keywords_without_overview, \
             intent_informational = EXCLUDED.intent_informational, \
             intent_commercial = EXCLUDED.intent_commercial, \
             intent_transactional = EXCLUDED.intent_transactional, \
             intent_navigational = EXCLUDED.intent_navigational, \
             total_search_volume = EXCLUDED.total_search_volume, \
             overview_search_volume = EXCLUDED.overview_search_volume, \
             first_scanned_at = LEAST(domains.first_scanned_at, EXCLUDED.first_scanned_at), \
             last_scanned_at = EXCLUDED.last_scanned_at \
         RETURNING {DOMAIN_COLUMNS}"
    ))
    .bind(&row.domain)
    .bind(row.last_scan_id)
    .bind(row.keywords_analyzed)
    .bind(row.keywords_with_overview)
    .bind(row.keywords_without_overview)
    .bind(row.intent_informational)
    .bind(row.intent_commercial)
    .bind(row.intent_transactional)
    .bind(row.intent_navigational)
    .bind(row.total_search_volume)
    .bind(row.overview_search_volume)
    .bind(row.first_scanned_at)
    .bind(row.last_scanned_at)
    .fetch_one(pool)
    .await?;

    Ok(stored)
}

/// Returns every domain row, for global stats recomputation.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_domains(pool: &PgPool) -> Result<Vec<DomainRow>, DbError> {
    let rows = sqlx::query_as::<_, DomainRow>(&format!(
        "SELECT {DOMAIN_COLUMNS} FROM domains ORDER BY domain"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
