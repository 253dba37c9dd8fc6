//! Database operations for the single-row `global_stats` table.

use aioscan_core::{GlobalStats, IntentCounts, SeverityHistogram};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// The row from `global_stats` (always `id = 1`).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GlobalStatsRow {
    pub total_domains: i64,
    pub total_keywords: i64,
    pub keywords_with_overview: i64,
    pub avg_overview_percent: f64,
    pub total_search_volume: i64,
    pub overview_search_volume: i64,
    pub overview_volume_percent: f64,
    pub intent_informational: i64,
    pub intent_commercial: i64,
    pub intent_transactional: i64,
    pub intent_navigational: i64,
    pub severity_critical: i64,
    pub severity_high: i64,
    pub severity_medium: i64,
    pub severity_low: i64,
    pub updated_at: DateTime<Utc>,
}

impl From<GlobalStatsRow> for GlobalStats {
    fn from(row: GlobalStatsRow) -> Self {
        GlobalStats {
            total_domains: row.total_domains,
            total_keywords: row.total_keywords,
            keywords_with_overview: row.keywords_with_overview,
            avg_overview_percent: row.avg_overview_percent,
            total_search_volume: row.total_search_volume,
            overview_search_volume: row.overview_search_volume,
            overview_volume_percent: row.overview_volume_percent,
            by_intent: IntentCounts {
                informational: row.intent_informational,
                commercial: row.intent_commercial,
                transactional: row.intent_transactional,
                navigational: row.intent_navigational,
            },
            severity: SeverityHistogram {
                critical: row.severity_critical,
                high: row.severity_high,
                medium: row.severity_medium,
                low: row.severity_low,
            },
            updated_at: row.updated_at,
        }
    }
}

/// Reads the global stats row, if it has ever been written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_global_stats(pool: &PgPool) -> Result<Option<GlobalStats>, DbError> {
    let row = sqlx::query_as::<_, GlobalStatsRow>(
        "SELECT total_domains, total_keywords, keywords_with_overview, avg_overview_percent, \
                total_search_volume, overview_search_volume, overview_volume_percent, \
                intent_informational, intent_commercial, intent_transactional, \
                intent_navigational, severity_critical, severity_high, severity_medium, \
                severity_low, updated_at \
         FROM global_stats \
         WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row.map(GlobalStats::from))
}

/// Overwrites the global stats row with a full recomputation.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn write_global_stats(pool: &PgPool, stats: &GlobalStats) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO global_stats ( \
             id, total_domains, total_keywords, keywords_with_overview, avg_overview_percent, \
             total_search_volume, overview_search_volume, overview_volume_percent, \
             intent_informational, intent_commercial, intent_transactional, intent_navigational, \
             severity_critical, severity_high, severity_medium, severity_low, updated_at) \
         VALUES (1, $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
         ON CONFLICT (id) DO UPDATE SET \
             total_domains = EXCLUDED.total_domains, \
             total_keywords = EXCLUDED.total_keywords, \
             keywords_with_overview = EXCLUDED.keywords_with_overview, \
             avg_overview_percent = EXCLUDED.avg_overview_percent, \
             total_search_volume = EXCLUDED.total_search_volume, \
             overview_search_volume = EXCLUDED.overview_search_volume, \
             overview_volume_percent = EXCLUDED.overview_volume_percent, \
             intent_informational = EXCLUDED.intent_informational, \
             intent_commercial = EXCLUDED.intent_commercial, \
             intent_transactional = EXCLUDED.intent_transactional, \
             intent_navigational = EXCLUDED.intent_navigational, \
             severity_critical = EXCLUDED.severity_critical, \
             severity_high = EXCLUDED.severity_high, \
             severity_medium = EXCLUDED.severity_medium, \
             severity_low = EXCLUDED.severity_low, \
             updated_at = EXCLUDED.updated_at",
    )
    .bind(stats.total_domains)
    .bind(stats.total_keywords)
    .bind(stats.keywords_with_overview)
    .bind(stats.avg_overview_percent)
    .bind(stats.total_search_volume)
    .bind(stats.overview_search_volume)
    .bind(stats.overview_volume_percent)
    .bind(stats.by_intent.informational)
    .bind(stats.by_intent.commercial)
    .bind(stats.by_intent.transactional)
    .bind(stats.by_intent.navigational)
    .bind(stats.severity.critical)
    .bind(stats.severity.high)
    .bind(stats.severity.medium)
    .bind(stats.severity.low)
    .bind(stats.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}
