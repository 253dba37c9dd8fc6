//! Database operations for the `scans` archive table.
//!
//! The archive is insert-only: every upstream fetch appends one row holding
//! the raw provider payload. It doubles as the durable record for per-client
//! scan quotas.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `scans` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScanRow {
    pub id: Uuid,
    pub domain: String,
    pub raw_response: serde_json::Value,
    pub client_identity: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The newest archived scan of a domain, with the domain's earliest scan time.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LatestScanRow {
    pub id: Uuid,
    pub domain: String,
    pub raw_response: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub first_created_at: DateTime<Utc>,
}

/// Appends a raw provider payload to the archive.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_scan(
    pool: &PgPool,
    domain: &str,
    raw_response: &serde_json::Value,
    client_identity: Option<&str>,
) -> Result<ScanRow, DbError> {
    let row = sqlx::query_as::<_, ScanRow>(
        "INSERT INTO scans (id, domain, raw_response, client_identity) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id, domain, raw_response, client_identity, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(domain)
    .bind(raw_response)
    .bind(client_identity)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns the creation times of up to `limit` scans attributed to
/// `client_identity` since `since`, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_identity_scan_times_since(
    pool: &PgPool,
    client_identity: &str,
    since: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<DateTime<Utc>>, DbError> {
    let rows = sqlx::query_scalar::<_, DateTime<Utc>>(
        "SELECT created_at FROM ( \
             SELECT created_at FROM scans \
             WHERE client_identity = $1 AND created_at > $2 \
             ORDER BY created_at DESC \
             LIMIT $3 \
         ) recent \
         ORDER BY created_at ASC",
    )
    .bind(client_identity)
    .bind(since)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns the most recent scan for every archived domain, ordered by domain.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn latest_scans_per_domain(pool: &PgPool) -> Result<Vec<LatestScanRow>, DbError> {
    let rows = sqlx::query_as::<_, LatestScanRow>(
        "SELECT DISTINCT ON (s.domain) \
                s.id, s.domain, s.raw_response, s.created_at, \
                MIN(s.created_at) OVER (PARTITION BY s.domain) AS first_created_at \
         FROM scans s \
         ORDER BY s.domain, s.created_at DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
