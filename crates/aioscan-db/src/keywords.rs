//! Database operations for the `keywords` table.
//!
//! A domain's keyword set is always replaced as a whole: rows from the
//! previous scan are deleted and the new set inserted in one transaction.

use aioscan_core::{ScoredKeyword, SearchIntent};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::DbError;

/// Postgres caps bind parameters at 65 535 per statement; 9 binds per row.
const INSERT_CHUNK_ROWS: usize = 1_000;

/// A row from the `keywords` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KeywordRow {
    pub id: i64,
    pub domain: String,
    pub scan_id: Option<Uuid>,
    pub keyword: String,
    pub search_volume: i64,
    pub position: i32,
    pub intent: String,
    pub etv: i64,
    pub has_ai_overview: bool,
    pub risk_score: f64,
    pub created_at: DateTime<Utc>,
}

impl KeywordRow {
    /// Converts the stored row back into a scored keyword.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidValue`] if the stored intent is not one of
    /// the four known categories.
    pub fn into_scored(self) -> Result<ScoredKeyword, DbError> {
        let intent = self
            .intent
            .parse::<SearchIntent>()
            .map_err(|_| DbError::InvalidValue {
                column: "keywords.intent",
                value: self.intent.clone(),
            })?;

        Ok(ScoredKeyword {
            keyword: self.keyword,
            search_volume: self.search_volume,
            position: self.position,
            intent,
            etv: self.etv,
            has_ai_overview: self.has_ai_overview,
            risk_score: self.risk_score,
        })
    }
}

/// Returns a domain's keywords ordered by descending risk score, optionally
/// capped at `limit` rows.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_keywords_by_domain(
    pool: &PgPool,
    domain: &str,
    limit: Option<i64>,
) -> Result<Vec<KeywordRow>, DbError> {
    let rows = sqlx::query_as::<_, KeywordRow>(
        "SELECT id, domain, scan_id, keyword, search_volume, position, intent, etv, \
                has_ai_overview, risk_score, created_at \
         FROM keywords \
         WHERE domain = $1 \
         ORDER BY risk_score DESC, id ASC \
         LIMIT $2",
    )
    .bind(domain)
    // LIMIT NULL means no limit in Postgres.
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Replaces every keyword of `domain` with `keywords`.
///
/// Delete and insert share one transaction, so readers observe either the
/// old set or the new one.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; the transaction is
/// rolled back on drop.
pub async fn replace_keywords(
    pool: &PgPool,
    domain: &str,
    scan_id: Option<Uuid>,
    keywords: &[ScoredKeyword],
) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM keywords WHERE domain = $1")
        .bind(domain)
        .execute(&mut *tx)
        .await?;

    for chunk in keywords.chunks(INSERT_CHUNK_ROWS) {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO keywords \
             (domain, scan_id, keyword, search_volume, position, intent, etv, has_ai_overview, risk_score) ",
        );
        builder.push_values(chunk, |mut row, kw| {
            row.push_bind(domain)
                .push_bind(scan_id)
                .push_bind(&kw.keyword)
                .push_bind(kw.search_volume)
                .push_bind(kw.position)
                .push_bind(kw.intent.as_str())
                .push_bind(kw.etv)
                .push_bind(kw.has_ai_overview)
                .push_bind(kw.risk_score);
        });
        builder.build().execute(&mut *tx).await?;
    }

    tx.commit().await?;
    Ok(())
}
