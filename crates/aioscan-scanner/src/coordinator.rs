//! Scan orchestration: cache lookup, single-flight fetch, ordered persistence.
//!
//! At most one upstream fetch runs per domain. The fetch and its persistence
//! run on a spawned task whose result is shared by every caller that asked
//! for the same domain meanwhile; a caller dropping its request does not
//! cancel the work. The in-flight entry is removed when that task ends,
//! whatever the outcome.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use aioscan_core::{
    normalize_domain, percent_one_decimal, top_by_risk, AppConfig, DisplayKeyword, IntentCounts,
    Severity, SummaryCounts,
};
use aioscan_dataforseo::{parse_ranked_keywords, ParsedKeywords};
use aioscan_db::{DbError, DomainRow};
use chrono::{DateTime, Duration, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;

use crate::aggregate::StatsAggregator;
use crate::error::ScanError;
use crate::source::KeywordSource;
use crate::store::ScanStore;

/// What a caller receives for a scan, identical in shape for cache hits and
/// fresh fetches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub domain: String,
    pub keywords: Vec<DisplayKeyword>,
    /// Counts over `keywords` only.
    pub stats: SummaryCounts,
    pub cached_at: DateTime<Utc>,
}

/// A persisted domain record with its highest-risk keywords.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainReport {
    pub domain: String,
    pub keywords_analyzed: i64,
    pub keywords_with_overview: i64,
    pub keywords_without_overview: i64,
    pub overview_percent: f64,
    pub severity: Severity,
    pub by_intent: IntentCounts,
    pub total_search_volume: i64,
    pub overview_search_volume: i64,
    pub first_scanned_at: DateTime<Utc>,
    pub last_scanned_at: DateTime<Utc>,
    pub keywords: Vec<DisplayKeyword>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanPolicy {
    pub cache_ttl: Duration,
    pub top_keywords: usize,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::hours(24),
            top_keywords: 15,
        }
    }
}

impl ScanPolicy {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            cache_ttl: Duration::hours(config.cache_ttl_hours),
            top_keywords: config.top_keywords,
        }
    }

    /// Oldest `last_scanned_at` still served from cache at `now`. A TTL
    /// reaching past the representable range keeps every record fresh.
    #[must_use]
    pub fn fresh_since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.cache_ttl)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

type SharedScan = Shared<BoxFuture<'static, Result<ScanResult, ScanError>>>;
type InFlight = Arc<Mutex<HashMap<String, SharedScan>>>;

fn lock(in_flight: &InFlight) -> MutexGuard<'_, HashMap<String, SharedScan>> {
    in_flight.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes a domain's in-flight entry when the fetch task ends, including
/// by panic.
struct InFlightGuard {
    in_flight: InFlight,
    domain: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.in_flight).remove(&self.domain);
    }
}

#[derive(Clone)]
pub struct ScanCoordinator {
    store: Arc<dyn ScanStore>,
    source: Arc<dyn KeywordSource>,
    aggregator: StatsAggregator,
    policy: ScanPolicy,
    in_flight: InFlight,
}

impl ScanCoordinator {
    #[must_use]
    pub fn new(
        store: Arc<dyn ScanStore>,
        source: Arc<dyn KeywordSource>,
        policy: ScanPolicy,
    ) -> Self {
        Self {
            aggregator: StatsAggregator::new(Arc::clone(&store)),
            store,
            source,
            policy,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[must_use]
    pub fn aggregator(&self) -> &StatsAggregator {
        &self.aggregator
    }

    /// Number of domains currently being fetched.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        lock(&self.in_flight).len()
    }

    /// Scan `input`, serving a fresh cached record when one exists.
    ///
    /// `client_identity` tags the archive record if this call starts a fetch.
    ///
    /// # Errors
    ///
    /// - [`ScanError::InvalidFormat`] if `input` is not a valid domain.
    /// - [`ScanError::UpstreamUnavailable`] if the provider fetch fails.
    /// - [`ScanError::PersistenceFailure`] if a store read or write fails.
    pub async fn scan(
        &self,
        input: &str,
        client_identity: Option<&str>,
    ) -> Result<ScanResult, ScanError> {
        let domain = normalize_domain(input)?;

        let fresh_since = self.policy.fresh_since(Utc::now());
        if let Some(row) = self.store.fresh_domain(&domain, fresh_since).await? {
            tracing::debug!(domain = %domain, "cache hit");
            return cached_result(&*self.store, row, self.policy.top_keywords).await;
        }

        tracing::debug!(domain = %domain, "cache miss");
        self.join_or_start(&domain, client_identity).await
    }

    /// Read-only lookup of a persisted domain regardless of age.
    ///
    /// # Errors
    ///
    /// [`ScanError::InvalidFormat`] for a bad domain, or
    /// [`ScanError::PersistenceFailure`] if the store read fails.
    pub async fn lookup(&self, input: &str) -> Result<Option<DomainReport>, ScanError> {
        let domain = normalize_domain(input)?;
        let Some(row) = self.store.domain(&domain).await? else {
            return Ok(None);
        };
        let keywords = self
            .store
            .top_keywords(&domain, self.policy.top_keywords)
            .await?;

        Ok(Some(DomainReport {
            overview_percent: percent_one_decimal(row.keywords_with_overview, row.keywords_analyzed),
            severity: Severity::classify(row.keywords_with_overview, row.keywords_analyzed),
            by_intent: row.counters().by_intent,
            keywords: top_by_risk(&keywords, self.policy.top_keywords),
            domain: row.domain,
            keywords_analyzed: row.keywords_analyzed,
            keywords_with_overview: row.keywords_with_overview,
            keywords_without_overview: row.keywords_without_overview,
            total_search_volume: row.total_search_volume,
            overview_search_volume: row.overview_search_volume,
            first_scanned_at: row.first_scanned_at,
            last_scanned_at: row.last_scanned_at,
        }))
    }

    fn join_or_start(&self, domain: &str, client_identity: Option<&str>) -> SharedScan {
        let mut in_flight = lock(&self.in_flight);
        if let Some(existing) = in_flight.get(domain) {
            tracing::debug!(domain, "joining in-flight scan");
            return existing.clone();
        }

        let job = FetchJob {
            store: Arc::clone(&self.store),
            source: Arc::clone(&self.source),
            aggregator: self.aggregator.clone(),
            policy: self.policy,
            domain: domain.to_string(),
            client_identity: client_identity.map(ToOwned::to_owned),
        };
        let guard = InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            domain: domain.to_string(),
        };
        // The guard cannot take the lock before this function releases it,
        // so removal always follows insertion.
        let task = tokio::spawn(async move {
            let _guard = guard;
            job.run().await
        });

        let shared = async move {
            task.await.unwrap_or_else(|e| {
                Err(ScanError::PersistenceFailure(format!(
                    "scan task did not complete: {e}"
                )))
            })
        }
        .boxed()
        .shared();

        in_flight.insert(domain.to_string(), shared.clone());
        shared
    }
}

/// Builds the response for a persisted record from its stored keywords.
async fn cached_result(
    store: &dyn ScanStore,
    row: DomainRow,
    top_keywords: usize,
) -> Result<ScanResult, ScanError> {
    let stored = store.top_keywords(&row.domain, top_keywords).await?;
    let keywords = top_by_risk(&stored, top_keywords);

    Ok(ScanResult {
        stats: SummaryCounts::from_display(&keywords),
        keywords,
        domain: row.domain,
        cached_at: row.last_scanned_at,
    })
}

struct FetchJob {
    store: Arc<dyn ScanStore>,
    source: Arc<dyn KeywordSource>,
    aggregator: StatsAggregator,
    policy: ScanPolicy,
    domain: String,
    client_identity: Option<String>,
}

impl FetchJob {
    async fn run(self) -> Result<ScanResult, ScanError> {
        // A caller that missed the cache may only get here after an earlier
        // fetch for the same domain has persisted and left the map.
        let fresh_since = self.policy.fresh_since(Utc::now());
        if let Some(row) = self.store.fresh_domain(&self.domain, fresh_since).await? {
            tracing::debug!(domain = %self.domain, "record refreshed by an earlier fetch");
            return cached_result(&*self.store, row, self.policy.top_keywords).await;
        }

        tracing::info!(domain = %self.domain, "fetching ranked keywords");
        let raw = self.source.fetch_ranked(&self.domain).await.map_err(|e| {
            tracing::warn!(domain = %self.domain, error = %e, "ranked keyword fetch failed");
            ScanError::from(e)
        })?;

        let parsed = parse_ranked_keywords(&raw);
        tracing::info!(
            domain = %self.domain,
            keywords = parsed.keywords.len(),
            with_overview = parsed.stats.with_overview,
            "ranked keywords fetched"
        );

        let scanned_at = self.persist(&raw, &parsed).await.map_err(|e| {
            tracing::error!(domain = %self.domain, error = %e, "failed to persist scan");
            ScanError::from(e)
        })?;

        let keywords = top_by_risk(&parsed.keywords, self.policy.top_keywords);
        Ok(ScanResult {
            stats: SummaryCounts::from_display(&keywords),
            keywords,
            domain: self.domain,
            cached_at: scanned_at,
        })
    }

    /// Archive, then domain counters, then keywords, then global stats.
    /// Keywords are only replaced once the domain upsert has succeeded.
    async fn persist(
        &self,
        raw: &serde_json::Value,
        parsed: &ParsedKeywords,
    ) -> Result<DateTime<Utc>, DbError> {
        let scan = self
            .store
            .insert_scan(&self.domain, raw, self.client_identity.as_deref())
            .await?;

        let row = DomainRow::from_stats(&self.domain, Some(scan.id), &parsed.stats, scan.created_at);
        self.store.upsert_domain(&row).await?;

        self.store
            .replace_keywords(&self.domain, Some(scan.id), &parsed.keywords)
            .await?;

        self.aggregator.recompute().await?;
        Ok(scan.created_at)
    }
}
