//! Per-client scan quota: at most `max_scans` admissions per rolling window.
//!
//! The volatile tier is an in-process map of admission timestamps. When it
//! holds nothing for an identity (fresh process, or a quiet client), the
//! scan archive is consulted and its timestamps seed the map, so a restart
//! does not reset anyone's budget. Archive read failures fail open.

use std::collections::HashMap;
use std::sync::Arc;

use aioscan_core::AppConfig;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use crate::store::ScanStore;

/// Who a scan is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClientIdentity {
    Address(String),
    /// Requests with no usable address share one bucket, tracked in memory only.
    Anonymous,
}

impl ClientIdentity {
    #[must_use]
    pub fn from_address(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(addr) if !addr.is_empty() => Self::Address(addr.to_string()),
            _ => Self::Anonymous,
        }
    }

    /// The value stored on archive records, if this identity is persistable.
    #[must_use]
    pub fn persistable(&self) -> Option<&str> {
        match self {
            Self::Address(addr) => Some(addr),
            Self::Anonymous => None,
        }
    }
}

impl std::fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Address(addr) => f.write_str(addr),
            Self::Anonymous => f.write_str("anonymous"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Limited { retry_after_secs: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_scans: usize,
    pub window: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_scans: 10,
            window: Duration::hours(24),
        }
    }
}

impl RateLimitPolicy {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_scans: config.scan_limit,
            window: Duration::hours(config.scan_window_hours),
        }
    }

    /// Admissions at or before this instant no longer count at `now`.
    #[must_use]
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

pub struct RateLimiter {
    policy: RateLimitPolicy,
    store: Arc<dyn ScanStore>,
    admissions: Mutex<HashMap<ClientIdentity, Vec<DateTime<Utc>>>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(policy: RateLimitPolicy, store: Arc<dyn ScanStore>) -> Self {
        Self {
            policy,
            store,
            admissions: Mutex::new(HashMap::new()),
        }
    }

    pub async fn admit(&self, identity: &ClientIdentity) -> Admission {
        self.admit_at(identity, Utc::now()).await
    }

    /// Admit or reject one scan for `identity` at `now`, recording it on success.
    pub async fn admit_at(&self, identity: &ClientIdentity, now: DateTime<Utc>) -> Admission {
        let window_start = self.policy.window_start(now);

        let durable_key = {
            let mut admissions = self.admissions.lock().await;
            let times = admissions.entry(identity.clone()).or_default();
            times.retain(|t| *t > window_start);
            match identity.persistable() {
                Some(key) if times.is_empty() => key.to_string(),
                _ => return self.check_and_record(times, now),
            }
        };

        // The map lock is not held across the archive read.
        let seeded = match self
            .store
            .identity_scan_times_since(&durable_key, window_start, self.policy.max_scans)
            .await
        {
            Ok(times) => times,
            Err(e) => {
                tracing::warn!(
                    identity = %identity,
                    error = %e,
                    "durable rate-limit lookup failed; admitting on volatile state only"
                );
                Vec::new()
            }
        };

        let mut admissions = self.admissions.lock().await;
        let times = admissions.entry(identity.clone()).or_default();
        times.retain(|t| *t > window_start);
        // A concurrent request may have seeded this identity while we were reading.
        if times.is_empty() {
            times.extend(seeded.into_iter().filter(|t| *t > window_start));
        }
        self.check_and_record(times, now)
    }

    /// Drop identities with no admissions inside the window ending at `now`.
    /// Returns how many were removed.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let window_start = self.policy.window_start(now);
        let mut admissions = self.admissions.lock().await;
        let before = admissions.len();
        admissions.retain(|_, times| {
            times.retain(|t| *t > window_start);
            !times.is_empty()
        });
        before - admissions.len()
    }

    fn check_and_record(&self, times: &mut Vec<DateTime<Utc>>, now: DateTime<Utc>) -> Admission {
        if times.len() >= self.policy.max_scans {
            let oldest = times.iter().min().copied().unwrap_or(now);
            let remaining = oldest
                .checked_add_signed(self.policy.window)
                .map_or(i64::MAX / 1000, |expires| {
                    (expires - now).num_milliseconds()
                });
            let secs = remaining.saturating_add(999) / 1000;
            return Admission::Limited {
                retry_after_secs: u64::try_from(secs.max(1)).unwrap_or(1),
            };
        }
        times.push(now);
        Admission::Allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::InMemoryStore;

    fn limiter(store: &Arc<InMemoryStore>) -> RateLimiter {
        RateLimiter::new(RateLimitPolicy::default(), store.clone())
    }

    fn addr(a: &str) -> ClientIdentity {
        ClientIdentity::Address(a.to_string())
    }

    #[tokio::test]
    async fn tenth_admission_passes_eleventh_is_limited() {
        let store = Arc::new(InMemoryStore::default());
        let limiter = limiter(&store);
        let id = addr("203.0.113.9");
        let start = Utc::now();

        for i in 0..10 {
            let now = start + Duration::minutes(i);
            assert_eq!(limiter.admit_at(&id, now).await, Admission::Allowed, "admission {i}");
        }

        let now = start + Duration::minutes(10);
        match limiter.admit_at(&id, now).await {
            Admission::Limited { retry_after_secs } => {
                // Oldest admission leaves the window 24h after `start`.
                assert_eq!(retry_after_secs, 24 * 3600 - 600);
            }
            Admission::Allowed => panic!("eleventh admission should be limited"),
        }
    }

    #[tokio::test]
    async fn window_rolls_forward() {
        let store = Arc::new(InMemoryStore::default());
        let limiter = limiter(&store);
        let id = addr("203.0.113.9");
        let start = Utc::now();

        for _ in 0..10 {
            limiter.admit_at(&id, start).await;
        }
        assert!(matches!(
            limiter.admit_at(&id, start + Duration::hours(23)).await,
            Admission::Limited { .. }
        ));
        assert_eq!(
            limiter.admit_at(&id, start + Duration::hours(24)).await,
            Admission::Allowed
        );
    }

    #[tokio::test]
    async fn identities_have_separate_budgets() {
        let store = Arc::new(InMemoryStore::default());
        let limiter = limiter(&store);
        let now = Utc::now();

        for _ in 0..10 {
            limiter.admit_at(&ClientIdentity::Anonymous, now).await;
        }
        assert!(matches!(
            limiter.admit_at(&ClientIdentity::Anonymous, now).await,
            Admission::Limited { .. }
        ));
        assert_eq!(limiter.admit_at(&addr("198.51.100.2"), now).await, Admission::Allowed);
    }

    #[tokio::test]
    async fn anonymous_never_reads_the_archive() {
        let store = Arc::new(InMemoryStore::default());
        let limiter = limiter(&store);

        limiter.admit_at(&ClientIdentity::Anonymous, Utc::now()).await;
        assert_eq!(store.identity_reads(), 0);
    }

    #[tokio::test]
    async fn durable_tier_seeds_after_restart() {
        let store = Arc::new(InMemoryStore::default());
        let now = Utc::now();
        for h in 1..=10 {
            store.archive_at("example.com", Some("203.0.113.9"), now - Duration::hours(h));
        }

        let limiter = limiter(&store);
        match limiter.admit_at(&addr("203.0.113.9"), now).await {
            Admission::Limited { retry_after_secs } => {
                // Oldest archived scan is 10h old.
                assert_eq!(retry_after_secs, 14 * 3600);
            }
            Admission::Allowed => panic!("archive shows a full budget"),
        }

        // Seeded: the next check is answered from memory.
        limiter.admit_at(&addr("203.0.113.9"), now).await;
        assert_eq!(store.identity_reads(), 1);
    }

    #[tokio::test]
    async fn partial_archive_history_counts_toward_budget() {
        let store = Arc::new(InMemoryStore::default());
        let now = Utc::now();
        for h in 1..=8 {
            store.archive_at("example.com", Some("203.0.113.9"), now - Duration::hours(h));
        }
        store.archive_at("example.com", Some("203.0.113.9"), now - Duration::hours(30));

        let limiter = limiter(&store);
        let id = addr("203.0.113.9");
        assert_eq!(limiter.admit_at(&id, now).await, Admission::Allowed);
        assert_eq!(limiter.admit_at(&id, now).await, Admission::Allowed);
        assert!(matches!(limiter.admit_at(&id, now).await, Admission::Limited { .. }));
    }

    #[tokio::test]
    async fn durable_failure_fails_open() {
        let store = Arc::new(InMemoryStore::default());
        store.fail_identity_reads(true);
        let limiter = limiter(&store);

        assert_eq!(
            limiter.admit_at(&addr("203.0.113.9"), Utc::now()).await,
            Admission::Allowed
        );
    }

    #[tokio::test]
    async fn sweep_drops_idle_identities() {
        let store = Arc::new(InMemoryStore::default());
        let limiter = limiter(&store);
        let start = Utc::now();

        limiter.admit_at(&addr("a"), start).await;
        limiter.admit_at(&addr("b"), start + Duration::hours(20)).await;

        assert_eq!(limiter.sweep_at(start + Duration::hours(25)).await, 1);
        assert_eq!(limiter.sweep_at(start + Duration::hours(50)).await, 1);
    }

    #[tokio::test]
    async fn oversized_window_limits_without_panicking() {
        let store = Arc::new(InMemoryStore::default());
        let limiter = RateLimiter::new(
            RateLimitPolicy {
                max_scans: 1,
                window: Duration::hours(10_000_000_000),
            },
            store.clone(),
        );
        let id = addr("203.0.113.9");
        let now = Utc::now();

        assert_eq!(limiter.admit_at(&id, now).await, Admission::Allowed);
        let Admission::Limited { retry_after_secs } = limiter.admit_at(&id, now).await else {
            panic!("second admission inside the window must be limited");
        };
        assert!(retry_after_secs > 3600);
        assert_eq!(limiter.sweep_at(now).await, 0);
    }

    #[test]
    fn identity_from_blank_address_is_anonymous() {
        assert_eq!(ClientIdentity::from_address(Some("  ")), ClientIdentity::Anonymous);
        assert_eq!(ClientIdentity::from_address(None), ClientIdentity::Anonymous);
        assert_eq!(
            ClientIdentity::from_address(Some(" 10.0.0.1 ")).persistable(),
            Some("10.0.0.1")
        );
    }
}
