//! In-memory store and scripted keyword source for scanner tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use aioscan_core::{DomainCounters, GlobalStats, ScoredKeyword};
use aioscan_dataforseo::DataForSeoError;
use aioscan_db::{DbError, DomainRow, LatestScanRow, ScanRow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::source::KeywordSource;
use crate::store::ScanStore;

fn unavailable() -> DbError {
    DbError::Sqlx(sqlx::Error::PoolTimedOut)
}

#[derive(Default)]
struct Tables {
    scans: Vec<ScanRow>,
    domains: HashMap<String, DomainRow>,
    keywords: HashMap<String, Vec<ScoredKeyword>>,
    stats: Option<GlobalStats>,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
    identity_reads: AtomicUsize,
    fail_identity_reads: AtomicBool,
    fail_upserts: AtomicBool,
    fresh_reads: AtomicUsize,
    slow_fresh_read: Mutex<Option<(usize, StdDuration)>>,
}

impl InMemoryStore {
    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().expect("store lock poisoned")
    }

    pub fn archive_at(&self, domain: &str, identity: Option<&str>, created_at: DateTime<Utc>) {
        self.archive_payload_at(domain, identity, json!({}), created_at);
    }

    pub fn archive_payload_at(
        &self,
        domain: &str,
        identity: Option<&str>,
        raw_response: serde_json::Value,
        created_at: DateTime<Utc>,
    ) {
        self.tables().scans.push(ScanRow {
            id: Uuid::new_v4(),
            domain: domain.to_string(),
            raw_response,
            client_identity: identity.map(ToOwned::to_owned),
            created_at,
        });
    }

    pub fn put_domain(&self, row: DomainRow, keywords: Vec<ScoredKeyword>) {
        let mut tables = self.tables();
        tables.keywords.insert(row.domain.clone(), keywords);
        tables.domains.insert(row.domain.clone(), row);
    }

    pub fn domain_row(&self, domain: &str) -> Option<DomainRow> {
        self.tables().domains.get(domain).cloned()
    }

    pub fn keywords_of(&self, domain: &str) -> Vec<ScoredKeyword> {
        self.tables().keywords.get(domain).cloned().unwrap_or_default()
    }

    pub fn scan_count(&self) -> usize {
        self.tables().scans.len()
    }

    pub fn stored_stats(&self) -> Option<GlobalStats> {
        self.tables().stats.clone()
    }

    pub fn identity_reads(&self) -> usize {
        self.identity_reads.load(Ordering::SeqCst)
    }

    pub fn fail_identity_reads(&self, fail: bool) {
        self.fail_identity_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::SeqCst);
    }

    /// The `nth` freshness read (1-based) takes its snapshot immediately but
    /// returns only after `delay`.
    pub fn delay_fresh_read(&self, nth: usize, delay: StdDuration) {
        *self
            .slow_fresh_read
            .lock()
            .expect("store lock poisoned") = Some((nth, delay));
    }

    pub fn fresh_reads(&self) -> usize {
        self.fresh_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScanStore for InMemoryStore {
    async fn insert_scan(
        &self,
        domain: &str,
        raw_response: &serde_json::Value,
        client_identity: Option<&str>,
    ) -> Result<ScanRow, DbError> {
        let row = ScanRow {
            id: Uuid::new_v4(),
            domain: domain.to_string(),
            raw_response: raw_response.clone(),
            client_identity: client_identity.map(ToOwned::to_owned),
            created_at: Utc::now(),
        };
        self.tables().scans.push(row.clone());
        Ok(row)
    }

    async fn identity_scan_times_since(
        &self,
        identity: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<DateTime<Utc>>, DbError> {
        self.identity_reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_identity_reads.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let mut times: Vec<DateTime<Utc>> = self
            .tables()
            .scans
            .iter()
            .filter(|s| s.client_identity.as_deref() == Some(identity) && s.created_at > since)
            .map(|s| s.created_at)
            .collect();
        times.sort_unstable_by(|a, b| b.cmp(a));
        times.truncate(limit);
        times.reverse();
        Ok(times)
    }

    async fn latest_scans(&self) -> Result<Vec<LatestScanRow>, DbError> {
        let tables = self.tables();
        let mut by_domain: HashMap<&str, (&ScanRow, DateTime<Utc>)> = HashMap::new();
        for scan in &tables.scans {
            by_domain
                .entry(scan.domain.as_str())
                .and_modify(|(latest, first)| {
                    if scan.created_at > latest.created_at {
                        *latest = scan;
                    }
                    *first = (*first).min(scan.created_at);
                })
                .or_insert((scan, scan.created_at));
        }
        let mut rows: Vec<LatestScanRow> = by_domain
            .into_values()
            .map(|(latest, first)| LatestScanRow {
                id: latest.id,
                domain: latest.domain.clone(),
                raw_response: latest.raw_response.clone(),
                created_at: latest.created_at,
                first_created_at: first,
            })
            .collect();
        rows.sort_by(|a, b| a.domain.cmp(&b.domain));
        Ok(rows)
    }

    async fn domain(&self, domain: &str) -> Result<Option<DomainRow>, DbError> {
        Ok(self.domain_row(domain))
    }

    async fn fresh_domain(
        &self,
        domain: &str,
        fresh_since: DateTime<Utc>,
    ) -> Result<Option<DomainRow>, DbError> {
        let call = self.fresh_reads.fetch_add(1, Ordering::SeqCst) + 1;
        let row = self
            .domain_row(domain)
            .filter(|row| row.last_scanned_at >= fresh_since);
        let slow = *self.slow_fresh_read.lock().expect("store lock poisoned");
        if let Some((nth, delay)) = slow {
            if nth == call {
                tokio::time::sleep(delay).await;
            }
        }
        Ok(row)
    }

    async fn upsert_domain(&self, row: &DomainRow) -> Result<DomainRow, DbError> {
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let mut tables = self.tables();
        let mut stored = row.clone();
        if let Some(existing) = tables.domains.get(&row.domain) {
            stored.first_scanned_at = existing.first_scanned_at.min(row.first_scanned_at);
        }
        tables.domains.insert(row.domain.clone(), stored.clone());
        Ok(stored)
    }

    async fn domain_counters(&self) -> Result<Vec<DomainCounters>, DbError> {
        Ok(self.tables().domains.values().map(DomainRow::counters).collect())
    }

    async fn replace_keywords(
        &self,
        domain: &str,
        _scan_id: Option<Uuid>,
        keywords: &[ScoredKeyword],
    ) -> Result<(), DbError> {
        self.tables()
            .keywords
            .insert(domain.to_string(), keywords.to_vec());
        Ok(())
    }

    async fn top_keywords(
        &self,
        domain: &str,
        limit: usize,
    ) -> Result<Vec<ScoredKeyword>, DbError> {
        let mut keywords = self.keywords_of(domain);
        keywords.sort_by(|a, b| b.risk_score.total_cmp(&a.risk_score));
        keywords.truncate(limit);
        Ok(keywords)
    }

    async fn global_stats(&self) -> Result<Option<GlobalStats>, DbError> {
        Ok(self.stored_stats())
    }

    async fn write_global_stats(&self, stats: &GlobalStats) -> Result<(), DbError> {
        self.tables().stats = Some(stats.clone());
        Ok(())
    }
}

/// Keyword source returning a fixed payload after an optional delay,
/// counting every call.
pub struct ScriptedSource {
    payload: serde_json::Value,
    delay: StdDuration,
    fail: AtomicBool,
    calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl ScriptedSource {
    #[must_use]
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            payload,
            delay: StdDuration::ZERO,
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    /// Every fetch waits for a permit on `gate` before answering.
    #[must_use]
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    #[must_use]
    pub fn with_delay(mut self, delay: StdDuration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeywordSource for ScriptedSource {
    async fn fetch_ranked(&self, _domain: &str) -> Result<serde_json::Value, DataForSeoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(DataForSeoError::HttpStatus {
                status: 503,
                body: "maintenance".to_string(),
            });
        }
        Ok(self.payload.clone())
    }
}

/// A provider payload holding the given `(keyword, volume, rank, overview)` items.
#[must_use]
pub fn payload(items: &[(&str, i64, i64, bool)]) -> serde_json::Value {
    let items: Vec<serde_json::Value> = items
        .iter()
        .map(|(keyword, volume, rank, overview)| {
            let types = if *overview {
                json!(["ai_overview", "organic"])
            } else {
                json!(["organic"])
            };
            json!({
                "keyword_data": {
                    "keyword": keyword,
                    "keyword_info": { "search_volume": volume },
                    "search_intent_info": { "main_intent": "informational" },
                    "serp_info": { "serp_item_types": types }
                },
                "ranked_serp_element": { "serp_item": { "rank_absolute": rank, "etv": 1.0 } }
            })
        })
        .collect();
    json!({
        "status_code": 20000,
        "tasks": [{ "status_code": 20000, "result": [{ "items": items }] }]
    })
}
