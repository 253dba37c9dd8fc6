//! Command handlers for the CLI.
//!
//! Each handler builds the store and scanner pieces it needs over an
//! already-connected pool and prints its result as pretty JSON.

use std::sync::Arc;

use aioscan_core::AppConfig;
use aioscan_dataforseo::DataForSeoClient;
use aioscan_scanner::{
    rebuild_from_archive, PgScanStore, ScanCoordinator, ScanPolicy, ScanStore, StatsAggregator,
};
use anyhow::Context;
use serde_json::json;
use sqlx::PgPool;

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn coordinator(pool: PgPool, config: &AppConfig) -> anyhow::Result<ScanCoordinator> {
    let client = DataForSeoClient::from_app_config(config)
        .context("keyword provider client could not be configured")?;
    Ok(ScanCoordinator::new(
        Arc::new(PgScanStore::new(pool)),
        Arc::new(client),
        ScanPolicy::from_app_config(config),
    ))
}

/// Scan one domain through the same coordinator the server uses. The
/// per-client quota does not apply to operator scans.
///
/// # Errors
///
/// Returns an error if provider credentials are missing or the scan fails.
pub(crate) async fn run_scan(
    pool: PgPool,
    config: &AppConfig,
    domain: &str,
    identity: Option<&str>,
) -> anyhow::Result<()> {
    let result = coordinator(pool, config)?.scan(domain, identity).await?;
    tracing::info!(
        domain = %result.domain,
        keywords = result.stats.total,
        "scan complete"
    );
    print_json(&result)
}

/// Print the persisted record of a domain, if any.
///
/// # Errors
///
/// Returns an error if the domain is malformed or the store read fails.
pub(crate) async fn run_lookup(pool: PgPool, config: &AppConfig, domain: &str) -> anyhow::Result<()> {
    let coordinator = ScanCoordinator::new(
        Arc::new(PgScanStore::new(pool)),
        Arc::new(OfflineSource),
        ScanPolicy::from_app_config(config),
    );
    match coordinator.lookup(domain).await? {
        Some(report) => print_json(&report),
        None => {
            println!("{domain} has not been scanned");
            Ok(())
        }
    }
}

/// Replay the archive into domain and keyword records.
///
/// # Errors
///
/// Returns an error if the archive cannot be read or the final stats
/// recomputation fails. Per-domain failures are counted in the report.
pub(crate) async fn run_rebuild(pool: PgPool) -> anyhow::Result<()> {
    let store: Arc<dyn ScanStore> = Arc::new(PgScanStore::new(pool));
    let aggregator = StatsAggregator::new(Arc::clone(&store));
    let report = rebuild_from_archive(&*store, &aggregator).await?;
    if report.domains_failed > 0 {
        tracing::warn!(failed = report.domains_failed, "some domains could not be rebuilt");
    }
    print_json(&report)
}

/// Print the stored global stats and their presentation view.
///
/// # Errors
///
/// Returns an error if the stats cannot be read or recomputed.
pub(crate) async fn run_stats(pool: PgPool, reconcile: bool) -> anyhow::Result<()> {
    let aggregator = StatsAggregator::new(Arc::new(PgScanStore::new(pool)));
    let stats = if reconcile {
        let outcome = aggregator.reconcile().await?;
        if outcome.drifted {
            println!("stored stats had drifted; rewritten");
        }
        outcome.stats
    } else {
        aggregator.snapshot().await?
    };
    let view = stats.view();
    print_json(&json!({ "stats": stats, "view": view }))
}

/// Keyword source for read-only commands that must never reach the provider.
struct OfflineSource;

#[async_trait::async_trait]
impl aioscan_scanner::KeywordSource for OfflineSource {
    async fn fetch_ranked(
        &self,
        _domain: &str,
    ) -> Result<serde_json::Value, aioscan_dataforseo::DataForSeoError> {
        Err(aioscan_dataforseo::DataForSeoError::MissingCredentials)
    }
}
