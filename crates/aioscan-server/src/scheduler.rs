//! Background job scheduler.
//!
//! Registers the hourly global-stats reconciliation and the scan-quota
//! sweep on a [`JobScheduler`] started at server boot.

use std::sync::Arc;

use aioscan_scanner::{RateLimiter, StatsAggregator};
use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Top of every hour, UTC.
const HOURLY: &str = "0 0 * * * *";

/// Builds and starts the background job scheduler.
///
/// The returned handle must be kept alive for the lifetime of the process;
/// dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    aggregator: StatsAggregator,
    limiter: Arc<RateLimiter>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_reconcile_job(&scheduler, aggregator).await?;
    register_quota_sweep_job(&scheduler, limiter).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Recompute global statistics from every domain record and overwrite the
/// stored row, repairing drift left by failed post-scan recomputations.
async fn register_reconcile_job(
    scheduler: &JobScheduler,
    aggregator: StatsAggregator,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(HOURLY, move |_uuid, _lock| {
        let aggregator = aggregator.clone();

        Box::pin(async move {
            tracing::info!("scheduler: starting global stats reconciliation");
            match aggregator.reconcile().await {
                Ok(outcome) => tracing::info!(
                    drifted = outcome.drifted,
                    total_domains = outcome.stats.total_domains,
                    "scheduler: global stats reconciliation complete"
                ),
                Err(e) => {
                    tracing::error!(error = %e, "scheduler: global stats reconciliation failed");
                }
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Drop scan-quota timestamps that have aged out of the window.
async fn register_quota_sweep_job(
    scheduler: &JobScheduler,
    limiter: Arc<RateLimiter>,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(HOURLY, move |_uuid, _lock| {
        let limiter = Arc::clone(&limiter);

        Box::pin(async move {
            let removed = limiter.sweep_at(Utc::now()).await;
            tracing::info!(removed, "scheduler: scan quota sweep complete");
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
