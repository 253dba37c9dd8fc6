mod api;
mod middleware;
mod scheduler;

use std::{sync::Arc, time::Duration};

use aioscan_dataforseo::DataForSeoClient;
use aioscan_scanner::{PgScanStore, RateLimitPolicy, RateLimiter, ScanCoordinator, ScanPolicy};
use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    middleware::BurstLimitState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = aioscan_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = aioscan_db::PoolConfig::from_app_config(&config);
    let pool = aioscan_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = aioscan_db::run_migrations(&pool).await?;
    tracing::info!(applied, "database migrations complete");

    let client = DataForSeoClient::from_app_config(&config)
        .context("keyword provider client could not be configured")?;

    let store = Arc::new(PgScanStore::new(pool.clone()));
    let coordinator = ScanCoordinator::new(
        store.clone(),
        Arc::new(client),
        ScanPolicy::from_app_config(&config),
    );
    let limiter = Arc::new(RateLimiter::new(
        RateLimitPolicy::from_app_config(&config),
        store,
    ));

    let _scheduler =
        scheduler::build_scheduler(coordinator.aggregator().clone(), Arc::clone(&limiter)).await?;

    let burst = BurstLimitState::new(
        config.burst_limit,
        Duration::from_secs(config.burst_window_secs),
    );
    let app = build_app(
        AppState {
            pool,
            coordinator,
            limiter,
        },
        burst,
    );

    tracing::info!(addr = %config.bind_addr, env = %config.env, "aioscan server listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
