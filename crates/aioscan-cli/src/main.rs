mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "aioscan-cli")]
#[command(about = "AI overview exposure scanner command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Scan a domain, serving a fresh cached record when one exists
    Scan {
        /// Domain or URL to scan (e.g., example.com)
        domain: String,
        /// Identity recorded on the archived scan
        #[arg(long)]
        identity: Option<String>,
    },
    /// Show the persisted record of a domain without fetching
    Lookup {
        /// Domain or URL to look up
        domain: String,
    },
    /// Rebuild domain and keyword records from the scan archive
    Rebuild,
    /// Show global statistics
    Stats {
        /// Recompute from every domain record before printing
        #[arg(long)]
        reconcile: bool,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    let config = aioscan_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let Some(command) = cli.command else {
        println!("aioscan-cli: run with --help to list commands");
        return Ok(());
    };

    let pool_config = aioscan_db::PoolConfig::from_app_config(&config);
    let pool = aioscan_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            aioscan_db::health_check(&pool).await?;
            println!("database ok");
        }
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let applied = aioscan_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Commands::Scan { domain, identity } => {
            commands::run_scan(pool, &config, &domain, identity.as_deref()).await?;
        }
        Commands::Lookup { domain } => commands::run_lookup(pool, &config, &domain).await?,
        Commands::Rebuild => commands::run_rebuild(pool).await?,
        Commands::Stats { reconcile } => commands::run_stats(pool, reconcile).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests;
