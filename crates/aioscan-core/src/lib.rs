pub mod app_config;
pub mod config;
pub mod domain;
pub mod keywords;
pub mod stats;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, ProviderCredentials};
pub use config::{load_app_config, load_app_config_from_env};
pub use domain::{normalize_domain, DomainError};
pub use keywords::{
    risk_score, top_by_risk, DisplayKeyword, IntentCounts, KeywordStats, ScoredKeyword,
    SearchIntent, SummaryCounts,
};
pub use stats::{
    compute_global_stats, percent_one_decimal, DomainCounters, GlobalStats, Severity,
    SeverityHistogram, StatsView,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
