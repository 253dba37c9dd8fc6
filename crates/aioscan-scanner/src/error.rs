use aioscan_core::DomainError;
use aioscan_dataforseo::DataForSeoError;
use aioscan_db::DbError;
use thiserror::Error;

/// Failure of a scan request, as seen by every caller sharing it.
///
/// Cloneable so one in-flight failure can be handed to all waiters; the
/// underlying library errors are flattened into messages for that reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error(transparent)]
    InvalidFormat(#[from] DomainError),

    #[error("scan limit reached, try again in {retry_after_hours} hour(s)")]
    RateLimited {
        retry_after_secs: u64,
        retry_after_hours: u64,
    },

    #[error("keyword provider unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("failed to persist scan: {0}")]
    PersistenceFailure(String),
}

impl ScanError {
    #[must_use]
    pub fn rate_limited(retry_after_secs: u64) -> Self {
        Self::RateLimited {
            retry_after_secs,
            retry_after_hours: retry_after_secs.div_ceil(3600),
        }
    }

    /// Stable machine-readable category.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFormat(_) => "invalid_format",
            Self::RateLimited { .. } => "rate_limited",
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
            Self::PersistenceFailure(_) => "internal_error",
        }
    }
}

impl From<DataForSeoError> for ScanError {
    fn from(err: DataForSeoError) -> Self {
        Self::UpstreamUnavailable(err.to_string())
    }
}

impl From<DbError> for ScanError {
    fn from(err: DbError) -> Self {
        Self::PersistenceFailure(err.to_string())
    }
}
