//! Scan orchestration: per-client quota, single-flight coordinator, global
//! stats aggregation and archive replay.

pub mod aggregate;
pub mod coordinator;
pub mod error;
pub mod rate_limit;
pub mod rebuild;
pub mod source;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use aggregate::{Reconciliation, StatsAggregator};
pub use coordinator::{DomainReport, ScanCoordinator, ScanPolicy, ScanResult};
pub use error::ScanError;
pub use rate_limit::{Admission, ClientIdentity, RateLimitPolicy, RateLimiter};
pub use rebuild::{rebuild_from_archive, RebuildReport};
pub use source::KeywordSource;
pub use store::{PgScanStore, ScanStore};
