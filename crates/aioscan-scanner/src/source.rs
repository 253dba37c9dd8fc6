use aioscan_dataforseo::{DataForSeoClient, DataForSeoError};
use async_trait::async_trait;

/// Upstream provider of a domain's ranked keywords, as a raw payload.
#[async_trait]
pub trait KeywordSource: Send + Sync {
    async fn fetch_ranked(&self, domain: &str) -> Result<serde_json::Value, DataForSeoError>;
}

#[async_trait]
impl KeywordSource for DataForSeoClient {
    async fn fetch_ranked(&self, domain: &str) -> Result<serde_json::Value, DataForSeoError> {
        self.ranked_keywords(domain).await
    }
}
