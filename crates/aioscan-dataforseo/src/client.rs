//! HTTP client for the `DataForSEO` Labs ranked-keywords endpoint.
//!
//! Wraps `reqwest` with basic-auth credentials, a bounded timeout, and
//! envelope checking. The client returns the raw JSON payload untouched so
//! callers can archive it before parsing; see [`crate::parse`].

use std::time::Duration;

use aioscan_core::{AppConfig, ProviderCredentials};
use reqwest::{Client, Url};
use serde::Serialize;

use crate::error::DataForSeoError;

const DEFAULT_BASE_URL: &str = "https://api.dataforseo.com/";
const RANKED_KEYWORDS_PATH: &str = "v3/dataforseo_labs/google/ranked_keywords/live";
const STATUS_OK: i64 = 20_000;
const ERROR_BODY_EXCERPT_CHARS: usize = 512;

/// Market and size parameters sent with every ranked-keywords task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedKeywordsQuery {
    pub location_code: u32,
    pub language_code: String,
    pub limit: u32,
}

impl Default for RankedKeywordsQuery {
    fn default() -> Self {
        Self {
            location_code: 2840,
            language_code: "en".to_string(),
            limit: 50,
        }
    }
}

#[derive(Debug, Serialize)]
struct TaskRequest<'a> {
    target: &'a str,
    location_code: u32,
    language_code: &'a str,
    limit: u32,
}

/// Client for the `DataForSEO` REST API.
///
/// Use [`DataForSeoClient::new`] for production or
/// [`DataForSeoClient::with_base_url`] to point at a mock server in tests.
pub struct DataForSeoClient {
    client: Client,
    credentials: ProviderCredentials,
    base_url: Url,
    query: RankedKeywordsQuery,
}

impl DataForSeoClient {
    /// Creates a client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`DataForSeoError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(credentials: ProviderCredentials, timeout_secs: u64) -> Result<Self, DataForSeoError> {
        Self::with_base_url(credentials, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`DataForSeoError::Http`] if the `reqwest::Client` cannot be
    /// constructed, or [`DataForSeoError::InvalidBaseUrl`] if `base_url` does
    /// not parse.
    pub fn with_base_url(
        credentials: ProviderCredentials,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, DataForSeoError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("aioscan/0.1 (overview-check)")
            .build()?;

        // Exactly one trailing slash, so joining the endpoint path appends
        // rather than replacing the last segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .map_err(|e| DataForSeoError::InvalidBaseUrl(format!("{base_url}: {e}")))?;

        Ok(Self {
            client,
            credentials,
            base_url,
            query: RankedKeywordsQuery::default(),
        })
    }

    /// Builds a client from application config.
    ///
    /// # Errors
    ///
    /// Returns [`DataForSeoError::MissingCredentials`] when login or password
    /// is unset, plus any error from [`DataForSeoClient::with_base_url`].
    pub fn from_app_config(config: &AppConfig) -> Result<Self, DataForSeoError> {
        let credentials = config
            .provider_credentials
            .clone()
            .ok_or(DataForSeoError::MissingCredentials)?;

        Ok(Self::with_base_url(
            credentials,
            config.provider_timeout_secs,
            &config.provider_base_url,
        )?
        .with_query(RankedKeywordsQuery {
            location_code: config.provider_location_code,
            language_code: config.provider_language_code.clone(),
            limit: config.provider_result_limit,
        }))
    }

    #[must_use]
    pub fn with_query(mut self, query: RankedKeywordsQuery) -> Self {
        self.query = query;
        self
    }

    /// Fetches the ranked keywords of `domain` and returns the raw payload.
    ///
    /// # Errors
    ///
    /// - [`DataForSeoError::Http`] on network failure or timeout.
    /// - [`DataForSeoError::HttpStatus`] on a non-2xx response.
    /// - [`DataForSeoError::Deserialize`] if the body is not JSON.
    /// - [`DataForSeoError::ApiError`] if the envelope `status_code` is not 20000.
    pub async fn ranked_keywords(&self, domain: &str) -> Result<serde_json::Value, DataForSeoError> {
        let url = self.endpoint_url()?;
        let body = [TaskRequest {
            target: domain,
            location_code: self.query.location_code,
            language_code: &self.query.language_code,
            limit: self.query.limit,
        }];

        tracing::debug!(domain, %url, "requesting ranked keywords");

        let response = self
            .client
            .post(url.clone())
            .basic_auth(&self.credentials.login, Some(&self.credentials.password))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(DataForSeoError::HttpStatus {
                status: status.as_u16(),
                body: excerpt(&text),
            });
        }

        let payload: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| DataForSeoError::Deserialize {
                context: format!("ranked_keywords(target={domain})"),
                source: e,
            })?;
        Self::check_api_error(&payload)?;

        Ok(payload)
    }

    fn endpoint_url(&self) -> Result<Url, DataForSeoError> {
        self.base_url
            .join(RANKED_KEYWORDS_PATH)
            .map_err(|e| DataForSeoError::InvalidBaseUrl(format!("{}: {e}", self.base_url)))
    }

    /// Checks the envelope-level `status_code`, then the first task's; anything
    /// but 20000 at either level is a failure.
    ///
    /// A task-level failure carries no ranked items, so passing it on would
    /// overwrite a stored record with an empty one.
    fn check_api_error(body: &serde_json::Value) -> Result<(), DataForSeoError> {
        Self::check_status(body)?;
        match body
            .get("tasks")
            .and_then(serde_json::Value::as_array)
            .and_then(|tasks| tasks.first())
        {
            Some(task) if task.get("status_code").is_some() => Self::check_status(task),
            _ => Ok(()),
        }
    }

    fn check_status(node: &serde_json::Value) -> Result<(), DataForSeoError> {
        let status_code = node
            .get("status_code")
            .and_then(serde_json::Value::as_i64)
            .unwrap_or_default();
        if status_code == STATUS_OK {
            return Ok(());
        }

        let message = node
            .get("status_message")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        Err(DataForSeoError::ApiError {
            status_code,
            message,
        })
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= ERROR_BODY_EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let mut cut: String = trimmed.chars().take(ERROR_BODY_EXCERPT_CHARS).collect();
    cut.push_str("...");
    cut
}
