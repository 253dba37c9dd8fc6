use thiserror::Error;

/// Errors returned by the `DataForSEO` API client.
#[derive(Debug, Error)]
pub enum DataForSeoError {
    /// Network, TLS, or timeout failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-2xx HTTP status.
    #[error("DataForSEO returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// Login or password is not configured.
    #[error("DataForSEO credentials not configured")]
    MissingCredentials,

    /// The configured base URL could not be parsed.
    #[error("invalid DataForSEO base URL '{0}'")]
    InvalidBaseUrl(String),

    /// The response envelope carried a `status_code` other than 20000.
    #[error("DataForSEO API error {status_code}: {message}")]
    ApiError { status_code: i64, message: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}
