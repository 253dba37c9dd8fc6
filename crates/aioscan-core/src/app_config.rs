use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Credentials for the upstream keyword provider (HTTP basic auth).
#[derive(Clone)]
pub struct ProviderCredentials {
    pub login: String,
    pub password: String,
}

impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("login", &self.login)
            .field("password", &"[redacted]")
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub provider_credentials: Option<ProviderCredentials>,
    pub provider_base_url: String,
    pub provider_timeout_secs: u64,
    pub provider_result_limit: u32,
    pub provider_location_code: u32,
    pub provider_language_code: String,
    pub scan_limit: usize,
    pub scan_window_hours: i64,
    pub cache_ttl_hours: i64,
    pub top_keywords: usize,
    pub burst_limit: usize,
    pub burst_window_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("provider_credentials", &self.provider_credentials)
            .field("provider_base_url", &self.provider_base_url)
            .field("provider_timeout_secs", &self.provider_timeout_secs)
            .field("provider_result_limit", &self.provider_result_limit)
            .field("provider_location_code", &self.provider_location_code)
            .field("provider_language_code", &self.provider_language_code)
            .field("scan_limit", &self.scan_limit)
            .field("scan_window_hours", &self.scan_window_hours)
            .field("cache_ttl_hours", &self.cache_ttl_hours)
            .field("top_keywords", &self.top_keywords)
            .field("burst_limit", &self.burst_limit)
            .field("burst_window_secs", &self.burst_window_secs)
            .finish()
    }
}
