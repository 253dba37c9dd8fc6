use std::str::FromStr;

use crate::app_config::{AppConfig, Environment, ProviderCredentials};
use crate::ConfigError;

const DEFAULT_PROVIDER_BASE_URL: &str = "https://api.dataforseo.com/";

/// Upper bound for the scan window and cache TTL: one year.
const MAX_WINDOW_HOURS: i64 = 24 * 365;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("AIOSCAN_ENV", "development"));

    let bind_addr = parse_var(&or_default("AIOSCAN_BIND_ADDR", "0.0.0.0:3000"), "AIOSCAN_BIND_ADDR")?;
    let log_level = or_default("AIOSCAN_LOG_LEVEL", "info");

    let db_max_connections = parse_var(&or_default("AIOSCAN_DB_MAX_CONNECTIONS", "10"), "AIOSCAN_DB_MAX_CONNECTIONS")?;
    let db_min_connections = parse_var(&or_default("AIOSCAN_DB_MIN_CONNECTIONS", "1"), "AIOSCAN_DB_MIN_CONNECTIONS")?;
    let db_acquire_timeout_secs = parse_var(
        &or_default("AIOSCAN_DB_ACQUIRE_TIMEOUT_SECS", "10"),
        "AIOSCAN_DB_ACQUIRE_TIMEOUT_SECS",
    )?;

    // Both halves must be present; a lone login or password is treated as unset.
    let provider_credentials = match (lookup("DATAFORSEO_LOGIN"), lookup("DATAFORSEO_PASSWORD")) {
        (Ok(login), Ok(password)) if !login.is_empty() && !password.is_empty() => {
            Some(ProviderCredentials { login, password })
        }
        _ => None,
    };
    let provider_base_url = or_default("AIOSCAN_PROVIDER_BASE_URL", DEFAULT_PROVIDER_BASE_URL);
    let provider_timeout_secs = parse_nonzero(
        &or_default("AIOSCAN_PROVIDER_TIMEOUT_SECS", "30"),
        "AIOSCAN_PROVIDER_TIMEOUT_SECS",
    )?;
    let provider_result_limit = parse_nonzero(
        &or_default("AIOSCAN_PROVIDER_RESULT_LIMIT", "50"),
        "AIOSCAN_PROVIDER_RESULT_LIMIT",
    )?;
    let provider_location_code = parse_var(
        &or_default("AIOSCAN_PROVIDER_LOCATION_CODE", "2840"),
        "AIOSCAN_PROVIDER_LOCATION_CODE",
    )?;
    let provider_language_code = or_default("AIOSCAN_PROVIDER_LANGUAGE_CODE", "en");

    let scan_limit = parse_nonzero(&or_default("AIOSCAN_SCAN_LIMIT", "10"), "AIOSCAN_SCAN_LIMIT")?;
    let scan_window_hours = parse_window_hours(
        &or_default("AIOSCAN_SCAN_WINDOW_HOURS", "24"),
        "AIOSCAN_SCAN_WINDOW_HOURS",
    )?;
    let cache_ttl_hours = parse_window_hours(
        &or_default("AIOSCAN_CACHE_TTL_HOURS", "24"),
        "AIOSCAN_CACHE_TTL_HOURS",
    )?;
    let top_keywords =
        parse_nonzero(&or_default("AIOSCAN_TOP_KEYWORDS", "15"), "AIOSCAN_TOP_KEYWORDS")?;
    let burst_limit = parse_nonzero(&or_default("AIOSCAN_BURST_LIMIT", "30"), "AIOSCAN_BURST_LIMIT")?;
    let burst_window_secs = parse_nonzero(
        &or_default("AIOSCAN_BURST_WINDOW_SECS", "3600"),
        "AIOSCAN_BURST_WINDOW_SECS",
    )?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        provider_credentials,
        provider_base_url,
        provider_timeout_secs,
        provider_result_limit,
        provider_location_code,
        provider_language_code,
        scan_limit,
        scan_window_hours,
        cache_ttl_hours,
        top_keywords,
        burst_limit,
        burst_window_secs,
    })
}

fn parse_var<T>(raw: &str, var: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: e.to_string(),
    })
}

fn parse_nonzero<T>(raw: &str, var: &str) -> Result<T, ConfigError>
where
    T: FromStr + Default + PartialEq,
    T::Err: std::fmt::Display,
{
    let value: T = parse_var(raw, var)?;
    if value == T::default() {
        return Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

fn parse_window_hours(raw: &str, var: &str) -> Result<i64, ConfigError> {
    let hours: i64 = parse_var(raw, var)?;
    if !(1..=MAX_WINDOW_HOURS).contains(&hours) {
        return Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("must be between 1 and {MAX_WINDOW_HOURS} hours, got {hours}"),
        });
    }
    Ok(hours)
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}
