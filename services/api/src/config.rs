//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// Upper bound for `AUTH_SESSION_TTL_DAYS` (ten years).
pub const MAX_SESSION_TTL_DAYS: i64 = 3650;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub db_max_connections: u32,
    pub auth_session_ttl: chrono::Duration,
    pub min_password_length: usize,
    pub allowed_origin: String,
    /// How often a connected client's token is re-checked for revocation.
    pub revalidate_interval: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server and Database Settings ---
        let bind_address_str =
            lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let db_max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", 5u32)?;

        // --- Identity Settings ---
        let ttl_days = parse_or(&lookup, "AUTH_SESSION_TTL_DAYS", 30i64)?;
        if !(1..=MAX_SESSION_TTL_DAYS).contains(&ttl_days) {
            return Err(ConfigError::InvalidValue(
                "AUTH_SESSION_TTL_DAYS".to_string(),
                format!("must be between 1 and {}", MAX_SESSION_TTL_DAYS),
            ));
        }
        let auth_session_ttl = chrono::Duration::try_days(ttl_days).ok_or_else(|| {
            ConfigError::InvalidValue(
                "AUTH_SESSION_TTL_DAYS".to_string(),
                "out of range".to_string(),
            )
        })?;
        let min_password_length = parse_or(&lookup, "MIN_PASSWORD_LENGTH", 6usize)?;
        let revalidate_secs = parse_or(&lookup, "REVALIDATE_INTERVAL_SECS", 60u64)?;
        if revalidate_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "REVALIDATE_INTERVAL_SECS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let allowed_origin =
            lookup("ALLOWED_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            db_max_connections,
            auth_session_ttl,
            min_password_length,
            allowed_origin,
            revalidate_interval: Duration::from_secs(revalidate_secs),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
    }
}
