//! Backend configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//!
//! ## Optional
//! - `REDIS_URL` - Redis connection string for the shared cache backend.
//!   When unset the backend falls back to the in-process cache.
//! - `CACHE_TTL_SECONDS` - Default cache TTL in seconds (default: 300)
//! - `NOTIFICATION_QUEUE_CAPACITY` - Bounded notification queue depth
//!   (default: 1024)

use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;
const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Backend application configuration.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// Redis connection URL for the cache backend, if configured
    pub redis_url: Option<SecretString>,
    /// Default TTL applied to cache entries without an explicit TTL
    pub cache_ttl: Duration,
    /// Capacity of the bounded notification queue
    pub notification_queue_capacity: usize,
}

impl BackendConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_required_secret("DATABASE_URL")?;
        let redis_url = get_optional_env("REDIS_URL").map(SecretString::from);
        let cache_ttl = Duration::from_secs(parse_or_default(
            "CACHE_TTL_SECONDS",
            DEFAULT_CACHE_TTL_SECONDS,
        )?);
        let notification_queue_capacity =
            parse_or_default("NOTIFICATION_QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY)?;

        Ok(Self {
            database_url,
            redis_url,
            cache_ttl,
            notification_queue_capacity,
        })
    }
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    std::env::var(key)
        .map(SecretString::from)
        .map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Parse an optional environment variable, falling back to a default.
fn parse_or_default<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidEnvVar(key.to_string(), raw)),
        Err(_) => Ok(default),
    }
}
