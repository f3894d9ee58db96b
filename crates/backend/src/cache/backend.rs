//! Key-value backend capability consumed by [`crate::cache::CacheStore`].

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors a backend may report. The store logs and absorbs every one of
/// these; they never cross the cache boundary.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing service is unreachable or refused the operation.
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

/// Minimal key-value capability: get, set-with-TTL, delete, delete-by-prefix,
/// clear. Values cross this boundary as serialized JSON text, keeping the
/// backend storage-agnostic.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetch the value stored at `key`, if present and not expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` at `key` for `ttl`. TTL is always finite.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Remove the entry at `key`, if any.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Remove every entry whose key starts with `prefix`.
    async fn delete_by_prefix(&self, prefix: &str) -> Result<(), CacheError>;

    /// Remove everything.
    async fn clear(&self) -> Result<(), CacheError>;
}
