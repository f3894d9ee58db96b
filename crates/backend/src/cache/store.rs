//! Cache store: total operations over an injected backend.
//!
//! Every method here is a total function from the caller's perspective. If
//! the backend is unreachable, `get` reports a miss and mutations become
//! no-ops; the failure is logged, never surfaced.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, trace, warn};

use super::backend::CacheBackend;

/// Thin capability over a key-value backend. Cheap to clone.
#[derive(Clone)]
pub struct CacheStore {
    backend: Arc<dyn CacheBackend>,
    default_ttl: Duration,
}

impl CacheStore {
    /// Create a store over `backend`. `default_ttl` applies when `set` is
    /// called without an explicit TTL and is always finite.
    #[must_use]
    pub fn new(backend: Arc<dyn CacheBackend>, default_ttl: Duration) -> Self {
        Self {
            backend,
            default_ttl,
        }
    }

    /// The TTL applied when none is given.
    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Get the value at `key`, deserialized from its stored JSON form.
    ///
    /// Backend failures and undecodable entries both degrade to `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key).await {
            Ok(raw) => raw,
            Err(e) => {
                error!(key, error = %e, "cache get failed, treating as miss");
                return None;
            }
        };

        let Some(raw) = raw else {
            trace!(key, "cache miss");
            return None;
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                trace!(key, "cache hit");
                Some(value)
            }
            Err(e) => {
                // A stale shape from an older build; drop it and refetch
                warn!(key, error = %e, "cached value failed to deserialize, evicting");
                self.delete(key).await;
                None
            }
        }
    }

    /// Serialize `value` to JSON and store it at `key` for `ttl` (or the
    /// default TTL). No-op on backend failure.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                error!(key, error = %e, "failed to serialize value for cache");
                return;
            }
        };

        match self.backend.set(key, raw, ttl).await {
            Ok(()) => debug!(key, ttl_secs = ttl.as_secs(), "cache set"),
            Err(e) => error!(key, error = %e, "cache set failed"),
        }
    }

    /// Delete the entry at `key`. No-op on backend failure.
    pub async fn delete(&self, key: &str) {
        match self.backend.delete(key).await {
            Ok(()) => debug!(key, "cache delete"),
            Err(e) => error!(key, error = %e, "cache delete failed"),
        }
    }

    /// Delete every entry whose key starts with `prefix`. No-op on failure.
    pub async fn delete_by_prefix(&self, prefix: &str) {
        match self.backend.delete_by_prefix(prefix).await {
            Ok(()) => debug!(prefix, "cache delete by prefix"),
            Err(e) => error!(prefix, error = %e, "cache delete by prefix failed"),
        }
    }

    /// Clear the whole cache. No-op on failure.
    pub async fn reset(&self) {
        match self.backend.clear().await {
            Ok(()) => warn!("cache reset, all entries cleared"),
            Err(e) => error!(error = %e, "cache reset failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::backend::CacheError;
    use crate::cache::memory::MemoryBackend;
    use async_trait::async_trait;

    /// Backend that fails every operation, standing in for an unreachable
    /// service.
    struct FailingBackend;

    #[async_trait]
    impl CacheBackend for FailingBackend {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Unavailable("connection refused".to_owned()))
        }

        async fn set(
            &self,
            _key: &str,
            _value: String,
            _ttl: Duration,
        ) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".to_owned()))
        }

        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".to_owned()))
        }

        async fn delete_by_prefix(&self, _prefix: &str) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".to_owned()))
        }

        async fn clear(&self) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".to_owned()))
        }
    }

    fn memory_store() -> CacheStore {
        CacheStore::new(
            Arc::new(MemoryBackend::default()),
            Duration::from_secs(300),
        )
    }

    #[tokio::test]
    async fn test_roundtrip_typed_value() {
        let store = memory_store();
        store.set("answer", &42_i32, None).await;
        assert_eq!(store.get::<i32>("answer").await, Some(42));
    }

    #[tokio::test]
    async fn test_delete_makes_next_get_miss() {
        let store = memory_store();
        store.set("k", &"v".to_owned(), None).await;
        store.delete("k").await;
        assert_eq!(store.get::<String>("k").await, None);
    }

    #[tokio::test]
    async fn test_prefix_delete_makes_next_get_miss() {
        let store = memory_store();
        store.set("order:list:7:1", &1_i32, None).await;
        store.delete_by_prefix("order:list:7:").await;
        assert_eq!(store.get::<i32>("order:list:7:1").await, None);
    }

    #[tokio::test]
    async fn test_unreachable_backend_never_raises() {
        let store = CacheStore::new(Arc::new(FailingBackend), Duration::from_secs(300));

        // Get degrades to a miss; mutations to no-ops. None of these panic
        // or return errors.
        assert_eq!(store.get::<i32>("k").await, None);
        store.set("k", &1_i32, None).await;
        store.delete("k").await;
        store.delete_by_prefix("k:").await;
        store.reset().await;
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_evicted() {
        let backend = Arc::new(MemoryBackend::default());
        backend
            .set("k", "not json at all {{".to_owned(), Duration::from_secs(60))
            .await
            .expect("set");

        let store = CacheStore::new(backend.clone(), Duration::from_secs(300));
        assert_eq!(store.get::<i32>("k").await, None);
        // The poisoned entry is gone afterwards
        assert_eq!(backend.get("k").await.expect("get"), None);
    }
}
