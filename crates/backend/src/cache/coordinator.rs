//! Read-through/write-invalidate coordination on top of [`CacheStore`].
//!
//! `get_or_set` is the read path every cached entity goes through. Writers
//! hold up their end of the contract by calling `delete`/`delete_by_prefix`
//! on the store after their transaction commits; see the service modules.
//!
//! Concurrent misses on the same key are coalesced: one caller runs the
//! producer while the rest wait and then read the freshly stored value, so a
//! popular key expiring does not stampede the database.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::store::CacheStore;

/// Per-operation caching configuration: a key namespace plus a TTL. Composed
/// explicitly with [`CacheAside::get_or_set_with`] instead of being looked up
/// from endpoint metadata.
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    /// Key prefix; the operation argument is appended to form the full key.
    pub prefix: &'static str,
    /// How long produced values stay fresh.
    pub ttl: Duration,
}

impl CachePolicy {
    /// Create a policy.
    #[must_use]
    pub const fn new(prefix: &'static str, ttl: Duration) -> Self {
        Self { prefix, ttl }
    }

    /// Build the full key for `suffix`.
    #[must_use]
    pub fn key(&self, suffix: impl Display) -> String {
        format!("{}{}", self.prefix, suffix)
    }
}

/// Cache-aside coordinator. Cheap to clone; clones share the in-flight map.
#[derive(Clone)]
pub struct CacheAside {
    store: CacheStore,
    inflight: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl CacheAside {
    /// Create a coordinator over `store`.
    #[must_use]
    pub fn new(store: CacheStore) -> Self {
        Self {
            store,
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The underlying store, for invalidation calls.
    #[must_use]
    pub const fn store(&self) -> &CacheStore {
        &self.store
    }

    /// On hit, return the cached value without invoking `producer`. On miss,
    /// invoke `producer`, store the result for `ttl`, and return it. If the
    /// store fails the produced value is still returned - availability over
    /// cache freshness.
    ///
    /// # Errors
    ///
    /// Only the producer's own error is propagated; a failed producer caches
    /// nothing.
    pub async fn get_or_set<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        producer: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.store.get(key).await {
            return Ok(hit);
        }

        // Single-flight: take the per-key guard before producing
        let slot = self.inflight_slot(key);
        let _guard = slot.lock().await;

        // A concurrent caller may have produced and stored while we waited
        if let Some(hit) = self.store.get(key).await {
            self.release_slot(key);
            return Ok(hit);
        }

        let result = producer().await;
        if let Ok(value) = &result {
            self.store.set(key, value, ttl).await;
        }
        self.release_slot(key);
        result
    }

    /// [`Self::get_or_set`] with the key and TTL drawn from `policy`.
    ///
    /// # Errors
    ///
    /// Propagates the producer's error, as `get_or_set` does.
    pub async fn get_or_set_with<T, E, F, Fut>(
        &self,
        policy: &CachePolicy,
        suffix: impl Display,
        producer: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = policy.key(suffix);
        self.get_or_set(&key, Some(policy.ttl), producer).await
    }

    fn inflight_slot(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        map.entry(key.to_owned())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    fn release_slot(&self, key: &str) {
        let mut map = self
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        map.remove(key);
    }
}
