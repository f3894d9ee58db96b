//! Redis cache backend over a multiplexed connection manager.
//!
//! The wire protocol belongs to the `redis` crate; this module only adapts it
//! to the [`CacheBackend`] capability. Prefix deletion walks `SCAN MATCH`
//! instead of `KEYS` so it never blocks the server on large keyspaces.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::backend::{CacheBackend, CacheError};

/// Redis-backed [`CacheBackend`].
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
}

impl RedisBackend {
    /// Connect to Redis at `url` (e.g. `redis://127.0.0.1:6379`).
    ///
    /// The connection manager reconnects automatically; individual operation
    /// failures surface as [`CacheError::Unavailable`] and are absorbed by
    /// the store.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Unavailable` if the initial connection fails.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(unavailable)?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(unavailable)?;
        Ok(Self { conn })
    }
}

fn unavailable(err: redis::RedisError) -> CacheError {
    CacheError::Unavailable(err.to_string())
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(unavailable)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        // Redis TTLs are whole seconds; round sub-second TTLs up to one
        let seconds = ttl.as_secs().max(1);
        let _: () = conn
            .set_ex(key, value, seconds)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await.map_err(unavailable)?;
        Ok(())
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<(), CacheError> {
        let mut scan_conn = self.conn.clone();
        let pattern = format!("{prefix}*");
        let mut matched = Vec::new();
        {
            let mut iter = scan_conn
                .scan_match::<_, String>(pattern)
                .await
                .map_err(unavailable)?;
            while let Some(key) = iter.next_item().await {
                matched.push(key);
            }
        }

        if !matched.is_empty() {
            let mut conn = self.conn.clone();
            let _: () = conn.del(matched).await.map_err(unavailable)?;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("FLUSHDB")
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}
