//! Cache-aside layer for read-heavy entities.
//!
//! [`CacheStore`] is a thin capability over an injected key-value backend
//! ([`CacheBackend`]): get, set-with-TTL, delete, delete-by-prefix, reset.
//! Caching is an optimization, never a correctness dependency - every backend
//! failure is logged and absorbed, so callers see a miss or a no-op instead
//! of an error.
//!
//! [`CacheAside`] implements the read-through/write-invalidate pattern on top
//! of the store, with single-flight protection so concurrent misses on one
//! key run the producer once.
//!
//! Two backends ship with the crate: [`RedisBackend`] for shared deployments
//! and [`MemoryBackend`] (moka) for tests and single-process use.

pub mod backend;
pub mod coordinator;
pub mod keys;
pub mod memory;
pub mod redis;
pub mod store;

pub use backend::{CacheBackend, CacheError};
pub use coordinator::{CacheAside, CachePolicy};
pub use memory::MemoryBackend;
pub use redis::RedisBackend;
pub use store::CacheStore;
