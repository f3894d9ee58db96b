//! Cache contract tests over the in-memory backend. These run without any
//! external service.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pomelo_backend::cache::{
    CacheAside, CacheBackend, CacheError, CacheStore, MemoryBackend, keys,
};
use pomelo_core::{ProductId, UserId};

fn coordinator() -> CacheAside {
    let store = CacheStore::new(
        Arc::new(MemoryBackend::default()),
        Duration::from_secs(300),
    );
    CacheAside::new(store)
}

#[tokio::test]
async fn test_read_through_then_exact_invalidation() {
    let cache = coordinator();
    let calls = Arc::new(AtomicU32::new(0));
    let key = keys::product(ProductId::new(1));

    let read = || {
        let calls = calls.clone();
        let key = key.clone();
        let cache = cache.clone();
        async move {
            cache
                .get_or_set::<i32, String, _, _>(&key, None, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                })
                .await
        }
    };

    assert_eq!(read().await, Ok(42));
    assert_eq!(read().await, Ok(42));
    assert_eq!(calls.load(Ordering::SeqCst), 1, "second read was a hit");

    cache.store().delete(&key).await;
    assert_eq!(read().await, Ok(42));
    assert_eq!(calls.load(Ordering::SeqCst), 2, "invalidation forced a rebuild");
}

#[tokio::test]
async fn test_prefix_invalidation_spares_unrelated_keys() {
    let cache = coordinator();
    let store = cache.store();

    store.set(&keys::product_page(1, 10, None, None), &1, None).await;
    store
        .set(&keys::product_page(2, 10, Some("citrus"), None), &2, None)
        .await;
    store.set(&keys::product(ProductId::new(7)), &3, None).await;
    store.set(&keys::cart(UserId::new(9)), &4, None).await;

    store.delete_by_prefix(keys::PRODUCT_LIST).await;

    assert_eq!(
        store.get::<i32>(&keys::product_page(1, 10, None, None)).await,
        None
    );
    assert_eq!(
        store
            .get::<i32>(&keys::product_page(2, 10, Some("citrus"), None))
            .await,
        None
    );
    assert_eq!(store.get::<i32>(&keys::product(ProductId::new(7))).await, Some(3));
    assert_eq!(store.get::<i32>(&keys::cart(UserId::new(9))).await, Some(4));
}

/// Backend that refuses every operation, standing in for a down Redis.
struct DownBackend;

#[async_trait]
impl CacheBackend for DownBackend {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Unavailable("connection refused".to_owned()))
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
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

#[tokio::test]
async fn test_unavailable_backend_degrades_to_the_source() {
    let store = CacheStore::new(Arc::new(DownBackend), Duration::from_secs(300));
    let cache = CacheAside::new(store);
    let calls = Arc::new(AtomicU32::new(0));

    for _ in 0..3 {
        let calls = calls.clone();
        let value = cache
            .get_or_set::<i32, String, _, _>("product:1", None, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(5)
            })
            .await;
        // Every read succeeds; the failure never surfaces
        assert_eq!(value, Ok(5));
    }

    // Each read fell through to the source because nothing could be stored
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    // Invalidation against the dead backend is also absorbed
    cache.store().delete("product:1").await;
    cache.store().delete_by_prefix(keys::PRODUCT_LIST).await;
}
