//! Composition root: wires [`BackendConfig`] into a ready-to-use service set.
//!
//! A hosting process (HTTP server, job runner, CLI) calls
//! [`Backend::from_config`] once at startup and hands the resulting services
//! to its own surface layer.

use std::sync::Arc;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cache::{CacheAside, CacheBackend, CacheStore, MemoryBackend, RedisBackend};
use crate::config::BackendConfig;
use crate::db;
use crate::error::{AppError, Result};
use crate::notify::{NotificationQueue, PgNotificationWriter, run_consumer};
use crate::services::{
    CartService, CheckoutOrchestrator, OrderService, ProductService, ProfileService,
};

/// The assembled backend: shared pool, cache, and one instance of each
/// service.
pub struct Backend {
    pub pool: PgPool,
    pub cache: CacheAside,
    pub checkout: CheckoutOrchestrator,
    pub orders: OrderService,
    pub carts: CartService,
    pub products: ProductService,
    pub profiles: ProfileService,
    /// Handle of the spawned notification consumer task.
    pub notification_consumer: JoinHandle<()>,
}

impl Backend {
    /// Connect to Postgres, apply migrations, pick a cache backend, start
    /// the notification consumer, and build the services.
    ///
    /// When `REDIS_URL` is configured but unreachable the backend starts
    /// anyway on the in-process cache; the cache is an optimization, not a
    /// startup dependency.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if Postgres is unreachable and
    /// `AppError::Internal` if a migration fails.
    pub async fn from_config(config: &BackendConfig) -> Result<Self> {
        let pool = db::create_pool(&config.database_url).await?;
        db::run_migrations(&pool)
            .await
            .map_err(|e| AppError::Internal(format!("migration failed: {e}")))?;

        let backend = cache_backend(config).await;
        let store = CacheStore::new(backend, config.cache_ttl);
        let cache = CacheAside::new(store.clone());

        let (queue, rx) = NotificationQueue::new(config.notification_queue_capacity);
        let writer = Arc::new(PgNotificationWriter::new(pool.clone()));
        let notification_consumer = tokio::spawn(run_consumer(rx, writer));
        let sink = Arc::new(queue);

        info!("backend assembled");
        Ok(Self {
            checkout: CheckoutOrchestrator::new(pool.clone(), store, sink.clone()),
            orders: OrderService::new(pool.clone(), cache.clone(), sink),
            carts: CartService::new(pool.clone(), cache.clone()),
            products: ProductService::new(pool.clone(), cache.clone()),
            profiles: ProfileService::new(pool.clone(), cache.clone()),
            pool,
            cache,
            notification_consumer,
        })
    }
}

async fn cache_backend(config: &BackendConfig) -> Arc<dyn CacheBackend> {
    let Some(url) = &config.redis_url else {
        info!("no REDIS_URL configured, using the in-process cache");
        return Arc::new(MemoryBackend::default());
    };

    match RedisBackend::connect(url.expose_secret()).await {
        Ok(redis) => {
            info!("connected to the Redis cache backend");
            Arc::new(redis)
        }
        Err(e) => {
            warn!(error = %e, "Redis unreachable, falling back to the in-process cache");
            Arc::new(MemoryBackend::default())
        }
    }
}
