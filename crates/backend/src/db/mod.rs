//! Database operations for the backend `PostgreSQL`.
//!
//! ## Tables
//!
//! - `users` - Account rows referenced by carts, orders, and notifications
//! - `categories` / `products` - Catalog; `products.stock` carries a
//!   `CHECK (stock >= 0)` constraint as a last line of defense behind the
//!   inventory ledger
//! - `carts` / `cart_items` - One cart per user, one row per
//!   `(cart_id, product_id)`
//! - `orders` / `order_items` - Immutable order snapshots; item price is
//!   copied at purchase time
//! - `notifications` - Rows written by the notification consumer
//!
//! # Migrations
//!
//! Migrations are embedded from `crates/backend/migrations/` and applied via
//! [`run_migrations`].

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub mod carts;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod users;

pub use carts::CartRepository;
pub use notifications::NotificationRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use users::UserRepository;

/// Postgres SQLSTATE codes that signal a transient, retryable conflict.
///
/// `40001` serialization_failure, `40P01` deadlock_detected,
/// `55P03` lock_not_available (raised when `lock_timeout` expires).
const CONFLICT_SQLSTATES: &[&str] = &["40001", "40P01", "55P03"];

/// Errors from the repository layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(sqlx::Error),

    /// The targeted row does not exist.
    #[error("row not found")]
    NotFound,

    /// Two transactions raced on the same rows; the caller may retry.
    #[error("conflicting concurrent transaction")]
    Conflict,

    /// A stored row failed to parse into its domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err
            && let Some(code) = db_err.code()
            && CONFLICT_SQLSTATES.contains(&code.as_ref())
        {
            return Self::Conflict;
        }
        if matches!(err, sqlx::Error::RowNotFound) {
            return Self::NotFound;
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns `sqlx::migrate::MigrateError` if a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err = RepositoryError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[test]
    fn test_plain_errors_stay_database() {
        let err = RepositoryError::from(sqlx::Error::PoolClosed);
        assert!(matches!(err, RepositoryError::Database(_)));
    }
}
