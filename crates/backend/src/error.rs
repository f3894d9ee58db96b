//! Unified error handling for the backend.
//!
//! Repository and storage errors are translated into this domain taxonomy
//! before they reach a caller. Cache failures never appear here: the cache
//! layer absorbs them and degrades to a miss or a no-op.

use pomelo_core::ProductId;
use thiserror::Error;

use crate::db::RepositoryError;

/// Application-level error type for the backend.
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The user's cart has no items.
    #[error("Cart is empty")]
    EmptyCart,

    /// A line item asked for more units than the product has in stock.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: i32,
        available: i32,
    },

    /// Malformed or rejected input, surfaced to the caller unchanged.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The actor is not allowed to perform the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Transient conflict between concurrent transactions. Retryable.
    #[error("Transaction conflict, please retry")]
    TransactionConflict,

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// Internal invariant violation.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether retrying the same call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::TransactionConflict)
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("row not found".to_owned()),
            RepositoryError::Conflict => Self::TransactionConflict,
            RepositoryError::Database(e) => Self::Database(e),
            RepositoryError::DataCorruption(msg) => Self::Internal(msg),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::from(RepositoryError::from(err))
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_display() {
        let err = AppError::InsufficientStock {
            product_id: ProductId::new(7),
            requested: 3,
            available: 1,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product 7: requested 3, available 1"
        );
    }

    #[test]
    fn test_only_conflict_is_retryable() {
        assert!(AppError::TransactionConflict.is_retryable());
        assert!(!AppError::EmptyCart.is_retryable());
        assert!(!AppError::NotFound("order".to_owned()).is_retryable());
    }

    #[test]
    fn test_repository_error_translation() {
        assert!(matches!(
            AppError::from(RepositoryError::NotFound),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(RepositoryError::Conflict),
            AppError::TransactionConflict
        ));
        assert!(matches!(
            AppError::from(RepositoryError::DataCorruption("bad row".to_owned())),
            AppError::Internal(_)
        ));
    }
}
