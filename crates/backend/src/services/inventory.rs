//! Inventory ledger: the only writer of `products.stock` inside checkout.
//!
//! Guards the invariant that stock never goes negative. Both operations run
//! on the caller's transaction connection; the `FOR UPDATE` read serializes
//! competing transactions on the product row, so the second of two racing
//! checkouts sees the already-decremented stock and fails instead of
//! overselling.

use pomelo_core::ProductId;
use sqlx::PgConnection;
use tracing::debug;

use crate::db::ProductRepository;
use crate::error::{AppError, Result};

/// Atomic check-and-decrement over product stock.
pub struct InventoryLedger;

impl InventoryLedger {
    /// Re-validate stock under the transaction's isolation and reserve
    /// `quantity` units. Must be called for every line item before any
    /// order-item row is written so a multi-item cart either fully reserves
    /// or aborts with no partial decrement.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the product doesn't exist,
    /// `AppError::InsufficientStock` if fewer than `quantity` units remain,
    /// `AppError::TransactionConflict` if the row lock times out.
    pub async fn check_and_reserve(
        conn: &mut PgConnection,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<()> {
        if quantity < 1 {
            return Err(AppError::Validation(format!(
                "quantity must be at least 1, got {quantity}"
            )));
        }

        let product = ProductRepository::get_for_update(conn, product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product {product_id}")))?;

        if product.stock < quantity {
            return Err(AppError::InsufficientStock {
                product_id,
                requested: quantity,
                available: product.stock,
            });
        }

        sqlx::query("UPDATE products SET stock = stock - $2, updated_at = now() WHERE id = $1")
            .bind(product_id)
            .bind(quantity)
            .execute(&mut *conn)
            .await?;

        debug!(%product_id, quantity, remaining = product.stock - quantity, "stock reserved");
        Ok(())
    }

    /// Return `quantity` units to stock, inside the caller's transaction.
    /// Used when a cancelled order releases its reservation.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the product doesn't exist,
    /// `AppError::TransactionConflict` if the row lock times out.
    pub async fn release(
        conn: &mut PgConnection,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE products SET stock = stock + $2, updated_at = now() WHERE id = $1",
        )
        .bind(product_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("product {product_id}")));
        }

        debug!(%product_id, quantity, "stock released");
        Ok(())
    }
}
