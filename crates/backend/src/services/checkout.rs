//! Checkout orchestration: cart to order, atomically.
//!
//! One transaction creates the order row, reserves stock per line through the
//! inventory ledger, copies purchase-time prices into order items, and
//! empties the cart. If any step fails the whole transaction rolls back - no
//! order, no stock change, no cart mutation survives a failed attempt.
//!
//! Cache invalidation and the order-created notification happen strictly
//! after commit; a crash in between leaves at worst a stale cache entry that
//! the TTL bounds.

use std::sync::Arc;

use pomelo_core::{CartId, UserId};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use crate::cache::{CacheStore, keys};
use crate::db::{CartRepository, OrderRepository};
use crate::error::{AppError, Result};
use crate::models::{CartLine, CreateOrder, Order, OrderView};
use crate::notify::{NotificationEvent, NotificationSink};
use crate::services::inventory::InventoryLedger;

/// Attempts per checkout before a transient conflict is surfaced.
const MAX_CHECKOUT_ATTEMPTS: u32 = 3;

/// The core checkout workflow.
pub struct CheckoutOrchestrator {
    pool: PgPool,
    cache: CacheStore,
    sink: Arc<dyn NotificationSink>,
}

impl CheckoutOrchestrator {
    /// Create an orchestrator.
    #[must_use]
    pub fn new(pool: PgPool, cache: CacheStore, sink: Arc<dyn NotificationSink>) -> Self {
        Self { pool, cache, sink }
    }

    /// Convert the user's cart into an order.
    ///
    /// The fail-fast stock pre-check runs outside the transaction so a
    /// known-bad request never opens one; the authoritative check is
    /// re-verified per line inside the transaction, which defends against a
    /// race between pre-check and commit. Transient conflicts are retried up
    /// to [`MAX_CHECKOUT_ATTEMPTS`] times.
    ///
    /// # Errors
    ///
    /// Returns `AppError::EmptyCart`, `AppError::InsufficientStock` (naming
    /// the offending product), `AppError::Validation` for malformed input,
    /// or `AppError::TransactionConflict` once retries are exhausted.
    #[instrument(skip(self, request), fields(user = %user_id))]
    pub async fn create_order(&self, user_id: UserId, request: &CreateOrder) -> Result<OrderView> {
        validate_request(request)?;

        let carts = CartRepository::new(&self.pool);
        let Some((cart, lines)) = carts.load_with_items(user_id).await? else {
            return Err(AppError::EmptyCart);
        };
        if lines.is_empty() {
            return Err(AppError::EmptyCart);
        }

        precheck_stock(&lines)?;
        let total = compute_total(&lines);

        let mut attempt = 1;
        let order = loop {
            match self
                .run_transaction(user_id, cart.id, &lines, total, request)
                .await
            {
                Err(e) if e.is_retryable() && attempt < MAX_CHECKOUT_ATTEMPTS => {
                    warn!(attempt, "checkout hit a transient conflict, retrying");
                    attempt += 1;
                }
                outcome => break outcome,
            }
        }?;

        self.invalidate_after_commit(user_id, &order, &lines).await;
        self.sink
            .publish(NotificationEvent::OrderCreated {
                user_id,
                order_id: order.id,
            })
            .await;
        info!(order = %order.id, %total, attempt, "checkout committed");

        OrderRepository::new(&self.pool)
            .get_with_items(order.id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("order {} missing after commit", order.id)))
    }

    /// One atomic attempt: order row, per-line reserve + order item, cart
    /// clear, commit.
    async fn run_transaction(
        &self,
        user_id: UserId,
        cart_id: CartId,
        lines: &[CartLine],
        total: Decimal,
        request: &CreateOrder,
    ) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        // Bound lock waits so a stuck peer surfaces as a retryable conflict
        // instead of hanging the request
        sqlx::query("SET LOCAL lock_timeout = '5s'")
            .execute(&mut *tx)
            .await?;

        let order = OrderRepository::create(
            &mut tx,
            user_id,
            total,
            &request.shipping_address,
            &request.payment_method,
        )
        .await?;

        for line in lines {
            InventoryLedger::check_and_reserve(&mut tx, line.product_id, line.quantity).await?;
            OrderRepository::insert_item(
                &mut tx,
                order.id,
                line.product_id,
                line.quantity,
                line.unit_price,
            )
            .await?;
        }

        CartRepository::clear(&mut tx, cart_id).await?;
        tx.commit().await?;
        Ok(order)
    }

    /// Invalidation contract: exact keys for the cart and the new order,
    /// prefixes for every list that could contain them or the touched
    /// products.
    async fn invalidate_after_commit(&self, user_id: UserId, order: &Order, lines: &[CartLine]) {
        self.cache.delete(&keys::cart(user_id)).await;
        self.cache.delete(&keys::order(order.id)).await;
        self.cache.delete_by_prefix(&keys::order_list(user_id)).await;
        for line in lines {
            self.cache.delete(&keys::product(line.product_id)).await;
        }
        self.cache.delete_by_prefix(keys::PRODUCT_LIST).await;
    }
}

fn validate_request(request: &CreateOrder) -> Result<()> {
    if request.shipping_address.trim().is_empty() {
        return Err(AppError::Validation("shipping address is required".to_owned()));
    }
    if request.payment_method.trim().is_empty() {
        return Err(AppError::Validation("payment method is required".to_owned()));
    }
    Ok(())
}

/// Order total from the cart snapshot: `Σ quantity * unit_price`.
#[must_use]
pub fn compute_total(lines: &[CartLine]) -> Decimal {
    lines.iter().map(CartLine::subtotal).sum()
}

/// Fail-fast stock check against the snapshot read with the cart. Names the
/// first offending product.
///
/// # Errors
///
/// Returns `AppError::InsufficientStock` for the first short line.
pub fn precheck_stock(lines: &[CartLine]) -> Result<()> {
    for line in lines {
        if line.stock < line.quantity {
            return Err(AppError::InsufficientStock {
                product_id: line.product_id,
                requested: line.quantity,
                available: line.stock,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pomelo_core::{CartItemId, ProductId};
    use rust_decimal_macros::dec;

    fn line(product: i32, quantity: i32, price: Decimal, stock: i32) -> CartLine {
        CartLine {
            item_id: CartItemId::new(product),
            product_id: ProductId::new(product),
            product_name: format!("product {product}"),
            quantity,
            unit_price: price,
            stock,
        }
    }

    #[test]
    fn test_total_sums_quantity_times_price() {
        // Cart: 2 x product A @ 10, 1 x product B @ 5
        let lines = vec![line(1, 2, dec!(10), 5), line(2, 1, dec!(5), 5)];
        assert_eq!(compute_total(&lines), dec!(25));
    }

    #[test]
    fn test_total_of_empty_cart_is_zero() {
        assert_eq!(compute_total(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_precheck_names_the_short_product() {
        // Product 1 has stock 1 but the cart wants 2
        let lines = vec![line(1, 2, dec!(10), 1), line(2, 1, dec!(5), 5)];
        let err = precheck_stock(&lines).expect_err("short stock");
        match err {
            AppError::InsufficientStock {
                product_id,
                requested,
                available,
            } => {
                assert_eq!(product_id, ProductId::new(1));
                assert_eq!(requested, 2);
                assert_eq!(available, 1);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
    }

    #[test]
    fn test_precheck_passes_when_stock_covers_demand() {
        let lines = vec![line(1, 2, dec!(10), 5), line(2, 1, dec!(5), 5)];
        assert!(precheck_stock(&lines).is_ok());
    }

    #[test]
    fn test_request_validation() {
        let bad = CreateOrder {
            shipping_address: "  ".to_owned(),
            payment_method: "card".to_owned(),
        };
        assert!(matches!(
            validate_request(&bad),
            Err(AppError::Validation(_))
        ));

        let good = CreateOrder {
            shipping_address: "1 Main St".to_owned(),
            payment_method: "card".to_owned(),
        };
        assert!(validate_request(&good).is_ok());
    }
}
