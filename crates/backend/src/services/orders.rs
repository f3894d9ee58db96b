//! Order reads and the order status state machine.
//!
//! Reads go through the cache-aside coordinator. Status updates run in a
//! transaction that locks the order row, validates the transition, restocks
//! reserved quantities on cancellation, and then invalidates and notifies
//! after commit.

use std::sync::Arc;
use std::time::Duration;

use pomelo_core::{OrderId, OrderStatus, UserId};
use sqlx::PgPool;
use tracing::{info, instrument};

use crate::access::{self, Actor, Operation};
use crate::cache::{CacheAside, keys};
use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::models::{Order, OrderView, Page};
use crate::notify::{NotificationEvent, NotificationSink};
use crate::services::inventory::InventoryLedger;

const ORDER_TTL: Duration = Duration::from_secs(300);
const ORDER_LIST_TTL: Duration = Duration::from_secs(60);

/// Cached order reads plus the status lifecycle.
pub struct OrderService {
    pool: PgPool,
    cache: CacheAside,
    sink: Arc<dyn NotificationSink>,
}

impl OrderService {
    /// Create an order service.
    #[must_use]
    pub fn new(pool: PgPool, cache: CacheAside, sink: Arc<dyn NotificationSink>) -> Self {
        Self { pool, cache, sink }
    }

    /// Get an order with its items. Customers see only their own orders;
    /// reading someone else's requires [`Operation::ViewAnyOrder`].
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the order doesn't exist and
    /// `AppError::Forbidden` if it belongs to another user.
    pub async fn get_order(&self, actor: &Actor, id: OrderId) -> Result<OrderView> {
        let view: OrderView = self
            .cache
            .get_or_set(&keys::order(id), Some(ORDER_TTL), || async {
                OrderRepository::new(&self.pool)
                    .get_with_items(id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("order {id}")))
            })
            .await?;

        if view.order.user_id != actor.user_id {
            access::require(actor, Operation::ViewAnyOrder)?;
        }
        Ok(view)
    }

    /// List a user's own orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails on a cache miss.
    pub async fn list_orders(
        &self,
        user_id: UserId,
        page: i64,
        limit: i64,
    ) -> Result<Page<Order>> {
        self.cache
            .get_or_set(
                &keys::order_page(user_id, page, limit),
                Some(ORDER_LIST_TTL),
                || async {
                    OrderRepository::new(&self.pool)
                        .list_for_user(user_id, page, limit)
                        .await
                        .map_err(AppError::from)
                },
            )
            .await
    }

    /// Move an order to `next`, enforcing the forward-only lifecycle.
    ///
    /// Cancelling a not-yet-terminal order returns its reserved quantities to
    /// stock in the same transaction. Exactly one status-change notification
    /// is published per successful transition, after commit.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` without the permission,
    /// `AppError::NotFound` for an unknown order, `AppError::Validation` for
    /// a transition the lifecycle forbids, `AppError::TransactionConflict`
    /// on lock timeout.
    #[instrument(skip(self, actor), fields(order = %id, %next))]
    pub async fn update_status(
        &self,
        actor: &Actor,
        id: OrderId,
        next: OrderStatus,
    ) -> Result<Order> {
        access::require(actor, Operation::UpdateOrderStatus)?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("SET LOCAL lock_timeout = '5s'")
            .execute(&mut *tx)
            .await?;

        let order = OrderRepository::get_for_update(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;

        if !order.status.can_transition_to(next) {
            return Err(AppError::Validation(format!(
                "cannot move order {id} from {} to {next}",
                order.status
            )));
        }

        let restocked = if next == OrderStatus::Cancelled {
            let items = OrderRepository::items_for_update(&mut tx, id).await?;
            for item in &items {
                InventoryLedger::release(&mut tx, item.product_id, item.quantity).await?;
            }
            items
        } else {
            Vec::new()
        };

        let updated = OrderRepository::set_status(&mut tx, id, next).await?;
        tx.commit().await?;

        let store = self.cache.store();
        store.delete(&keys::order(id)).await;
        store.delete_by_prefix(&keys::order_list(updated.user_id)).await;
        if !restocked.is_empty() {
            for item in &restocked {
                store.delete(&keys::product(item.product_id)).await;
            }
            store.delete_by_prefix(keys::PRODUCT_LIST).await;
        }

        self.sink
            .publish(NotificationEvent::OrderStatusChanged {
                user_id: updated.user_id,
                order_id: id,
                status: next,
            })
            .await;
        info!(from = %order.status, "order status updated");

        Ok(updated)
    }
}
