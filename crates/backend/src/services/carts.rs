//! Cart service.
//!
//! The cart view is cached briefly under the user's exact key; every
//! mutation recomputes the derived total, persists it, and deletes that key
//! so the next read rebuilds from the database.

use std::time::Duration;

use pomelo_core::{CartItemId, ProductId, UserId};
use sqlx::PgPool;
use tracing::{debug, instrument};

use crate::cache::{CacheAside, keys};
use crate::db::{CartRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::models::CartView;
use crate::services::checkout::compute_total;

/// Carts change often, so their cache window is short.
const CART_TTL: Duration = Duration::from_secs(60);

/// Cart reads and mutations.
pub struct CartService {
    pool: PgPool,
    cache: CacheAside,
}

impl CartService {
    /// Create a cart service.
    #[must_use]
    pub const fn new(pool: PgPool, cache: CacheAside) -> Self {
        Self { pool, cache }
    }

    /// The user's cart view: lines joined with current product snapshots,
    /// plus the derived total. Creates an empty cart on first access.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if a query fails on a cache miss.
    pub async fn get_cart(&self, user_id: UserId) -> Result<CartView> {
        self.cache
            .get_or_set(&keys::cart(user_id), Some(CART_TTL), || async {
                self.load_fresh(user_id).await
            })
            .await
    }

    /// Add `quantity` of a product, merging with an existing line. The
    /// merged quantity is checked against current stock so a cart can never
    /// ask for more than the shelf holds at add time.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for a non-positive quantity,
    /// `AppError::NotFound` for an unknown product, and
    /// `AppError::InsufficientStock` when the merged quantity exceeds stock.
    #[instrument(skip(self), fields(user = %user_id, product = %product_id))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartView> {
        if quantity < 1 {
            return Err(AppError::Validation(format!(
                "quantity must be at least 1, got {quantity}"
            )));
        }

        let product = ProductRepository::new(&self.pool)
            .get(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product {product_id}")))?;

        let carts = CartRepository::new(&self.pool);
        let cart = carts.get_or_create(user_id).await?;

        let existing = carts
            .load_with_items(user_id)
            .await?
            .map_or(0, |(_, lines)| {
                lines
                    .iter()
                    .filter(|line| line.product_id == product_id)
                    .map(|line| line.quantity)
                    .sum()
            });
        let merged = existing + quantity;
        if product.stock < merged {
            return Err(AppError::InsufficientStock {
                product_id,
                requested: merged,
                available: product.stock,
            });
        }

        carts.add_item(cart.id, product_id, quantity).await?;
        debug!("cart item added");
        self.refresh(user_id).await
    }

    /// Set an item's quantity.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for a non-positive quantity,
    /// `AppError::NotFound` for an unknown item, and
    /// `AppError::InsufficientStock` when stock cannot cover the new
    /// quantity.
    #[instrument(skip(self), fields(user = %user_id, item = %item_id))]
    pub async fn update_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: i32,
    ) -> Result<CartView> {
        if quantity < 1 {
            return Err(AppError::Validation(format!(
                "quantity must be at least 1, got {quantity}"
            )));
        }

        let carts = CartRepository::new(&self.pool);
        let cart = carts.get_or_create(user_id).await?;
        let item = carts
            .get_item(cart.id, item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("cart item {item_id}")))?;

        let product = ProductRepository::new(&self.pool)
            .get(item.product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product {}", item.product_id)))?;
        if product.stock < quantity {
            return Err(AppError::InsufficientStock {
                product_id: item.product_id,
                requested: quantity,
                available: product.stock,
            });
        }

        carts.set_item_quantity(cart.id, item_id, quantity).await?;
        self.refresh(user_id).await
    }

    /// Remove one item.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the item isn't in the user's cart.
    #[instrument(skip(self), fields(user = %user_id, item = %item_id))]
    pub async fn remove_item(&self, user_id: UserId, item_id: CartItemId) -> Result<CartView> {
        let carts = CartRepository::new(&self.pool);
        let cart = carts.get_or_create(user_id).await?;
        if !carts.remove_item(cart.id, item_id).await? {
            return Err(AppError::NotFound(format!("cart item {item_id}")));
        }
        self.refresh(user_id).await
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if a statement fails.
    #[instrument(skip(self), fields(user = %user_id))]
    pub async fn clear(&self, user_id: UserId) -> Result<()> {
        let cart = CartRepository::new(&self.pool).get_or_create(user_id).await?;

        let mut tx = self.pool.begin().await?;
        CartRepository::clear(&mut tx, cart.id).await?;
        tx.commit().await?;

        self.cache.store().delete(&keys::cart(user_id)).await;
        Ok(())
    }

    /// Rebuild the view from the database, persisting the recomputed total.
    async fn load_fresh(&self, user_id: UserId) -> Result<CartView> {
        let carts = CartRepository::new(&self.pool);
        let mut cart = carts.get_or_create(user_id).await?;
        let lines = carts
            .load_with_items(user_id)
            .await?
            .map_or_else(Vec::new, |(_, lines)| lines);

        let total = compute_total(&lines);
        if total != cart.total {
            carts.set_total(cart.id, total).await?;
            cart.total = total;
        }

        Ok(CartView { cart, lines, total })
    }

    /// Drop the cached view and return a fresh one after a mutation.
    async fn refresh(&self, user_id: UserId) -> Result<CartView> {
        self.cache.store().delete(&keys::cart(user_id)).await;
        self.load_fresh(user_id).await
    }
}
