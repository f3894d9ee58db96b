//! Catalog service.
//!
//! Reads are cached; every paged/filtered listing key lives under the
//! `product:list:` prefix so one prefix delete after a write invalidates all
//! of them at once. Catalog writes require [`Operation::ManageProducts`].

use std::time::Duration;

use pomelo_core::{CategoryId, ProductId};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{info, instrument};

use crate::access::{self, Actor, Operation};
use crate::cache::{CacheAside, keys};
use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::models::{Category, NewProduct, Page, Product, ProductUpdate};

const PRODUCT_TTL: Duration = Duration::from_secs(300);
const LIST_TTL: Duration = Duration::from_secs(120);

/// Cached catalog reads and admin-gated writes.
pub struct ProductService {
    pool: PgPool,
    cache: CacheAside,
}

impl ProductService {
    /// Create a product service.
    #[must_use]
    pub const fn new(pool: PgPool, cache: CacheAside) -> Self {
        Self { pool, cache }
    }

    /// Get one product.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if it doesn't exist.
    pub async fn get_product(&self, id: ProductId) -> Result<Product> {
        self.cache
            .get_or_set(&keys::product(id), Some(PRODUCT_TTL), || async {
                ProductRepository::new(&self.pool)
                    .get(id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("product {id}")))
            })
            .await
    }

    /// List products with optional search and category filters.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails on a cache miss.
    pub async fn list_products(
        &self,
        page: i64,
        limit: i64,
        search: Option<&str>,
        category_id: Option<CategoryId>,
    ) -> Result<Page<Product>> {
        let key = keys::product_page(page, limit, search, category_id);
        self.cache
            .get_or_set(&key, Some(LIST_TTL), || async {
                ProductRepository::new(&self.pool)
                    .list(page, limit, search, category_id)
                    .await
                    .map_err(AppError::from)
            })
            .await
    }

    /// Get one category.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if it doesn't exist.
    pub async fn get_category(&self, id: CategoryId) -> Result<Category> {
        self.cache
            .get_or_set(&keys::category(id), Some(PRODUCT_TTL), || async {
                ProductRepository::new(&self.pool)
                    .get_category(id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("category {id}")))
            })
            .await
    }

    /// List all categories.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails on a cache miss.
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.cache
            .get_or_set(&keys::category_list(), Some(LIST_TTL), || async {
                ProductRepository::new(&self.pool)
                    .list_categories()
                    .await
                    .map_err(AppError::from)
            })
            .await
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` without the permission and
    /// `AppError::Validation` for a negative price or stock.
    #[instrument(skip(self, actor, new), fields(name = %new.name))]
    pub async fn create_product(&self, actor: &Actor, new: &NewProduct) -> Result<Product> {
        access::require(actor, Operation::ManageProducts)?;
        validate_price_and_stock(Some(new.price), Some(new.stock))?;

        let product = ProductRepository::new(&self.pool).create(new).await?;
        self.cache.store().delete_by_prefix(keys::PRODUCT_LIST).await;
        info!(product = %product.id, "product created");
        Ok(product)
    }

    /// Apply a partial update to a product.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` without the permission,
    /// `AppError::NotFound` for an unknown product, and
    /// `AppError::Validation` for a negative price or stock.
    #[instrument(skip(self, actor, update), fields(product = %id))]
    pub async fn update_product(
        &self,
        actor: &Actor,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product> {
        access::require(actor, Operation::ManageProducts)?;
        validate_price_and_stock(update.price, update.stock)?;

        let product = ProductRepository::new(&self.pool).update(id, update).await?;
        let store = self.cache.store();
        store.delete(&keys::product(id)).await;
        store.delete_by_prefix(keys::PRODUCT_LIST).await;
        info!("product updated");
        Ok(product)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` without the permission and
    /// `AppError::NotFound` for an unknown product.
    #[instrument(skip(self, actor), fields(product = %id))]
    pub async fn delete_product(&self, actor: &Actor, id: ProductId) -> Result<()> {
        access::require(actor, Operation::ManageProducts)?;

        if !ProductRepository::new(&self.pool).delete(id).await? {
            return Err(AppError::NotFound(format!("product {id}")));
        }
        let store = self.cache.store();
        store.delete(&keys::product(id)).await;
        store.delete_by_prefix(keys::PRODUCT_LIST).await;
        info!("product deleted");
        Ok(())
    }
}

fn validate_price_and_stock(price: Option<Decimal>, stock: Option<i32>) -> Result<()> {
    if let Some(price) = price
        && price < Decimal::ZERO
    {
        return Err(AppError::Validation(format!(
            "price must not be negative, got {price}"
        )));
    }
    if let Some(stock) = stock
        && stock < 0
    {
        return Err(AppError::Validation(format!(
            "stock must not be negative, got {stock}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_negative_price_is_rejected() {
        assert!(matches!(
            validate_price_and_stock(Some(dec!(-0.01)), None),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_negative_stock_is_rejected() {
        assert!(matches!(
            validate_price_and_stock(None, Some(-1)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_zero_values_are_valid() {
        assert!(validate_price_and_stock(Some(Decimal::ZERO), Some(0)).is_ok());
    }
}
