//! Domain models mirrored by the Postgres schema.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use pomelo_core::{
    CartId, CartItemId, CategoryId, NotificationId, NotificationKind, OrderId, OrderItemId,
    OrderStatus, ProductId, UserId,
};

/// A store account. Profile reads are served through the cache layer.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Product category.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
}

/// Catalog product. `stock` is mutated only by the inventory ledger inside a
/// checkout transaction or by an admin product edit.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub category_id: CategoryId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub category_id: CategoryId,
}

/// Partial product update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub category_id: Option<CategoryId>,
}

/// A user's cart. Created lazily on first access; emptied (not deleted) by
/// checkout. `total` is derived and recomputed on read.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub total: Decimal,
}

/// A bare cart item row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: i32,
}

/// One cart line joined with its product snapshot. The snapshot fields
/// (`unit_price`, `stock`, `product_name`) are what checkout validates and
/// copies into the order.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CartLine {
    pub item_id: CartItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub stock: i32,
}

impl CartLine {
    /// Line subtotal at the snapshot price.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A cart together with its lines and derived total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartView {
    pub cart: Cart,
    pub lines: Vec<CartLine>,
    pub total: Decimal,
}

/// A placed order. Immutable except for `status`; `total` is a snapshot taken
/// at creation and does not track later price edits.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub total: Decimal,
    pub shipping_address: String,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
}

/// An order line. `price` is a copy taken at purchase time, not a reference.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub price: Decimal,
}

/// An order with its items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderView {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Caller-supplied checkout fields.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrder {
    pub shipping_address: String,
    pub payment_method: String,
}

/// A user-facing notification row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Pagination envelope shared by list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

impl<T> Page<T> {
    /// Number of pages at the current limit.
    #[must_use]
    pub const fn pages(&self) -> i64 {
        if self.limit == 0 {
            0
        } else {
            // Inlined `i64::div_ceil` (signed div_ceil is unstable on stable Rust).
            let quotient = self.total / self.limit;
            let remainder = self.total % self.limit;
            if (remainder > 0 && self.limit > 0) || (remainder < 0 && self.limit < 0) {
                quotient + 1
            } else {
                quotient
            }
        }
    }
}
