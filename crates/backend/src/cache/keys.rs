//! Cache key namespaces.
//!
//! Exact keys address one entity; `*_LIST`/`*_list` values are prefixes fed
//! to `delete_by_prefix`, and every paged list key is built under its
//! prefix so one prefix delete invalidates all pages and filters.

use pomelo_core::{CategoryId, OrderId, ProductId, UserId};

/// Prefix covering every product list/query key.
pub const PRODUCT_LIST: &str = "product:list:";

/// Prefix covering every category list key.
pub const CATEGORY_LIST: &str = "category:list:";

/// Exact key for one product.
#[must_use]
pub fn product(id: ProductId) -> String {
    format!("product:{id}")
}

/// Paged product list key, under [`PRODUCT_LIST`].
#[must_use]
pub fn product_page(
    page: i64,
    limit: i64,
    search: Option<&str>,
    category_id: Option<CategoryId>,
) -> String {
    let search = search.unwrap_or("");
    let category = category_id.map_or_else(String::new, |id| id.to_string());
    format!("{PRODUCT_LIST}{page}:{limit}:{search}:{category}")
}

/// Exact key for one category.
#[must_use]
pub fn category(id: CategoryId) -> String {
    format!("category:{id}")
}

/// Key for the full category listing.
#[must_use]
pub fn category_list() -> String {
    format!("{CATEGORY_LIST}all")
}

/// Exact key for a user's cart view.
#[must_use]
pub fn cart(user_id: UserId) -> String {
    format!("cart:{user_id}")
}

/// Exact key for one order.
#[must_use]
pub fn order(id: OrderId) -> String {
    format!("order:{id}")
}

/// Prefix covering every order list key for one user.
#[must_use]
pub fn order_list(user_id: UserId) -> String {
    format!("order:list:{user_id}:")
}

/// Paged order list key, under [`order_list`].
#[must_use]
pub fn order_page(user_id: UserId, page: i64, limit: i64) -> String {
    format!("{}{page}:{limit}", order_list(user_id))
}

/// Exact key for a user's profile.
#[must_use]
pub fn profile(user_id: UserId) -> String {
    format!("profile:{user_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paged_keys_live_under_their_prefix() {
        assert!(product_page(1, 10, Some("citrus"), None).starts_with(PRODUCT_LIST));
        assert!(
            order_page(UserId::new(7), 2, 10).starts_with(&order_list(UserId::new(7)))
        );
        assert!(category_list().starts_with(CATEGORY_LIST));
    }

    #[test]
    fn test_order_list_prefixes_are_per_user() {
        assert!(!order_page(UserId::new(8), 1, 10).starts_with(&order_list(UserId::new(7))));
    }

    #[test]
    fn test_exact_keys() {
        assert_eq!(product(ProductId::new(3)), "product:3");
        assert_eq!(cart(UserId::new(5)), "cart:5");
        assert_eq!(order(OrderId::new(9)), "order:9");
    }
}
