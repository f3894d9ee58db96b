//! Integration tests for the order status lifecycle.
//!
//! Database-backed tests require `DATABASE_URL`; the transition-matrix test
//! at the bottom runs without one.

use pomelo_backend::AppError;
use pomelo_backend::access::Actor;
use pomelo_backend::models::{CreateOrder, OrderView};
use pomelo_backend::notify::NotificationEvent;
use pomelo_core::OrderStatus;
use pomelo_integration_tests::TestContext;
use rust_decimal_macros::dec;

async fn placed_order(ctx: &TestContext, stock: i32, quantity: i32) -> (Actor, OrderView) {
    let user = ctx.seed_user().await;
    let category = ctx.seed_category().await;
    let product = ctx.seed_product(category, dec!(10), stock).await;
    ctx.seed_cart_item(user.id, product.id, quantity).await;

    let view = ctx
        .checkout()
        .create_order(
            user.id,
            &CreateOrder {
                shipping_address: "1 Main St".to_owned(),
                payment_method: "card".to_owned(),
            },
        )
        .await
        .expect("checkout succeeds");
    (Actor::customer(user.id), view)
}

#[tokio::test]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn test_shipping_an_order_notifies_the_owner_exactly_once() {
    let ctx = TestContext::new().await;
    let (owner, view) = placed_order(&ctx, 5, 1).await;
    let admin = Actor::admin(ctx.seed_user().await.id);

    let updated = ctx
        .orders()
        .update_status(&admin, view.order.id, OrderStatus::Shipped)
        .await
        .expect("pending to shipped is a valid transition");
    assert_eq!(updated.status, OrderStatus::Shipped);

    let status_events: Vec<_> = ctx
        .sink
        .events()
        .into_iter()
        .filter(|e| matches!(e, NotificationEvent::OrderStatusChanged { .. }))
        .collect();
    assert_eq!(status_events.len(), 1);
    assert!(matches!(
        status_events.first(),
        Some(NotificationEvent::OrderStatusChanged { user_id, order_id, status })
            if *user_id == owner.user_id
                && *order_id == view.order.id
                && *status == OrderStatus::Shipped
    ));
}

#[tokio::test]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn test_backward_transition_is_rejected() {
    let ctx = TestContext::new().await;
    let (_, view) = placed_order(&ctx, 5, 1).await;
    let admin = Actor::admin(ctx.seed_user().await.id);

    ctx.orders()
        .update_status(&admin, view.order.id, OrderStatus::Shipped)
        .await
        .expect("forward transition");

    let err = ctx
        .orders()
        .update_status(&admin, view.order.id, OrderStatus::Processing)
        .await
        .expect_err("shipped may not move back");
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn test_customers_may_not_update_status() {
    let ctx = TestContext::new().await;
    let (owner, view) = placed_order(&ctx, 5, 1).await;

    let err = ctx
        .orders()
        .update_status(&owner, view.order.id, OrderStatus::Shipped)
        .await
        .expect_err("customers are not allowed");
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn test_cancellation_returns_reserved_stock() {
    let ctx = TestContext::new().await;
    let (_, view) = placed_order(&ctx, 5, 2).await;
    let admin = Actor::admin(ctx.seed_user().await.id);

    let product_id = view.items.first().expect("one item").product_id;
    assert_eq!(ctx.stock_of(product_id).await, 3);

    let updated = ctx
        .orders()
        .update_status(&admin, view.order.id, OrderStatus::Cancelled)
        .await
        .expect("pending orders can be cancelled");
    assert_eq!(updated.status, OrderStatus::Cancelled);
    assert_eq!(ctx.stock_of(product_id).await, 5);
}

#[test]
fn test_transition_matrix() {
    use OrderStatus::{Cancelled, Delivered, Pending, Processing, Shipped};

    // Forward moves, including skips
    assert!(Pending.can_transition_to(Processing));
    assert!(Pending.can_transition_to(Shipped));
    assert!(Processing.can_transition_to(Delivered));

    // Cancellation is reachable from any non-terminal state
    assert!(Pending.can_transition_to(Cancelled));
    assert!(Shipped.can_transition_to(Cancelled));

    // Backward moves and exits from terminal states are not
    assert!(!Shipped.can_transition_to(Processing));
    assert!(!Delivered.can_transition_to(Shipped));
    assert!(!Cancelled.can_transition_to(Pending));
    assert!(!Delivered.can_transition_to(Cancelled));
}
