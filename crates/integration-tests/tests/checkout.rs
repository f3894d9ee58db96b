//! Integration tests for the checkout workflow.
//!
//! These tests require a running `PostgreSQL` database reachable through
//! `DATABASE_URL`; run them with `cargo test -- --ignored`.

use pomelo_backend::AppError;
use pomelo_backend::models::CreateOrder;
use pomelo_backend::notify::NotificationEvent;
use pomelo_core::OrderStatus;
use pomelo_integration_tests::TestContext;
use rust_decimal_macros::dec;

fn order_request() -> CreateOrder {
    CreateOrder {
        shipping_address: "1 Main St".to_owned(),
        payment_method: "card".to_owned(),
    }
}

async fn order_count(ctx: &TestContext, user_id: pomelo_core::UserId) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&ctx.pool)
        .await
        .expect("count orders");
    count
}

#[tokio::test]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn test_insufficient_stock_aborts_without_mutating_anything() {
    let ctx = TestContext::new().await;
    let user = ctx.seed_user().await;
    let category = ctx.seed_category().await;

    // Product A has stock 1 but the cart wants 2; B is fully coverable
    let a = ctx.seed_product(category, dec!(10), 1).await;
    let b = ctx.seed_product(category, dec!(5), 5).await;
    ctx.seed_cart_item(user.id, a.id, 2).await;
    ctx.seed_cart_item(user.id, b.id, 1).await;

    let err = ctx
        .checkout()
        .create_order(user.id, &order_request())
        .await
        .expect_err("checkout must fail");
    match err {
        AppError::InsufficientStock {
            product_id,
            requested,
            available,
        } => {
            assert_eq!(product_id, a.id);
            assert_eq!(requested, 2);
            assert_eq!(available, 1);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    // Nothing moved: no order, stock untouched, cart intact, no event
    assert_eq!(order_count(&ctx, user.id).await, 0);
    assert_eq!(ctx.stock_of(a.id).await, 1);
    assert_eq!(ctx.stock_of(b.id).await, 5);
    let cart = ctx.carts().get_cart(user.id).await.expect("cart");
    assert_eq!(cart.lines.len(), 2);
    assert!(ctx.sink.events().is_empty());
}

#[tokio::test]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn test_successful_checkout_decrements_stock_and_empties_cart() {
    let ctx = TestContext::new().await;
    let user = ctx.seed_user().await;
    let category = ctx.seed_category().await;

    let a = ctx.seed_product(category, dec!(10), 5).await;
    let b = ctx.seed_product(category, dec!(5), 5).await;
    ctx.seed_cart_item(user.id, a.id, 2).await;
    ctx.seed_cart_item(user.id, b.id, 1).await;

    let view = ctx
        .checkout()
        .create_order(user.id, &order_request())
        .await
        .expect("checkout succeeds");

    assert_eq!(view.order.total, dec!(25));
    assert_eq!(view.order.status, OrderStatus::Pending);
    assert_eq!(view.items.len(), 2);
    // Purchase-time prices were copied onto the items
    assert!(view.items.iter().any(|i| i.product_id == a.id && i.price == dec!(10)));
    assert!(view.items.iter().any(|i| i.product_id == b.id && i.price == dec!(5)));

    assert_eq!(ctx.stock_of(a.id).await, 3);
    assert_eq!(ctx.stock_of(b.id).await, 4);

    let cart = ctx.carts().get_cart(user.id).await.expect("cart");
    assert!(cart.lines.is_empty());
    assert_eq!(cart.total, dec!(0));

    let events = ctx.sink.events();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        events.first(),
        Some(NotificationEvent::OrderCreated { user_id, .. }) if *user_id == user.id
    ));
}

#[tokio::test]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn test_checkout_of_empty_cart_is_rejected() {
    let ctx = TestContext::new().await;
    let user = ctx.seed_user().await;

    let err = ctx
        .checkout()
        .create_order(user.id, &order_request())
        .await
        .expect_err("empty cart must fail");
    assert!(matches!(err, AppError::EmptyCart));
    assert_eq!(order_count(&ctx, user.id).await, 0);
}

#[tokio::test]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn test_racing_checkouts_never_oversell() {
    let ctx = TestContext::new().await;
    let category = ctx.seed_category().await;
    let product = ctx.seed_product(category, dec!(10), 1).await;

    let first = ctx.seed_user().await;
    let second = ctx.seed_user().await;
    ctx.seed_cart_item(first.id, product.id, 1).await;
    ctx.seed_cart_item(second.id, product.id, 1).await;

    let first_checkout = ctx.checkout();
    let second_checkout = ctx.checkout();
    let first_request = order_request();
    let second_request = order_request();
    let (left, right) = tokio::join!(
        first_checkout.create_order(first.id, &first_request),
        second_checkout.create_order(second.id, &second_request),
    );

    let successes = [&left, &right].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one checkout may win the last unit");
    assert_eq!(ctx.stock_of(product.id).await, 0);

    // The loser saw the post-decrement stock, not a negative value
    for outcome in [left, right] {
        if let Err(AppError::InsufficientStock { available, .. }) = outcome {
            assert_eq!(available, 0);
        }
    }
}
