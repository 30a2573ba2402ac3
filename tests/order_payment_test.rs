mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use common::TestApp;
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use shopcore_api::{
    entities::coupon,
    entities::order::{OrderStatus, PaymentStatus},
    errors::ServiceError,
    services::coupons::CreateCouponInput,
    services::orders::{CreateOrderInput, OrderItemInput},
};
use uuid::Uuid;

fn order_input(customer_id: Uuid, product_id: Uuid, quantity: i32) -> CreateOrderInput {
    CreateOrderInput {
        customer_id,
        items: vec![OrderItemInput {
            product_id,
            quantity,
        }],
        coupon_code: None,
        shipping_address: None,
        shipping_total: dec!(0),
        notes: None,
    }
}

#[tokio::test]
async fn paying_decrements_stock_once_and_issues_the_invoice() {
    let app = TestApp::new().await;
    let store = app.seed_store().await;
    let customer = app.seed_customer(store.id).await;
    let product = app.seed_product(store.id, dec!(25.00)).await;
    app.state
        .inventory_service()
        .set_level(store.id, product.id, 10, 2)
        .await
        .unwrap();

    let (order, items) = app
        .state
        .order_service()
        .create_order(store.id, order_input(customer.id, product.id, 3))
        .await
        .expect("order");
    assert_eq!(items.len(), 1);
    assert_eq!(order.total, dec!(75.00));

    let paid = app
        .state
        .order_service()
        .mark_paid(store.id, order.id, "pay_ref_1".to_string())
        .await
        .expect("pay");
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
    assert_eq!(paid.status, OrderStatus::Processing);
    assert!(paid.paid_at.is_some());

    let level = app
        .state
        .inventory_service()
        .get_level(store.id, product.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(level.quantity, 7, "stock decremented exactly once");

    let invoice = app
        .state
        .invoice_service()
        .get_invoice_for_order(store.id, order.id)
        .await
        .unwrap()
        .expect("invoice issued with payment");
    assert_eq!(invoice.amount, dec!(75.00));

    // Second payment attempt: conflict, and stock untouched.
    let err = app
        .state
        .order_service()
        .mark_paid(store.id, order.id, "pay_ref_2".to_string())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));

    let level = app
        .state
        .inventory_service()
        .get_level(store.id, product.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(level.quantity, 7, "no double decrement");
}

#[tokio::test]
async fn insufficient_stock_rolls_back_the_whole_payment() {
    let app = TestApp::new().await;
    let store = app.seed_store().await;
    let customer = app.seed_customer(store.id).await;
    let product = app.seed_product(store.id, dec!(10.00)).await;
    app.state
        .inventory_service()
        .set_level(store.id, product.id, 2, 0)
        .await
        .unwrap();

    let (order, _) = app
        .state
        .order_service()
        .create_order(store.id, order_input(customer.id, product.id, 5))
        .await
        .unwrap();

    let err = app
        .state
        .order_service()
        .mark_paid(store.id, order.id, "pay_ref".to_string())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));

    // Transaction rolled back: order unpaid, stock intact, no invoice.
    let reloaded = app
        .state
        .order_service()
        .get_order(store.id, order.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.payment_status, PaymentStatus::Pending);

    let level = app
        .state
        .inventory_service()
        .get_level(store.id, product.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(level.quantity, 2);

    let invoice = app
        .state
        .invoice_service()
        .get_invoice_for_order(store.id, order.id)
        .await
        .unwrap();
    assert!(invoice.is_none());
}

#[tokio::test]
async fn untracked_products_skip_the_stock_check() {
    let app = TestApp::new().await;
    let store = app.seed_store().await;
    let customer = app.seed_customer(store.id).await;
    // No inventory level row for this product.
    let product = app.seed_product(store.id, dec!(15.00)).await;

    let (order, _) = app
        .state
        .order_service()
        .create_order(store.id, order_input(customer.id, product.id, 2))
        .await
        .unwrap();

    let paid = app
        .state
        .order_service()
        .mark_paid(store.id, order.id, "pay_ref".to_string())
        .await
        .expect("untracked products do not block payment");
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
}

#[tokio::test]
async fn coupon_below_minimum_rejects_the_order() {
    let app = TestApp::new().await;
    let store = app.seed_store().await;
    let customer = app.seed_customer(store.id).await;
    let product = app.seed_product(store.id, dec!(10.00)).await;

    app.state
        .coupon_service()
        .create_coupon(
            store.id,
            CreateCouponInput {
                code: "BIGSPEND".to_string(),
                kind: coupon::DiscountKind::Percentage,
                value: dec!(20),
                min_order_value: Some(dec!(50)),
                max_uses: None,
                starts_at: Utc::now() - Duration::hours(1),
                ends_at: Utc::now() + Duration::hours(1),
            },
        )
        .await
        .unwrap();

    let mut input = order_input(customer.id, product.id, 3); // subtotal 30
    input.coupon_code = Some("BIGSPEND".to_string());
    let err = app
        .state
        .order_service()
        .create_order(store.id, input)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidOperation(_));
}

#[tokio::test]
async fn coupon_applies_and_redeems_in_the_order_transaction() {
    let app = TestApp::new().await;
    let store = app.seed_store().await;
    let customer = app.seed_customer(store.id).await;
    let product = app.seed_product(store.id, dec!(40.00)).await;

    let created = app
        .state
        .coupon_service()
        .create_coupon(
            store.id,
            CreateCouponInput {
                code: "SAVE25".to_string(),
                kind: coupon::DiscountKind::Percentage,
                value: dec!(25),
                min_order_value: Some(dec!(50)),
                max_uses: Some(10),
                starts_at: Utc::now() - Duration::hours(1),
                ends_at: Utc::now() + Duration::hours(1),
            },
        )
        .await
        .unwrap();

    let mut input = order_input(customer.id, product.id, 2); // subtotal 80
    input.coupon_code = Some("save25".to_string()); // codes are case-insensitive
    let (order, _) = app
        .state
        .order_service()
        .create_order(store.id, input)
        .await
        .expect("order with coupon");

    assert_eq!(order.subtotal, dec!(80.00));
    assert_eq!(order.discount_total, dec!(20.00));
    assert_eq!(order.total, dec!(60.00));
    assert_eq!(order.coupon_id, Some(created.id));

    let coupon = coupon::Entity::find_by_id(created.id)
        .one(app.db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(coupon.used_count, 1, "redemption committed with the order");
}

#[tokio::test]
async fn cancel_is_blocked_once_shipped() {
    let app = TestApp::new().await;
    let store = app.seed_store().await;
    let customer = app.seed_customer(store.id).await;
    let product = app.seed_product(store.id, dec!(10.00)).await;

    let (order, _) = app
        .state
        .order_service()
        .create_order(store.id, order_input(customer.id, product.id, 1))
        .await
        .unwrap();

    app.state
        .order_service()
        .update_status(store.id, order.id, OrderStatus::Shipped)
        .await
        .unwrap();

    let err = app
        .state
        .order_service()
        .cancel_order(store.id, order.id, Some("changed my mind".to_string()))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidOperation(_));
}
