mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use common::TestApp;
use rust_decimal_macros::dec;
use shopcore_api::{
    entities::order::PaymentStatus,
    entities::quotation::QuotationStatus,
    errors::ServiceError,
    services::quotations::{CreateQuotationInput, QuotationItemInput},
};

#[tokio::test]
async fn accepted_quotation_converts_into_an_order_once() {
    let app = TestApp::new().await;
    let store = app.seed_store().await;
    let customer = app.seed_customer(store.id).await;
    let product = app.seed_product(store.id, dec!(100.00)).await;

    let (quotation, items) = app
        .state
        .quotation_service()
        .create_quotation(
            store.id,
            CreateQuotationInput {
                customer_id: customer.id,
                items: vec![QuotationItemInput {
                    product_id: product.id,
                    quantity: 3,
                    unit_price: Some(dec!(90.00)), // negotiated below catalog
                }],
                valid_until: Some(Utc::now() + Duration::days(7)),
                notes: None,
            },
        )
        .await
        .expect("quotation");
    assert_eq!(quotation.status, QuotationStatus::Draft);
    assert_eq!(quotation.total, dec!(270.00));
    assert_eq!(items.len(), 1);

    // Draft cannot convert
    let err = app
        .state
        .quotation_service()
        .convert_to_order(store.id, quotation.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatus(_));

    app.state
        .quotation_service()
        .send_quotation(store.id, quotation.id)
        .await
        .unwrap();
    app.state
        .quotation_service()
        .accept_quotation(store.id, quotation.id)
        .await
        .unwrap();

    let (converted, order) = app
        .state
        .quotation_service()
        .convert_to_order(store.id, quotation.id)
        .await
        .expect("convert");
    assert_eq!(converted.status, QuotationStatus::Converted);
    assert_eq!(converted.converted_order_id, Some(order.id));
    assert_eq!(order.total, dec!(270.00));
    assert_eq!(order.payment_status, PaymentStatus::Pending);

    // Quoted prices, not catalog prices, flow onto the order.
    let order_items = app
        .state
        .order_service()
        .get_order_items(store.id, order.id)
        .await
        .unwrap();
    assert_eq!(order_items.len(), 1);
    assert_eq!(order_items[0].unit_price, dec!(90.00));
    assert_eq!(order_items[0].quantity, 3);

    // Converting twice would mint a duplicate order.
    let err = app
        .state
        .quotation_service()
        .convert_to_order(store.id, quotation.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
async fn expired_quotation_cannot_be_accepted_or_converted() {
    let app = TestApp::new().await;
    let store = app.seed_store().await;
    let customer = app.seed_customer(store.id).await;
    let product = app.seed_product(store.id, dec!(50.00)).await;

    let (quotation, _) = app
        .state
        .quotation_service()
        .create_quotation(
            store.id,
            CreateQuotationInput {
                customer_id: customer.id,
                items: vec![QuotationItemInput {
                    product_id: product.id,
                    quantity: 1,
                    unit_price: None,
                }],
                valid_until: Some(Utc::now() - Duration::days(1)),
                notes: None,
            },
        )
        .await
        .unwrap();

    let err = app
        .state
        .quotation_service()
        .send_quotation(store.id, quotation.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidOperation(_));
}

#[tokio::test]
async fn declined_quotation_stays_declined() {
    let app = TestApp::new().await;
    let store = app.seed_store().await;
    let customer = app.seed_customer(store.id).await;
    let product = app.seed_product(store.id, dec!(50.00)).await;

    let (quotation, _) = app
        .state
        .quotation_service()
        .create_quotation(
            store.id,
            CreateQuotationInput {
                customer_id: customer.id,
                items: vec![QuotationItemInput {
                    product_id: product.id,
                    quantity: 2,
                    unit_price: None,
                }],
                valid_until: None,
                notes: None,
            },
        )
        .await
        .unwrap();

    app.state
        .quotation_service()
        .send_quotation(store.id, quotation.id)
        .await
        .unwrap();
    app.state
        .quotation_service()
        .decline_quotation(store.id, quotation.id)
        .await
        .unwrap();

    let err = app
        .state
        .quotation_service()
        .convert_to_order(store.id, quotation.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatus(_));
}
