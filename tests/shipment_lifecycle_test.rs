mod common;

use assert_matches::assert_matches;
use common::TestApp;
use rust_decimal_macros::dec;
use shopcore_api::{
    entities::shipment::ShipmentStatus,
    errors::ServiceError,
    services::orders::{CreateOrderInput, OrderItemInput},
    services::shipments::CreateShipmentInput,
};
use uuid::Uuid;

async fn seed_order(app: &TestApp, store_id: Uuid) -> Uuid {
    let customer = app.seed_customer(store_id).await;
    let product = app.seed_product(store_id, dec!(25.00)).await;
    let (order, _items) = app
        .state
        .order_service()
        .create_order(
            store_id,
            CreateOrderInput {
                customer_id: customer.id,
                items: vec![OrderItemInput {
                    product_id: product.id,
                    quantity: 1,
                }],
                coupon_code: None,
                shipping_address: None,
                shipping_total: dec!(0),
                notes: None,
            },
        )
        .await
        .expect("order");
    order.id
}

async fn seed_shipment(app: &TestApp, store_id: Uuid, order_id: Uuid) -> Uuid {
    app.state
        .shipment_service()
        .create_shipment(
            store_id,
            CreateShipmentInput {
                order_id,
                recipient_name: "Test Buyer".to_string(),
                shipping_address: None,
                service_level: Some("standard".to_string()),
            },
        )
        .await
        .expect("shipment")
        .id
}

#[tokio::test]
async fn single_status_update_follows_the_allow_list() {
    let app = TestApp::new().await;
    let store = app.seed_store().await;
    let order_id = seed_order(&app, store.id).await;
    let shipment_id = seed_shipment(&app, store.id, order_id).await;

    // preparing -> delivered is not a legal jump
    let err = app
        .state
        .shipment_service()
        .update_status(store.id, shipment_id, ShipmentStatus::Delivered)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatus(_));

    let updated = app
        .state
        .shipment_service()
        .update_status(store.id, shipment_id, ShipmentStatus::InTransit)
        .await
        .expect("legal transition");
    assert_eq!(updated.status, ShipmentStatus::InTransit);
    assert!(updated.shipped_at.is_some());

    let updated = app
        .state
        .shipment_service()
        .update_status(store.id, shipment_id, ShipmentStatus::Delivered)
        .await
        .expect("in_transit -> delivered");
    assert_eq!(updated.status, ShipmentStatus::Delivered);
    assert!(updated.delivered_at.is_some());

    // delivered is terminal
    let err = app
        .state
        .shipment_service()
        .update_status(store.id, shipment_id, ShipmentStatus::InTransit)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatus(_));
}

#[tokio::test]
async fn bulk_update_rejects_whole_batch_and_names_offenders() {
    let app = TestApp::new().await;
    let store = app.seed_store().await;
    let order_id = seed_order(&app, store.id).await;

    let ok_a = seed_shipment(&app, store.id, order_id).await;
    let ok_b = seed_shipment(&app, store.id, order_id).await;
    let delivered = seed_shipment(&app, store.id, order_id).await;
    app.state
        .shipment_service()
        .update_status(store.id, delivered, ShipmentStatus::InTransit)
        .await
        .unwrap();
    app.state
        .shipment_service()
        .update_status(store.id, delivered, ShipmentStatus::Delivered)
        .await
        .unwrap();

    let err = app
        .state
        .shipment_service()
        .bulk_update_status(
            store.id,
            &[ok_a, ok_b, delivered],
            ShipmentStatus::InTransit,
        )
        .await
        .unwrap_err();
    match err {
        ServiceError::InvalidStatus(message) => {
            assert!(message.contains(&delivered.to_string()), "offender named");
            assert!(!message.contains(&ok_a.to_string()), "valid ids not blamed");
        }
        other => panic!("expected InvalidStatus, got {:?}", other),
    }

    // Nothing moved: the batch is all-or-nothing.
    let untouched = app
        .state
        .shipment_service()
        .get_shipment(store.id, ok_a)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched.status, ShipmentStatus::Preparing);

    let applied = app
        .state
        .shipment_service()
        .bulk_update_status(store.id, &[ok_a, ok_b], ShipmentStatus::InTransit)
        .await
        .expect("valid batch");
    assert_eq!(applied, 2);

    let moved = app
        .state
        .shipment_service()
        .get_shipment(store.id, ok_b)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(moved.status, ShipmentStatus::InTransit);
}

#[tokio::test]
async fn bulk_update_reports_missing_shipments() {
    let app = TestApp::new().await;
    let store = app.seed_store().await;
    let order_id = seed_order(&app, store.id).await;
    let real = seed_shipment(&app, store.id, order_id).await;
    let ghost = Uuid::new_v4();

    let err = app
        .state
        .shipment_service()
        .bulk_update_status(store.id, &[real, ghost], ShipmentStatus::InTransit)
        .await
        .unwrap_err();
    match err {
        ServiceError::NotFound(message) => assert!(message.contains(&ghost.to_string())),
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn guide_requires_paid_order_quote_and_no_existing_guide() {
    let app = TestApp::new().await;
    let store = app.seed_store().await;
    let order_id = seed_order(&app, store.id).await;
    let shipment_id = seed_shipment(&app, store.id, order_id).await;

    // No quote yet
    let err = app
        .state
        .shipment_service()
        .create_guide(store.id, shipment_id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidOperation(_));

    let quoted = app
        .state
        .shipment_service()
        .quote(store.id, shipment_id)
        .await
        .expect("quote");
    assert!(quoted.rate_ref.is_some());
    assert_eq!(quoted.rate_amount, Some(dec!(12.50)));
    assert_eq!(quoted.carrier.as_deref(), Some("TestExpress"));

    // Order still unpaid
    let err = app
        .state
        .shipment_service()
        .create_guide(store.id, shipment_id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidOperation(_));

    app.state
        .order_service()
        .mark_paid(store.id, order_id, "pay_abc123".to_string())
        .await
        .expect("pay order");

    let guided = app
        .state
        .shipment_service()
        .create_guide(store.id, shipment_id)
        .await
        .expect("guide");
    assert!(guided.guide_ref.is_some());
    assert!(guided.tracking_number.is_some());
    assert!(guided.label_url.is_some());

    // Guides are not re-issued
    let err = app
        .state
        .shipment_service()
        .create_guide(store.id, shipment_id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
async fn carrier_failure_surfaces_provider_message_and_leaves_shipment_unguided() {
    let app = TestApp::new().await;
    let store = app.seed_store().await;
    let order_id = seed_order(&app, store.id).await;
    let shipment_id = seed_shipment(&app, store.id, order_id).await;

    app.state
        .shipment_service()
        .quote(store.id, shipment_id)
        .await
        .unwrap();
    app.state
        .order_service()
        .mark_paid(store.id, order_id, "pay_abc123".to_string())
        .await
        .unwrap();

    app.carrier.set_failing(true);
    let err = app
        .state
        .shipment_service()
        .create_guide(store.id, shipment_id)
        .await
        .unwrap_err();
    match err {
        ServiceError::ExternalServiceError(message) => {
            assert!(message.contains("postal code not serviced"))
        }
        other => panic!("expected ExternalServiceError, got {:?}", other),
    }

    let shipment = app
        .state
        .shipment_service()
        .get_shipment(store.id, shipment_id)
        .await
        .unwrap()
        .unwrap();
    assert!(shipment.guide_ref.is_none(), "shipment left unguided");

    // No retry machinery: a later explicit call succeeds once the carrier does.
    app.carrier.set_failing(false);
    let guided = app
        .state
        .shipment_service()
        .create_guide(store.id, shipment_id)
        .await
        .unwrap();
    assert!(guided.guide_ref.is_some());
}

#[tokio::test]
async fn tracking_number_lookup_is_store_scoped() {
    let app = TestApp::new().await;
    let store = app.seed_store().await;
    let other_store = app.seed_store().await;
    let order_id = seed_order(&app, store.id).await;
    let shipment_id = seed_shipment(&app, store.id, order_id).await;

    app.state
        .shipment_service()
        .quote(store.id, shipment_id)
        .await
        .unwrap();
    app.state
        .order_service()
        .mark_paid(store.id, order_id, "pay_x".to_string())
        .await
        .unwrap();
    let guided = app
        .state
        .shipment_service()
        .create_guide(store.id, shipment_id)
        .await
        .unwrap();
    let tracking = guided.tracking_number.unwrap();

    let found = app
        .state
        .shipment_service()
        .find_by_tracking_number(store.id, &tracking)
        .await
        .unwrap();
    assert!(found.is_some());

    let cross_tenant = app
        .state
        .shipment_service()
        .find_by_tracking_number(other_store.id, &tracking)
        .await
        .unwrap();
    assert!(cross_tenant.is_none());
}
