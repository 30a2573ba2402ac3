mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::TestApp;
use http_body_util::BodyExt;
use serde_json::Value;
use shopcore_api::auth::consts as perm;
use tower::ServiceExt;
use uuid::Uuid;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn status_endpoint_is_public() {
    let app = TestApp::new().await;
    let response = app
        .router()
        .oneshot(
            Request::builder()
                .uri("/api/v1/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["service"], "shopcore-api");
}

#[tokio::test]
async fn admin_routes_require_a_session_token() {
    let app = TestApp::new().await;
    let response = app
        .router()
        .oneshot(
            Request::builder()
                .uri("/api/v1/stores")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn permission_and_tenancy_are_enforced() {
    let app = TestApp::new().await;
    let store = app.seed_store().await;

    // Right permission, wrong store: 403 from the tenancy check.
    let foreign_token = app.token(vec![Uuid::new_v4()], vec![perm::STORES_READ]);
    let response = app
        .router()
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/stores/{}", store.id))
                .header("authorization", format!("Bearer {}", foreign_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Right store, missing permission: 403 from the permission gate.
    let unprivileged_token = app.token(vec![store.id], vec![perm::ORDERS_READ]);
    let response = app
        .router()
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/stores/{}", store.id))
                .header("authorization", format!("Bearer {}", unprivileged_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Right store, right permission.
    let token = app.token(vec![store.id], vec![perm::STORES_READ]);
    let response = app
        .router()
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/stores/{}", store.id))
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["id"], store.id.to_string());
}

#[tokio::test]
async fn unknown_store_is_a_404_for_authorized_admins() {
    let app = TestApp::new().await;
    let ghost = Uuid::new_v4();
    let token = app.token(vec![ghost], vec![perm::STORES_READ]);

    let response = app
        .router()
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/stores/{}", ghost))
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Not Found");
}

#[tokio::test]
async fn storefront_catalog_is_public_and_store_slug_addressed() {
    let app = TestApp::new().await;
    let store = app.seed_store().await;
    app.seed_product(store.id, rust_decimal_macros::dec!(12.00))
        .await;

    let response = app
        .router()
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/storefront/{}/catalog", store.slug))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["total"], 1);

    let response = app
        .router()
        .oneshot(
            Request::builder()
                .uri("/api/v1/storefront/no-such-store/catalog")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn discount_sweep_is_gated_by_the_cron_token() {
    let app = TestApp::new().await;

    let response = app
        .router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/maintenance/discounts/sweep")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/maintenance/discounts/sweep")
                .header("x-cron-token", "cron-secret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["coupons_activated"], 0);
    // Redis is not running in tests; the sweep still succeeds and reports
    // the invalidation as skipped.
    assert!(body["data"]["cache_keys_invalidated"].is_null());
}

#[tokio::test]
async fn responses_carry_a_request_id_when_middleware_is_mounted() {
    let app = TestApp::new().await;
    let router = app.router().layer(axum::middleware::from_fn(
        shopcore_api::request_id::request_id_middleware,
    ));

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/status")
                .header("x-request-id", "req-smoke-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "req-smoke-1"
    );

    let body = body_json(response).await;
    assert_eq!(body["data"]["service"], "shopcore-api");
    assert_eq!(body["meta"]["request_id"], "req-smoke-1");
}
