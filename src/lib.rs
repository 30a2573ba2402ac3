//! Shopcore API library: multi-tenant e-commerce backend serving the admin
//! dashboard and the customer storefront.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod cache;
pub mod carriers;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod images;
pub mod migrator;
pub mod notifications;
pub mod openapi;
pub mod request_id;
pub mod services;

use axum::{extract::State, response::Json, routing::get, routing::post, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::consts as perm;
use crate::auth::AuthRouterExt;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
    pub cache: cache::CacheClient,
    pub redis: Arc<redis::Client>,
}

impl AppState {
    pub fn store_service(&self) -> Arc<services::stores::StoreService> {
        self.services.stores.clone()
    }

    pub fn customer_service(&self) -> Arc<services::customers::CustomerService> {
        self.services.customers.clone()
    }

    pub fn category_service(&self) -> Arc<services::categories::CategoryService> {
        self.services.categories.clone()
    }

    pub fn product_service(&self) -> Arc<services::products::ProductService> {
        self.services.products.clone()
    }

    pub fn design_service(&self) -> Arc<services::designs::DesignService> {
        self.services.designs.clone()
    }

    pub fn inventory_service(&self) -> Arc<services::inventory::InventoryService> {
        self.services.inventory.clone()
    }

    pub fn order_service(&self) -> Arc<services::orders::OrderService> {
        self.services.orders.clone()
    }

    pub fn shipment_service(&self) -> Arc<services::shipments::ShipmentService> {
        self.services.shipments.clone()
    }

    pub fn coupon_service(&self) -> Arc<services::coupons::CouponService> {
        self.services.coupons.clone()
    }

    pub fn offer_service(&self) -> Arc<services::offers::OfferService> {
        self.services.offers.clone()
    }

    pub fn quotation_service(&self) -> Arc<services::quotations::QuotationService> {
        self.services.quotations.clone()
    }

    pub fn invoice_service(&self) -> Arc<services::invoices::InvoiceService> {
        self.services.invoices.clone()
    }
}

/// Standard response wrapper for every JSON endpoint.
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: request_id::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// The versioned API surface: admin routes behind session auth and
/// permissions, public storefront routes, and the token-gated
/// maintenance/webhook endpoints.
pub fn api_v1_routes() -> Router<AppState> {
    let stores_read = Router::new()
        .route("/stores", get(handlers::stores::list_stores))
        .route("/stores/:store_id", get(handlers::stores::get_store))
        .with_permission(perm::STORES_READ);

    let stores_write = Router::new()
        .route("/stores", post(handlers::stores::create_store))
        .route(
            "/stores/:store_id",
            axum::routing::put(handlers::stores::update_store)
                .delete(handlers::stores::archive_store),
        )
        .with_permission(perm::STORES_WRITE);

    let catalog_read = Router::new()
        .route(
            "/stores/:store_id/categories",
            get(handlers::categories::list_categories),
        )
        .route(
            "/stores/:store_id/categories/:id",
            get(handlers::categories::get_category),
        )
        .route(
            "/stores/:store_id/products",
            get(handlers::products::list_products),
        )
        .route(
            "/stores/:store_id/products/:id",
            get(handlers::products::get_product),
        )
        .route(
            "/stores/:store_id/products/:id/images",
            get(handlers::products::list_product_images),
        )
        .route(
            "/stores/:store_id/designs",
            get(handlers::designs::list_designs),
        )
        .route(
            "/stores/:store_id/designs/:id",
            get(handlers::designs::get_design),
        )
        .with_permission(perm::CATALOG_READ);

    let catalog_write = Router::new()
        .route(
            "/stores/:store_id/categories",
            post(handlers::categories::create_category),
        )
        .route(
            "/stores/:store_id/categories/:id",
            axum::routing::put(handlers::categories::update_category)
                .delete(handlers::categories::delete_category),
        )
        .route(
            "/stores/:store_id/products",
            post(handlers::products::create_product),
        )
        .route(
            "/stores/:store_id/products/:id",
            axum::routing::put(handlers::products::update_product)
                .delete(handlers::products::archive_product),
        )
        .route(
            "/stores/:store_id/products/:id/images",
            post(handlers::products::attach_product_image),
        )
        .route(
            "/stores/:store_id/products/:id/images/:image_id",
            axum::routing::delete(handlers::products::detach_product_image),
        )
        .route(
            "/stores/:store_id/designs",
            post(handlers::designs::create_design),
        )
        .route(
            "/stores/:store_id/designs/:id",
            axum::routing::put(handlers::designs::update_design)
                .delete(handlers::designs::delete_design),
        )
        .route(
            "/stores/:store_id/designs/:id/publish",
            post(handlers::designs::publish_design),
        )
        .with_permission(perm::CATALOG_WRITE);

    let inventory_read = Router::new()
        .route(
            "/stores/:store_id/inventory",
            get(handlers::inventory::list_inventory),
        )
        .route(
            "/stores/:store_id/inventory/low-stock",
            get(handlers::inventory::list_low_stock),
        )
        .route(
            "/stores/:store_id/inventory/:product_id",
            get(handlers::inventory::get_inventory_level),
        )
        .with_permission(perm::INVENTORY_READ);

    let inventory_write = Router::new()
        .route(
            "/stores/:store_id/inventory/:product_id",
            axum::routing::put(handlers::inventory::set_inventory_level),
        )
        .route(
            "/stores/:store_id/inventory/:product_id/adjust",
            post(handlers::inventory::adjust_inventory),
        )
        .with_permission(perm::INVENTORY_WRITE);

    let orders_read = Router::new()
        .route("/stores/:store_id/orders", get(handlers::orders::list_orders))
        .route(
            "/stores/:store_id/orders/:id",
            get(handlers::orders::get_order),
        )
        .with_permission(perm::ORDERS_READ);

    let orders_write = Router::new()
        .route(
            "/stores/:store_id/orders",
            post(handlers::orders::create_order),
        )
        .route(
            "/stores/:store_id/orders/:id/status",
            axum::routing::put(handlers::orders::update_order_status),
        )
        .route(
            "/stores/:store_id/orders/:id/pay",
            post(handlers::orders::pay_order),
        )
        .route(
            "/stores/:store_id/orders/:id/cancel",
            post(handlers::orders::cancel_order),
        )
        .route(
            "/stores/:store_id/orders/:id/archive",
            post(handlers::orders::archive_order),
        )
        .with_permission(perm::ORDERS_WRITE);

    let shipments_read = Router::new()
        .route(
            "/stores/:store_id/shipments",
            get(handlers::shipments::list_shipments),
        )
        .route(
            "/stores/:store_id/shipments/:id",
            get(handlers::shipments::get_shipment),
        )
        .route(
            "/stores/:store_id/shipments/track/:tracking_number",
            get(handlers::shipments::track_by_number),
        )
        .with_permission(perm::SHIPMENTS_READ);

    let shipments_write = Router::new()
        .route(
            "/stores/:store_id/shipments",
            post(handlers::shipments::create_shipment),
        )
        .route(
            "/stores/:store_id/shipments/status",
            post(handlers::shipments::bulk_update_shipment_status),
        )
        .route(
            "/stores/:store_id/shipments/:id/status",
            post(handlers::shipments::update_shipment_status),
        )
        .route(
            "/stores/:store_id/shipments/:id/quote",
            post(handlers::shipments::quote_shipment),
        )
        .route(
            "/stores/:store_id/shipments/:id/guide",
            post(handlers::shipments::create_shipment_guide),
        )
        .with_permission(perm::SHIPMENTS_WRITE);

    let discounts_read = Router::new()
        .route(
            "/stores/:store_id/coupons",
            get(handlers::coupons::list_coupons),
        )
        .route(
            "/stores/:store_id/coupons/:id",
            get(handlers::coupons::get_coupon),
        )
        .route("/stores/:store_id/offers", get(handlers::offers::list_offers))
        .route(
            "/stores/:store_id/offers/:id",
            get(handlers::offers::get_offer),
        )
        .with_permission(perm::DISCOUNTS_READ);

    let discounts_write = Router::new()
        .route(
            "/stores/:store_id/coupons",
            post(handlers::coupons::create_coupon),
        )
        .route(
            "/stores/:store_id/coupons/validate",
            post(handlers::coupons::validate_coupon),
        )
        .route(
            "/stores/:store_id/coupons/:id",
            axum::routing::put(handlers::coupons::update_coupon)
                .delete(handlers::coupons::delete_coupon),
        )
        .route(
            "/stores/:store_id/offers",
            post(handlers::offers::create_offer),
        )
        .route(
            "/stores/:store_id/offers/:id",
            axum::routing::put(handlers::offers::update_offer)
                .delete(handlers::offers::delete_offer),
        )
        .with_permission(perm::DISCOUNTS_WRITE);

    let quotations_read = Router::new()
        .route(
            "/stores/:store_id/quotations",
            get(handlers::quotations::list_quotations),
        )
        .route(
            "/stores/:store_id/quotations/:id",
            get(handlers::quotations::get_quotation),
        )
        .with_permission(perm::QUOTATIONS_READ);

    let quotations_write = Router::new()
        .route(
            "/stores/:store_id/quotations",
            post(handlers::quotations::create_quotation),
        )
        .route(
            "/stores/:store_id/quotations/:id/send",
            post(handlers::quotations::send_quotation),
        )
        .route(
            "/stores/:store_id/quotations/:id/accept",
            post(handlers::quotations::accept_quotation),
        )
        .route(
            "/stores/:store_id/quotations/:id/decline",
            post(handlers::quotations::decline_quotation),
        )
        .route(
            "/stores/:store_id/quotations/:id/convert",
            post(handlers::quotations::convert_quotation),
        )
        .with_permission(perm::QUOTATIONS_WRITE);

    let invoices_read = Router::new()
        .route(
            "/stores/:store_id/invoices",
            get(handlers::invoices::list_invoices),
        )
        .route(
            "/stores/:store_id/invoices/:id",
            get(handlers::invoices::get_invoice),
        )
        .route(
            "/stores/:store_id/orders/:id/invoice",
            get(handlers::invoices::get_order_invoice),
        )
        .with_permission(perm::INVOICES_READ);

    let customers_read = Router::new()
        .route(
            "/stores/:store_id/customers",
            get(handlers::customers::list_customers),
        )
        .route(
            "/stores/:store_id/customers/:id",
            get(handlers::customers::get_customer),
        )
        .with_permission(perm::CUSTOMERS_READ);

    let customers_write = Router::new()
        .route(
            "/stores/:store_id/customers",
            post(handlers::customers::create_customer),
        )
        .route(
            "/stores/:store_id/customers/:id",
            axum::routing::put(handlers::customers::update_customer)
                .delete(handlers::customers::delete_customer),
        )
        .with_permission(perm::CUSTOMERS_WRITE);

    // Unauthenticated surfaces: the storefront, provider webhooks and the
    // cron-token maintenance endpoint.
    let storefront = Router::new()
        .route(
            "/storefront/:store_slug/catalog",
            get(handlers::storefront::catalog),
        )
        .route(
            "/storefront/:store_slug/products/:product_slug",
            get(handlers::storefront::product_detail),
        )
        .route(
            "/storefront/:store_slug/offers",
            get(handlers::storefront::active_offers),
        )
        .route(
            "/storefront/:store_slug/design",
            get(handlers::storefront::published_design),
        )
        .route(
            "/storefront/:store_slug/coupons/validate",
            post(handlers::storefront::validate_coupon),
        );

    let maintenance = Router::new().route(
        "/maintenance/discounts/sweep",
        post(handlers::maintenance::discount_sweep),
    );

    let payment_webhook = Router::new().route(
        "/payments/webhook",
        post(handlers::payment_webhooks::payment_webhook),
    );

    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .merge(stores_read)
        .merge(stores_write)
        .merge(catalog_read)
        .merge(catalog_write)
        .merge(inventory_read)
        .merge(inventory_write)
        .merge(orders_read)
        .merge(orders_write)
        .merge(shipments_read)
        .merge(shipments_write)
        .merge(discounts_read)
        .merge(discounts_write)
        .merge(quotations_read)
        .merge(quotations_write)
        .merge(invoices_read)
        .merge(customers_read)
        .merge(customers_write)
        .merge(storefront)
        .merge(maintenance)
        .merge(payment_webhook)
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let status_data = json!({
        "status": "ok",
        "service": "shopcore-api",
        "version": env!("CARGO_PKG_VERSION"),
        "git": option_env!("GIT_HASH").unwrap_or("unknown"),
        "build_time": option_env!("BUILD_TIME").unwrap_or("unknown"),
        "timestamp": Utc::now().to_rfc3339(),
    });
    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let redis_status = match state.redis.get_async_connection().await {
        Ok(mut conn) => match redis::cmd("PING").query_async::<_, String>(&mut conn).await {
            Ok(_) => "healthy",
            Err(_) => "unhealthy",
        },
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": if db_status == "healthy" && redis_status == "healthy" { "healthy" } else { "degraded" },
        "checks": {
            "database": db_status,
            "cache": redis_status,
        },
        "timestamp": Utc::now().to_rfc3339(),
    });
    Ok(Json(ApiResponse::success(health_data)))
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response = request_id::scope_request_id(
            request_id::RequestId::new("meta-123"),
            async { ApiResponse::success("ok") },
        )
        .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[tokio::test]
    async fn error_response_includes_request_metadata() {
        let response = request_id::scope_request_id(
            request_id::RequestId::new("meta-err"),
            async { ApiResponse::<()>::error("oops".into()) },
        )
        .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-err"));
        assert!(!meta.timestamp.is_empty());
    }
}
