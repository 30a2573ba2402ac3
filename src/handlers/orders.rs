use crate::{
    auth::AuthUser,
    entities::order::{self, OrderStatus},
    entities::order_item,
    errors::ServiceError,
    handlers::common::{ensure_store_access, limit_or_default, page_or_default, parse_status, total_pages},
    services::orders::{CreateOrderInput, OrderItemInput},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Filter by status (pending, processing, shipped, delivered, cancelled)
    pub status: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderSummary {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub status: String,
    pub payment_status: String,
    pub payment_reference: Option<String>,
    pub coupon_id: Option<Uuid>,
    pub subtotal: Decimal,
    pub discount_total: Decimal,
    pub shipping_total: Decimal,
    pub total: Decimal,
    pub currency: String,
    pub shipping_address: String,
    pub notes: Option<String>,
    pub placed_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<order::Model> for OrderSummary {
    fn from(model: order::Model) -> Self {
        Self {
            id: model.id,
            order_number: model.order_number,
            customer_id: model.customer_id,
            status: model.status.to_string(),
            payment_status: model.payment_status.to_string(),
            payment_reference: model.payment_reference,
            coupon_id: model.coupon_id,
            subtotal: model.subtotal,
            discount_total: model.discount_total,
            shipping_total: model.shipping_total,
            total: model.total,
            currency: model.currency,
            shipping_address: model.shipping_address,
            notes: model.notes,
            placed_at: model.placed_at,
            paid_at: model.paid_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemSummary {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total: Decimal,
}

impl From<order_item::Model> for OrderItemSummary {
    fn from(model: order_item::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            product_name: model.product_name,
            quantity: model.quantity,
            unit_price: model.unit_price,
            total: model.total,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: OrderSummary,
    pub items: Vec<OrderItemSummary>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    pub customer_id: Uuid,
    #[validate(length(min = 1, message = "order needs at least one item"))]
    pub items: Vec<CreateOrderItemRequest>,
    pub coupon_code: Option<String>,
    pub shipping_address: Option<String>,
    #[serde(default)]
    pub shipping_total: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderStatusRequest {
    #[validate(length(min = 1))]
    pub status: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PayOrderRequest {
    /// Reference returned by the payment provider
    #[validate(length(min = 1))]
    pub payment_reference: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CancelOrderRequest {
    pub reason: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/{store_id}/orders",
    params(("store_id" = Uuid, Path, description = "Store ID"), OrderListQuery),
    responses(
        (status = 200, description = "Orders listed", body = ApiResponse<PaginatedResponse<OrderSummary>>)
    ),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(store_id): Path<Uuid>,
    Query(query): Query<OrderListQuery>,
) -> ApiResult<PaginatedResponse<OrderSummary>> {
    ensure_store_access(&user, store_id)?;
    let page = page_or_default(query.page);
    let limit = limit_or_default(query.limit);
    let status = parse_status::<OrderStatus>(query.status)?;

    let (records, total) = state
        .order_service()
        .list_orders(store_id, page, limit, status)
        .await?;
    let items: Vec<OrderSummary> = records.into_iter().map(OrderSummary::from).collect();

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total,
        page,
        limit,
        total_pages: total_pages(total, limit),
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/{store_id}/orders/{id}",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order fetched with items", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<OrderWithItems> {
    ensure_store_access(&user, store_id)?;
    let order = state
        .order_service()
        .get_order(store_id, id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("order {} not found", id)))?;
    let items = state.order_service().get_order_items(store_id, id).await?;

    Ok(Json(ApiResponse::success(OrderWithItems {
        order: OrderSummary::from(order),
        items: items.into_iter().map(OrderItemSummary::from).collect(),
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/{store_id}/orders",
    params(("store_id" = Uuid, Path, description = "Store ID")),
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order created", body = ApiResponse<OrderWithItems>),
        (status = 400, description = "Invalid request or coupon does not apply", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(store_id): Path<Uuid>,
    Json(payload): Json<CreateOrderRequest>,
) -> ApiResult<OrderWithItems> {
    ensure_store_access(&user, store_id)?;
    payload.validate()?;

    let input = CreateOrderInput {
        customer_id: payload.customer_id,
        items: payload
            .items
            .iter()
            .map(|item| OrderItemInput {
                product_id: item.product_id,
                quantity: item.quantity,
            })
            .collect(),
        coupon_code: payload.coupon_code,
        shipping_address: payload.shipping_address,
        shipping_total: payload.shipping_total.unwrap_or(Decimal::ZERO),
        notes: payload.notes,
    };

    let (order, items) = state.order_service().create_order(store_id, input).await?;
    Ok(Json(ApiResponse::success(OrderWithItems {
        order: OrderSummary::from(order),
        items: items.into_iter().map(OrderItemSummary::from).collect(),
    })))
}

#[utoipa::path(
    put,
    path = "/api/v1/stores/{store_id}/orders/{id}/status",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<OrderSummary>),
        (status = 400, description = "Invalid status", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> ApiResult<OrderSummary> {
    ensure_store_access(&user, store_id)?;
    payload.validate()?;
    let status: OrderStatus = payload
        .status
        .parse()
        .map_err(ServiceError::ValidationError)?;

    let updated = state
        .order_service()
        .update_status(store_id, id, status)
        .await?;
    Ok(Json(ApiResponse::success(OrderSummary::from(updated))))
}

/// Records a provider-confirmed payment. Stock decrements and the invoice
/// are issued in the same transaction; a repeat call is a 409.
#[utoipa::path(
    post,
    path = "/api/v1/stores/{store_id}/orders/{id}/pay",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Order ID")),
    request_body = PayOrderRequest,
    responses(
        (status = 200, description = "Order paid and invoiced", body = ApiResponse<OrderSummary>),
        (status = 409, description = "Order already paid", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn pay_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<PayOrderRequest>,
) -> ApiResult<OrderSummary> {
    ensure_store_access(&user, store_id)?;
    payload.validate()?;

    let updated = state
        .order_service()
        .mark_paid(store_id, id, payload.payment_reference)
        .await?;
    Ok(Json(ApiResponse::success(OrderSummary::from(updated))))
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/{store_id}/orders/{id}/cancel",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Order ID")),
    request_body = CancelOrderRequest,
    responses(
        (status = 200, description = "Order cancelled", body = ApiResponse<OrderSummary>),
        (status = 400, description = "Order can no longer be cancelled", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<CancelOrderRequest>,
) -> ApiResult<OrderSummary> {
    ensure_store_access(&user, store_id)?;
    let updated = state
        .order_service()
        .cancel_order(store_id, id, payload.reason)
        .await?;
    Ok(Json(ApiResponse::success(OrderSummary::from(updated))))
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/{store_id}/orders/{id}/archive",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order archived", body = ApiResponse<OrderSummary>)
    ),
    tag = "orders"
)]
pub async fn archive_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<OrderSummary> {
    ensure_store_access(&user, store_id)?;
    let updated = state.order_service().archive_order(store_id, id).await?;
    Ok(Json(ApiResponse::success(OrderSummary::from(updated))))
}
