use crate::{
    auth::AuthUser,
    entities::shipment::{self, ShipmentStatus},
    errors::ServiceError,
    handlers::common::{ensure_store_access, limit_or_default, page_or_default, parse_status, total_pages},
    services::shipments::CreateShipmentInput,
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
pub struct ShipmentListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Filter by status (preparing, in_transit, out_for_delivery, delivered, exception, cancelled)
    pub status: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShipmentSummary {
    pub id: Uuid,
    pub order_id: Uuid,
    pub status: String,
    pub carrier: Option<String>,
    pub service_level: Option<String>,
    pub recipient_name: String,
    pub shipping_address: String,
    pub rate_ref: Option<String>,
    pub rate_amount: Option<Decimal>,
    pub quoted_at: Option<DateTime<Utc>>,
    pub guide_ref: Option<String>,
    pub tracking_number: Option<String>,
    pub label_url: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<shipment::Model> for ShipmentSummary {
    fn from(model: shipment::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            status: model.status.to_string(),
            carrier: model.carrier,
            service_level: model.service_level,
            recipient_name: model.recipient_name,
            shipping_address: model.shipping_address,
            rate_ref: model.rate_ref,
            rate_amount: model.rate_amount,
            quoted_at: model.quoted_at,
            guide_ref: model.guide_ref,
            tracking_number: model.tracking_number,
            label_url: model.label_url,
            shipped_at: model.shipped_at,
            delivered_at: model.delivered_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateShipmentRequest {
    pub order_id: Uuid,
    #[validate(length(min = 1))]
    pub recipient_name: String,
    /// Defaults to the order's shipping address
    pub shipping_address: Option<String>,
    pub service_level: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateShipmentStatusRequest {
    /// Target status; checked against the transition allow-list
    #[validate(length(min = 1))]
    pub status: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BulkShipmentStatusRequest {
    #[validate(length(min = 1))]
    pub shipment_ids: Vec<Uuid>,
    #[validate(length(min = 1))]
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkShipmentStatusResponse {
    pub updated: u64,
    pub status: String,
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/{store_id}/shipments",
    params(("store_id" = Uuid, Path, description = "Store ID"), ShipmentListQuery),
    responses(
        (status = 200, description = "Shipments listed", body = ApiResponse<PaginatedResponse<ShipmentSummary>>),
        (status = 403, description = "Store not accessible", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn list_shipments(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(store_id): Path<Uuid>,
    Query(query): Query<ShipmentListQuery>,
) -> ApiResult<PaginatedResponse<ShipmentSummary>> {
    ensure_store_access(&user, store_id)?;
    let page = page_or_default(query.page);
    let limit = limit_or_default(query.limit);
    let status = parse_status::<ShipmentStatus>(query.status)?;

    let (records, total) = state
        .shipment_service()
        .list_shipments(store_id, page, limit, status)
        .await?;
    let items: Vec<ShipmentSummary> = records.into_iter().map(ShipmentSummary::from).collect();

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
    path = "/api/v1/stores/{store_id}/shipments/{id}",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Shipment ID")),
    responses(
        (status = 200, description = "Shipment fetched", body = ApiResponse<ShipmentSummary>),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn get_shipment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<ShipmentSummary> {
    ensure_store_access(&user, store_id)?;
    match state.shipment_service().get_shipment(store_id, id).await? {
        Some(model) => Ok(Json(ApiResponse::success(ShipmentSummary::from(model)))),
        None => Err(ServiceError::NotFound(format!("shipment {} not found", id))),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/{store_id}/shipments",
    params(("store_id" = Uuid, Path, description = "Store ID")),
    request_body = CreateShipmentRequest,
    responses(
        (status = 200, description = "Shipment created", body = ApiResponse<ShipmentSummary>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn create_shipment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(store_id): Path<Uuid>,
    Json(payload): Json<CreateShipmentRequest>,
) -> ApiResult<ShipmentSummary> {
    ensure_store_access(&user, store_id)?;
    payload.validate()?;

    let created = state
        .shipment_service()
        .create_shipment(
            store_id,
            CreateShipmentInput {
                order_id: payload.order_id,
                recipient_name: payload.recipient_name,
                shipping_address: payload.shipping_address,
                service_level: payload.service_level,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(ShipmentSummary::from(created))))
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/{store_id}/shipments/{id}/status",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Shipment ID")),
    request_body = UpdateShipmentStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<ShipmentSummary>),
        (status = 400, description = "Illegal transition", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn update_shipment_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateShipmentStatusRequest>,
) -> ApiResult<ShipmentSummary> {
    ensure_store_access(&user, store_id)?;
    payload.validate()?;
    let target: ShipmentStatus = payload
        .status
        .parse()
        .map_err(ServiceError::ValidationError)?;

    let updated = state
        .shipment_service()
        .update_status(store_id, id, target)
        .await?;
    Ok(Json(ApiResponse::success(ShipmentSummary::from(updated))))
}

/// Bulk transition: all-or-nothing, rejected batches name the offending
/// shipments.
#[utoipa::path(
    post,
    path = "/api/v1/stores/{store_id}/shipments/status",
    params(("store_id" = Uuid, Path, description = "Store ID")),
    request_body = BulkShipmentStatusRequest,
    responses(
        (status = 200, description = "Batch applied", body = ApiResponse<BulkShipmentStatusResponse>),
        (status = 400, description = "Batch rejected; offending ids listed", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn bulk_update_shipment_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(store_id): Path<Uuid>,
    Json(payload): Json<BulkShipmentStatusRequest>,
) -> ApiResult<BulkShipmentStatusResponse> {
    ensure_store_access(&user, store_id)?;
    payload.validate()?;
    let target: ShipmentStatus = payload
        .status
        .parse()
        .map_err(ServiceError::ValidationError)?;

    let updated = state
        .shipment_service()
        .bulk_update_status(store_id, &payload.shipment_ids, target)
        .await?;
    Ok(Json(ApiResponse::success(BulkShipmentStatusResponse {
        updated,
        status: target.to_string(),
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/{store_id}/shipments/{id}/quote",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Shipment ID")),
    responses(
        (status = 200, description = "Rate quoted and persisted", body = ApiResponse<ShipmentSummary>),
        (status = 502, description = "Carrier rejected the request", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn quote_shipment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<ShipmentSummary> {
    ensure_store_access(&user, store_id)?;
    let updated = state.shipment_service().quote(store_id, id).await?;
    Ok(Json(ApiResponse::success(ShipmentSummary::from(updated))))
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/{store_id}/shipments/{id}/guide",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Shipment ID")),
    responses(
        (status = 200, description = "Guide created", body = ApiResponse<ShipmentSummary>),
        (status = 400, description = "Preconditions not met (unpaid order or missing quote)", body = crate::errors::ErrorResponse),
        (status = 409, description = "Guide already exists", body = crate::errors::ErrorResponse),
        (status = 502, description = "Carrier rejected the request", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn create_shipment_guide(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<ShipmentSummary> {
    ensure_store_access(&user, store_id)?;
    let updated = state.shipment_service().create_guide(store_id, id).await?;
    Ok(Json(ApiResponse::success(ShipmentSummary::from(updated))))
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/{store_id}/shipments/track/{tracking_number}",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("tracking_number" = String, Path, description = "Carrier tracking number")),
    responses(
        (status = 200, description = "Shipment fetched by tracking number", body = ApiResponse<ShipmentSummary>),
        (status = 404, description = "No shipment with that tracking number", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn track_by_number(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, tracking_number)): Path<(Uuid, String)>,
) -> ApiResult<ShipmentSummary> {
    ensure_store_access(&user, store_id)?;
    match state
        .shipment_service()
        .find_by_tracking_number(store_id, &tracking_number)
        .await?
    {
        Some(model) => Ok(Json(ApiResponse::success(ShipmentSummary::from(model)))),
        None => Err(ServiceError::NotFound(format!(
            "no shipment with tracking number {}",
            tracking_number
        ))),
    }
}
