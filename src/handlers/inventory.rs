use crate::{
    auth::AuthUser,
    entities::inventory_level,
    errors::ServiceError,
    handlers::common::{ensure_store_access, limit_or_default, page_or_default, total_pages},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InventoryListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryLevelSummary {
    pub product_id: Uuid,
    pub quantity: i32,
    pub low_stock_threshold: i32,
    pub is_low_stock: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<inventory_level::Model> for InventoryLevelSummary {
    fn from(model: inventory_level::Model) -> Self {
        let is_low_stock = model.is_low_stock();
        Self {
            product_id: model.product_id,
            quantity: model.quantity,
            low_stock_threshold: model.low_stock_threshold,
            is_low_stock,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SetInventoryLevelRequest {
    #[validate(range(min = 0))]
    pub quantity: i32,
    #[validate(range(min = 0))]
    pub low_stock_threshold: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdjustInventoryRequest {
    /// Signed delta applied to on-hand stock
    pub delta: i32,
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/{store_id}/inventory",
    params(("store_id" = Uuid, Path, description = "Store ID"), InventoryListQuery),
    responses((status = 200, description = "Inventory listed", body = ApiResponse<PaginatedResponse<InventoryLevelSummary>>)),
    tag = "inventory"
)]
pub async fn list_inventory(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(store_id): Path<Uuid>,
    Query(query): Query<InventoryListQuery>,
) -> ApiResult<PaginatedResponse<InventoryLevelSummary>> {
    ensure_store_access(&user, store_id)?;
    let page = page_or_default(query.page);
    let limit = limit_or_default(query.limit);
    let (records, total) = state
        .inventory_service()
        .list_levels(store_id, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(PaginatedResponse {
        items: records
            .into_iter()
            .map(InventoryLevelSummary::from)
            .collect(),
        total,
        page,
        limit,
        total_pages: total_pages(total, limit),
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/{store_id}/inventory/low-stock",
    params(("store_id" = Uuid, Path, description = "Store ID")),
    responses((status = 200, description = "Low-stock products", body = ApiResponse<Vec<InventoryLevelSummary>>)),
    tag = "inventory"
)]
pub async fn list_low_stock(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(store_id): Path<Uuid>,
) -> ApiResult<Vec<InventoryLevelSummary>> {
    ensure_store_access(&user, store_id)?;
    let records = state.inventory_service().list_low_stock(store_id).await?;
    Ok(Json(ApiResponse::success(
        records
            .into_iter()
            .map(InventoryLevelSummary::from)
            .collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/{store_id}/inventory/{product_id}",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("product_id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Level fetched", body = ApiResponse<InventoryLevelSummary>),
        (status = 404, description = "No level for product", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn get_inventory_level(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, product_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<InventoryLevelSummary> {
    ensure_store_access(&user, store_id)?;
    match state
        .inventory_service()
        .get_level(store_id, product_id)
        .await?
    {
        Some(model) => Ok(Json(ApiResponse::success(InventoryLevelSummary::from(
            model,
        )))),
        None => Err(ServiceError::NotFound(format!(
            "no inventory level for product {}",
            product_id
        ))),
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/stores/{store_id}/inventory/{product_id}",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("product_id" = Uuid, Path, description = "Product ID")),
    request_body = SetInventoryLevelRequest,
    responses((status = 200, description = "Level set", body = ApiResponse<InventoryLevelSummary>)),
    tag = "inventory"
)]
pub async fn set_inventory_level(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, product_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<SetInventoryLevelRequest>,
) -> ApiResult<InventoryLevelSummary> {
    ensure_store_access(&user, store_id)?;
    payload.validate()?;
    let level = state
        .inventory_service()
        .set_level(
            store_id,
            product_id,
            payload.quantity,
            payload.low_stock_threshold,
        )
        .await?;
    Ok(Json(ApiResponse::success(InventoryLevelSummary::from(
        level,
    ))))
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/{store_id}/inventory/{product_id}/adjust",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("product_id" = Uuid, Path, description = "Product ID")),
    request_body = AdjustInventoryRequest,
    responses(
        (status = 200, description = "Stock adjusted", body = ApiResponse<InventoryLevelSummary>),
        (status = 422, description = "Adjustment would go negative", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn adjust_inventory(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, product_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<AdjustInventoryRequest>,
) -> ApiResult<InventoryLevelSummary> {
    ensure_store_access(&user, store_id)?;
    let level = state
        .inventory_service()
        .adjust(store_id, product_id, payload.delta)
        .await?;
    Ok(Json(ApiResponse::success(InventoryLevelSummary::from(
        level,
    ))))
}
