use crate::{
    auth::AuthUser,
    entities::coupon::{self, DiscountKind},
    errors::ServiceError,
    handlers::common::{ensure_store_access, limit_or_default, page_or_default, total_pages},
    services::coupons::{CreateCouponInput, UpdateCouponInput},
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
pub struct CouponListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CouponSummary {
    pub id: Uuid,
    pub code: String,
    pub kind: String,
    pub value: Decimal,
    pub min_order_value: Option<Decimal>,
    pub max_uses: Option<i32>,
    pub used_count: i32,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<coupon::Model> for CouponSummary {
    fn from(model: coupon::Model) -> Self {
        Self {
            id: model.id,
            code: model.code,
            kind: model.kind.to_string(),
            value: model.value,
            min_order_value: model.min_order_value,
            max_uses: model.max_uses,
            used_count: model.used_count,
            starts_at: model.starts_at,
            ends_at: model.ends_at,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCouponRequest {
    #[validate(length(min = 2, max = 32))]
    pub code: String,
    /// "percentage" or "fixed"
    #[validate(length(min = 1))]
    pub kind: String,
    pub value: Decimal,
    pub min_order_value: Option<Decimal>,
    pub max_uses: Option<i32>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCouponRequest {
    pub value: Option<Decimal>,
    pub min_order_value: Option<Decimal>,
    pub max_uses: Option<i32>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ValidateCouponRequest {
    #[validate(length(min = 1))]
    pub code: String,
    pub order_subtotal: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CouponValidationResponse {
    pub coupon_id: Uuid,
    pub code: String,
    pub discount_amount: Decimal,
}

fn parse_kind(raw: &str) -> Result<DiscountKind, ServiceError> {
    match raw.to_ascii_lowercase().as_str() {
        "percentage" => Ok(DiscountKind::Percentage),
        "fixed" => Ok(DiscountKind::Fixed),
        other => Err(ServiceError::ValidationError(format!(
            "unknown discount kind '{}'",
            other
        ))),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/{store_id}/coupons",
    params(("store_id" = Uuid, Path, description = "Store ID"), CouponListQuery),
    responses((status = 200, description = "Coupons listed", body = ApiResponse<PaginatedResponse<CouponSummary>>)),
    tag = "discounts"
)]
pub async fn list_coupons(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(store_id): Path<Uuid>,
    Query(query): Query<CouponListQuery>,
) -> ApiResult<PaginatedResponse<CouponSummary>> {
    ensure_store_access(&user, store_id)?;
    let page = page_or_default(query.page);
    let limit = limit_or_default(query.limit);
    let (records, total) = state
        .coupon_service()
        .list_coupons(store_id, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(PaginatedResponse {
        items: records.into_iter().map(CouponSummary::from).collect(),
        total,
        page,
        limit,
        total_pages: total_pages(total, limit),
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/{store_id}/coupons",
    params(("store_id" = Uuid, Path, description = "Store ID")),
    request_body = CreateCouponRequest,
    responses(
        (status = 200, description = "Coupon created", body = ApiResponse<CouponSummary>),
        (status = 409, description = "Code already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "discounts"
)]
pub async fn create_coupon(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(store_id): Path<Uuid>,
    Json(payload): Json<CreateCouponRequest>,
) -> ApiResult<CouponSummary> {
    ensure_store_access(&user, store_id)?;
    payload.validate()?;
    let kind = parse_kind(&payload.kind)?;

    let created = state
        .coupon_service()
        .create_coupon(
            store_id,
            CreateCouponInput {
                code: payload.code,
                kind,
                value: payload.value,
                min_order_value: payload.min_order_value,
                max_uses: payload.max_uses,
                starts_at: payload.starts_at,
                ends_at: payload.ends_at,
            },
        )
        .await?;
    state
        .cache
        .invalidate_store_area_best_effort(store_id, "discounts")
        .await;
    Ok(Json(ApiResponse::success(CouponSummary::from(created))))
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/{store_id}/coupons/{id}",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Coupon ID")),
    responses(
        (status = 200, description = "Coupon fetched", body = ApiResponse<CouponSummary>),
        (status = 404, description = "Coupon not found", body = crate::errors::ErrorResponse)
    ),
    tag = "discounts"
)]
pub async fn get_coupon(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<CouponSummary> {
    ensure_store_access(&user, store_id)?;
    match state.coupon_service().get_coupon(store_id, id).await? {
        Some(model) => Ok(Json(ApiResponse::success(CouponSummary::from(model)))),
        None => Err(ServiceError::NotFound(format!("coupon {} not found", id))),
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/stores/{store_id}/coupons/{id}",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Coupon ID")),
    request_body = UpdateCouponRequest,
    responses((status = 200, description = "Coupon updated", body = ApiResponse<CouponSummary>)),
    tag = "discounts"
)]
pub async fn update_coupon(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateCouponRequest>,
) -> ApiResult<CouponSummary> {
    ensure_store_access(&user, store_id)?;
    let updated = state
        .coupon_service()
        .update_coupon(
            store_id,
            id,
            UpdateCouponInput {
                value: payload.value,
                min_order_value: payload.min_order_value.map(Some),
                max_uses: payload.max_uses.map(Some),
                starts_at: payload.starts_at,
                ends_at: payload.ends_at,
            },
        )
        .await?;
    state
        .cache
        .invalidate_store_area_best_effort(store_id, "discounts")
        .await;
    Ok(Json(ApiResponse::success(CouponSummary::from(updated))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/stores/{store_id}/coupons/{id}",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Coupon ID")),
    responses((status = 200, description = "Coupon deleted", body = ApiResponse<serde_json::Value>)),
    tag = "discounts"
)]
pub async fn delete_coupon(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<serde_json::Value> {
    ensure_store_access(&user, store_id)?;
    state.coupon_service().delete_coupon(store_id, id).await?;
    state
        .cache
        .invalidate_store_area_best_effort(store_id, "discounts")
        .await;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted": id }),
    )))
}

/// Admin-side dry run of a coupon against an order subtotal.
#[utoipa::path(
    post,
    path = "/api/v1/stores/{store_id}/coupons/validate",
    params(("store_id" = Uuid, Path, description = "Store ID")),
    request_body = ValidateCouponRequest,
    responses(
        (status = 200, description = "Coupon applies", body = ApiResponse<CouponValidationResponse>),
        (status = 400, description = "Coupon does not apply", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown code", body = crate::errors::ErrorResponse)
    ),
    tag = "discounts"
)]
pub async fn validate_coupon(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(store_id): Path<Uuid>,
    Json(payload): Json<ValidateCouponRequest>,
) -> ApiResult<CouponValidationResponse> {
    ensure_store_access(&user, store_id)?;
    payload.validate()?;
    let applied = state
        .coupon_service()
        .validate_code(store_id, &payload.code, payload.order_subtotal)
        .await?;
    Ok(Json(ApiResponse::success(CouponValidationResponse {
        coupon_id: applied.coupon_id,
        code: applied.code,
        discount_amount: applied.discount_amount,
    })))
}
