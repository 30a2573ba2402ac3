use crate::{
    auth::AuthUser,
    entities::offer::{self, DiscountKind},
    errors::ServiceError,
    handlers::common::{ensure_store_access, limit_or_default, page_or_default, total_pages},
    services::offers::{CreateOfferInput, UpdateOfferInput},
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
pub struct OfferListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OfferSummary {
    pub id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub kind: String,
    pub value: Decimal,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<offer::Model> for OfferSummary {
    fn from(model: offer::Model) -> Self {
        Self {
            id: model.id,
            category_id: model.category_id,
            name: model.name,
            description: model.description,
            kind: model.kind.to_string(),
            value: model.value,
            starts_at: model.starts_at,
            ends_at: model.ends_at,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateOfferRequest {
    #[validate(length(min = 1))]
    pub name: String,
    pub description: Option<String>,
    /// "percentage" or "fixed"
    #[validate(length(min = 1))]
    pub kind: String,
    pub value: Decimal,
    pub category_id: Option<Uuid>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOfferRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub value: Option<Decimal>,
    pub category_id: Option<Uuid>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
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
    path = "/api/v1/stores/{store_id}/offers",
    params(("store_id" = Uuid, Path, description = "Store ID"), OfferListQuery),
    responses((status = 200, description = "Offers listed", body = ApiResponse<PaginatedResponse<OfferSummary>>)),
    tag = "discounts"
)]
pub async fn list_offers(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(store_id): Path<Uuid>,
    Query(query): Query<OfferListQuery>,
) -> ApiResult<PaginatedResponse<OfferSummary>> {
    ensure_store_access(&user, store_id)?;
    let page = page_or_default(query.page);
    let limit = limit_or_default(query.limit);
    let (records, total) = state
        .offer_service()
        .list_offers(store_id, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(PaginatedResponse {
        items: records.into_iter().map(OfferSummary::from).collect(),
        total,
        page,
        limit,
        total_pages: total_pages(total, limit),
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/{store_id}/offers",
    params(("store_id" = Uuid, Path, description = "Store ID")),
    request_body = CreateOfferRequest,
    responses((status = 200, description = "Offer created", body = ApiResponse<OfferSummary>)),
    tag = "discounts"
)]
pub async fn create_offer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(store_id): Path<Uuid>,
    Json(payload): Json<CreateOfferRequest>,
) -> ApiResult<OfferSummary> {
    ensure_store_access(&user, store_id)?;
    payload.validate()?;
    let kind = parse_kind(&payload.kind)?;

    let created = state
        .offer_service()
        .create_offer(
            store_id,
            CreateOfferInput {
                name: payload.name,
                description: payload.description,
                kind,
                value: payload.value,
                category_id: payload.category_id,
                starts_at: payload.starts_at,
                ends_at: payload.ends_at,
            },
        )
        .await?;
    state
        .cache
        .invalidate_store_area_best_effort(store_id, "discounts")
        .await;
    Ok(Json(ApiResponse::success(OfferSummary::from(created))))
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/{store_id}/offers/{id}",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Offer ID")),
    responses(
        (status = 200, description = "Offer fetched", body = ApiResponse<OfferSummary>),
        (status = 404, description = "Offer not found", body = crate::errors::ErrorResponse)
    ),
    tag = "discounts"
)]
pub async fn get_offer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<OfferSummary> {
    ensure_store_access(&user, store_id)?;
    match state.offer_service().get_offer(store_id, id).await? {
        Some(model) => Ok(Json(ApiResponse::success(OfferSummary::from(model)))),
        None => Err(ServiceError::NotFound(format!("offer {} not found", id))),
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/stores/{store_id}/offers/{id}",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Offer ID")),
    request_body = UpdateOfferRequest,
    responses((status = 200, description = "Offer updated", body = ApiResponse<OfferSummary>)),
    tag = "discounts"
)]
pub async fn update_offer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateOfferRequest>,
) -> ApiResult<OfferSummary> {
    ensure_store_access(&user, store_id)?;
    let updated = state
        .offer_service()
        .update_offer(
            store_id,
            id,
            UpdateOfferInput {
                name: payload.name,
                description: payload.description.map(Some),
                value: payload.value,
                category_id: payload.category_id.map(Some),
                starts_at: payload.starts_at,
                ends_at: payload.ends_at,
            },
        )
        .await?;
    state
        .cache
        .invalidate_store_area_best_effort(store_id, "discounts")
        .await;
    Ok(Json(ApiResponse::success(OfferSummary::from(updated))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/stores/{store_id}/offers/{id}",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Offer ID")),
    responses((status = 200, description = "Offer deleted", body = ApiResponse<serde_json::Value>)),
    tag = "discounts"
)]
pub async fn delete_offer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<serde_json::Value> {
    ensure_store_access(&user, store_id)?;
    state.offer_service().delete_offer(store_id, id).await?;
    state
        .cache
        .invalidate_store_area_best_effort(store_id, "discounts")
        .await;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted": id }),
    )))
}
