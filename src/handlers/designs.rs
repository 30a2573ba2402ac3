use crate::{
    auth::AuthUser,
    entities::design,
    errors::ServiceError,
    handlers::common::ensure_store_access,
    services::designs::{CreateDesignInput, UpdateDesignInput},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, ToSchema)]
pub struct DesignSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub preview_url: Option<String>,
    pub payload: serde_json::Value,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<design::Model> for DesignSummary {
    fn from(model: design::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            preview_url: model.preview_url,
            payload: model.payload,
            is_published: model.is_published,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateDesignRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1, max = 64))]
    pub slug: String,
    pub preview_url: Option<String>,
    pub payload: serde_json::Value,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateDesignRequest {
    pub name: Option<String>,
    pub preview_url: Option<String>,
    pub payload: Option<serde_json::Value>,
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/{store_id}/designs",
    params(("store_id" = Uuid, Path, description = "Store ID")),
    responses((status = 200, description = "Designs listed", body = ApiResponse<Vec<DesignSummary>>)),
    tag = "designs"
)]
pub async fn list_designs(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(store_id): Path<Uuid>,
) -> ApiResult<Vec<DesignSummary>> {
    ensure_store_access(&user, store_id)?;
    let records = state.design_service().list_designs(store_id).await?;
    Ok(Json(ApiResponse::success(
        records.into_iter().map(DesignSummary::from).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/{store_id}/designs",
    params(("store_id" = Uuid, Path, description = "Store ID")),
    request_body = CreateDesignRequest,
    responses((status = 200, description = "Design created", body = ApiResponse<DesignSummary>)),
    tag = "designs"
)]
pub async fn create_design(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(store_id): Path<Uuid>,
    Json(payload): Json<CreateDesignRequest>,
) -> ApiResult<DesignSummary> {
    ensure_store_access(&user, store_id)?;
    payload.validate()?;
    let created = state
        .design_service()
        .create_design(
            store_id,
            CreateDesignInput {
                name: payload.name,
                slug: payload.slug,
                preview_url: payload.preview_url,
                payload: payload.payload,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(DesignSummary::from(created))))
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/{store_id}/designs/{id}",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Design ID")),
    responses(
        (status = 200, description = "Design fetched", body = ApiResponse<DesignSummary>),
        (status = 404, description = "Design not found", body = crate::errors::ErrorResponse)
    ),
    tag = "designs"
)]
pub async fn get_design(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<DesignSummary> {
    ensure_store_access(&user, store_id)?;
    match state.design_service().get_design(store_id, id).await? {
        Some(model) => Ok(Json(ApiResponse::success(DesignSummary::from(model)))),
        None => Err(ServiceError::NotFound(format!("design {} not found", id))),
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/stores/{store_id}/designs/{id}",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Design ID")),
    request_body = UpdateDesignRequest,
    responses((status = 200, description = "Design updated", body = ApiResponse<DesignSummary>)),
    tag = "designs"
)]
pub async fn update_design(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateDesignRequest>,
) -> ApiResult<DesignSummary> {
    ensure_store_access(&user, store_id)?;
    let updated = state
        .design_service()
        .update_design(
            store_id,
            id,
            UpdateDesignInput {
                name: payload.name,
                preview_url: payload.preview_url.map(Some),
                payload: payload.payload,
            },
        )
        .await?;
    state
        .cache
        .invalidate_store_area_best_effort(store_id, "storefront")
        .await;
    Ok(Json(ApiResponse::success(DesignSummary::from(updated))))
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/{store_id}/designs/{id}/publish",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Design ID")),
    responses((status = 200, description = "Design published", body = ApiResponse<DesignSummary>)),
    tag = "designs"
)]
pub async fn publish_design(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<DesignSummary> {
    ensure_store_access(&user, store_id)?;
    let published = state.design_service().publish_design(store_id, id).await?;
    state
        .cache
        .invalidate_store_area_best_effort(store_id, "storefront")
        .await;
    Ok(Json(ApiResponse::success(DesignSummary::from(published))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/stores/{store_id}/designs/{id}",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Design ID")),
    responses((status = 200, description = "Design deleted", body = ApiResponse<serde_json::Value>)),
    tag = "designs"
)]
pub async fn delete_design(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<serde_json::Value> {
    ensure_store_access(&user, store_id)?;
    state.design_service().delete_design(store_id, id).await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted": id }),
    )))
}
