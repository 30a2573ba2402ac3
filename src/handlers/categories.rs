use crate::{
    auth::AuthUser,
    entities::category,
    errors::ServiceError,
    handlers::common::ensure_store_access,
    services::categories::{CreateCategoryInput, UpdateCategoryInput},
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
pub struct CategorySummary {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub position: i32,
    pub is_visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<category::Model> for CategorySummary {
    fn from(model: category::Model) -> Self {
        Self {
            id: model.id,
            parent_id: model.parent_id,
            name: model.name,
            slug: model.slug,
            description: model.description,
            position: model.position,
            is_visible: model.is_visible,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1, max = 64))]
    pub slug: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub position: i32,
    #[serde(default = "default_true")]
    pub is_visible: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub position: Option<i32>,
    pub is_visible: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/{store_id}/categories",
    params(("store_id" = Uuid, Path, description = "Store ID")),
    responses((status = 200, description = "Categories listed", body = ApiResponse<Vec<CategorySummary>>)),
    tag = "catalog"
)]
pub async fn list_categories(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(store_id): Path<Uuid>,
) -> ApiResult<Vec<CategorySummary>> {
    ensure_store_access(&user, store_id)?;
    let records = state
        .category_service()
        .list_categories(store_id, false)
        .await?;
    Ok(Json(ApiResponse::success(
        records.into_iter().map(CategorySummary::from).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/{store_id}/categories",
    params(("store_id" = Uuid, Path, description = "Store ID")),
    request_body = CreateCategoryRequest,
    responses(
        (status = 200, description = "Category created", body = ApiResponse<CategorySummary>),
        (status = 409, description = "Slug already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "catalog"
)]
pub async fn create_category(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(store_id): Path<Uuid>,
    Json(payload): Json<CreateCategoryRequest>,
) -> ApiResult<CategorySummary> {
    ensure_store_access(&user, store_id)?;
    payload.validate()?;
    let created = state
        .category_service()
        .create_category(
            store_id,
            CreateCategoryInput {
                name: payload.name,
                slug: payload.slug,
                description: payload.description,
                parent_id: payload.parent_id,
                position: payload.position,
                is_visible: payload.is_visible,
            },
        )
        .await?;
    state
        .cache
        .invalidate_store_area_best_effort(store_id, "catalog")
        .await;
    Ok(Json(ApiResponse::success(CategorySummary::from(created))))
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/{store_id}/categories/{id}",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category fetched", body = ApiResponse<CategorySummary>),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    tag = "catalog"
)]
pub async fn get_category(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<CategorySummary> {
    ensure_store_access(&user, store_id)?;
    match state.category_service().get_category(store_id, id).await? {
        Some(model) => Ok(Json(ApiResponse::success(CategorySummary::from(model)))),
        None => Err(ServiceError::NotFound(format!(
            "category {} not found",
            id
        ))),
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/stores/{store_id}/categories/{id}",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Category ID")),
    request_body = UpdateCategoryRequest,
    responses((status = 200, description = "Category updated", body = ApiResponse<CategorySummary>)),
    tag = "catalog"
)]
pub async fn update_category(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> ApiResult<CategorySummary> {
    ensure_store_access(&user, store_id)?;
    payload.validate()?;
    let updated = state
        .category_service()
        .update_category(
            store_id,
            id,
            UpdateCategoryInput {
                name: payload.name,
                description: payload.description.map(Some),
                parent_id: payload.parent_id.map(Some),
                position: payload.position,
                is_visible: payload.is_visible,
            },
        )
        .await?;
    state
        .cache
        .invalidate_store_area_best_effort(store_id, "catalog")
        .await;
    Ok(Json(ApiResponse::success(CategorySummary::from(updated))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/stores/{store_id}/categories/{id}",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Category ID")),
    responses((status = 200, description = "Category deleted", body = ApiResponse<serde_json::Value>)),
    tag = "catalog"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<serde_json::Value> {
    ensure_store_access(&user, store_id)?;
    state.category_service().delete_category(store_id, id).await?;
    state
        .cache
        .invalidate_store_area_best_effort(store_id, "catalog")
        .await;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted": id }),
    )))
}
