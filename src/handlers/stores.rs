use crate::{
    auth::AuthUser,
    entities::store,
    errors::ServiceError,
    handlers::common::{ensure_store_access, limit_or_default, page_or_default, total_pages},
    services::stores::{CreateStoreInput, UpdateStoreInput},
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
pub struct StoreListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StoreSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub contact_email: String,
    pub currency: String,
    pub logo_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<store::Model> for StoreSummary {
    fn from(model: store::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            contact_email: model.contact_email,
            currency: model.currency,
            logo_url: model.logo_url,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateStoreRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 2, max = 64))]
    pub slug: String,
    #[validate(email)]
    pub contact_email: String,
    #[validate(length(min = 3, max = 3))]
    pub currency: String,
    pub logo_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateStoreRequest {
    pub name: Option<String>,
    #[validate(email)]
    pub contact_email: Option<String>,
    #[validate(length(min = 3, max = 3))]
    pub currency: Option<String>,
    pub logo_url: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/stores",
    params(StoreListQuery),
    responses((status = 200, description = "Stores listed", body = ApiResponse<PaginatedResponse<StoreSummary>>)),
    tag = "stores"
)]
pub async fn list_stores(
    State(state): State<AppState>,
    Query(query): Query<StoreListQuery>,
) -> ApiResult<PaginatedResponse<StoreSummary>> {
    let page = page_or_default(query.page);
    let limit = limit_or_default(query.limit);
    let (records, total) = state.store_service().list_stores(page, limit).await?;
    let items: Vec<StoreSummary> = records.into_iter().map(StoreSummary::from).collect();
    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total,
        page,
        limit,
        total_pages: total_pages(total, limit),
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/stores",
    request_body = CreateStoreRequest,
    responses(
        (status = 200, description = "Store created", body = ApiResponse<StoreSummary>),
        (status = 409, description = "Slug already taken", body = crate::errors::ErrorResponse)
    ),
    tag = "stores"
)]
pub async fn create_store(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateStoreRequest>,
) -> ApiResult<StoreSummary> {
    payload.validate()?;
    let created = state
        .store_service()
        .create_store(CreateStoreInput {
            name: payload.name,
            slug: payload.slug,
            owner_subject: user.subject,
            contact_email: payload.contact_email,
            currency: payload.currency.to_uppercase(),
            logo_url: payload.logo_url,
        })
        .await?;
    Ok(Json(ApiResponse::success(StoreSummary::from(created))))
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/{store_id}",
    params(("store_id" = Uuid, Path, description = "Store ID")),
    responses(
        (status = 200, description = "Store fetched", body = ApiResponse<StoreSummary>),
        (status = 404, description = "Store not found", body = crate::errors::ErrorResponse)
    ),
    tag = "stores"
)]
pub async fn get_store(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(store_id): Path<Uuid>,
) -> ApiResult<StoreSummary> {
    ensure_store_access(&user, store_id)?;
    match state.store_service().get_store(store_id).await? {
        Some(model) => Ok(Json(ApiResponse::success(StoreSummary::from(model)))),
        None => Err(ServiceError::NotFound(format!(
            "store {} not found",
            store_id
        ))),
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/stores/{store_id}",
    params(("store_id" = Uuid, Path, description = "Store ID")),
    request_body = UpdateStoreRequest,
    responses((status = 200, description = "Store updated", body = ApiResponse<StoreSummary>)),
    tag = "stores"
)]
pub async fn update_store(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(store_id): Path<Uuid>,
    Json(payload): Json<UpdateStoreRequest>,
) -> ApiResult<StoreSummary> {
    ensure_store_access(&user, store_id)?;
    payload.validate()?;
    let updated = state
        .store_service()
        .update_store(
            store_id,
            UpdateStoreInput {
                name: payload.name,
                contact_email: payload.contact_email,
                currency: payload.currency.map(|c| c.to_uppercase()),
                logo_url: payload.logo_url.map(Some),
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(StoreSummary::from(updated))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/stores/{store_id}",
    params(("store_id" = Uuid, Path, description = "Store ID")),
    responses((status = 200, description = "Store archived", body = ApiResponse<StoreSummary>)),
    tag = "stores"
)]
pub async fn archive_store(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(store_id): Path<Uuid>,
) -> ApiResult<StoreSummary> {
    ensure_store_access(&user, store_id)?;
    let archived = state.store_service().archive_store(store_id).await?;
    Ok(Json(ApiResponse::success(StoreSummary::from(archived))))
}
