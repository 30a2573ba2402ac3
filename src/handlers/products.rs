use crate::{
    auth::AuthUser,
    entities::product::{self, ProductStatus},
    entities::product_image,
    errors::ServiceError,
    handlers::common::{ensure_store_access, limit_or_default, page_or_default, parse_status, total_pages},
    services::products::{AttachImageInput, CreateProductInput, UpdateProductInput},
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
pub struct ProductListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Filter by status (draft, active, archived)
    pub status: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductSummary {
    pub id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub sku: Option<String>,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub status: String,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<product::Model> for ProductSummary {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            category_id: model.category_id,
            name: model.name,
            slug: model.slug,
            description: model.description,
            sku: model.sku,
            price: model.price,
            compare_at_price: model.compare_at_price,
            status: model.status.to_string(),
            is_featured: model.is_featured,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductImageSummary {
    pub id: Uuid,
    pub url: String,
    pub alt_text: Option<String>,
    pub position: i32,
}

impl From<product_image::Model> for ProductImageSummary {
    fn from(model: product_image::Model) -> Self {
        Self {
            id: model.id,
            url: model.url,
            alt_text: model.alt_text,
            position: model.position,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1, max = 64))]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub sku: Option<String>,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub category_id: Option<Uuid>,
    /// draft, active or archived; defaults to draft
    pub status: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub price: Option<Decimal>,
    pub compare_at_price: Option<Decimal>,
    pub category_id: Option<Uuid>,
    pub status: Option<String>,
    pub is_featured: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AttachImageRequest {
    #[validate(url)]
    pub url: String,
    #[validate(length(min = 1))]
    pub provider_ref: String,
    pub alt_text: Option<String>,
    #[serde(default)]
    pub position: i32,
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/{store_id}/products",
    params(("store_id" = Uuid, Path, description = "Store ID"), ProductListQuery),
    responses((status = 200, description = "Products listed", body = ApiResponse<PaginatedResponse<ProductSummary>>)),
    tag = "catalog"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(store_id): Path<Uuid>,
    Query(query): Query<ProductListQuery>,
) -> ApiResult<PaginatedResponse<ProductSummary>> {
    ensure_store_access(&user, store_id)?;
    let page = page_or_default(query.page);
    let limit = limit_or_default(query.limit);
    let status = parse_status::<ProductStatus>(query.status)?;

    let (records, total) = state
        .product_service()
        .list_products(store_id, page, limit, status)
        .await?;
    Ok(Json(ApiResponse::success(PaginatedResponse {
        items: records.into_iter().map(ProductSummary::from).collect(),
        total,
        page,
        limit,
        total_pages: total_pages(total, limit),
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/{store_id}/products",
    params(("store_id" = Uuid, Path, description = "Store ID")),
    request_body = CreateProductRequest,
    responses(
        (status = 200, description = "Product created", body = ApiResponse<ProductSummary>),
        (status = 409, description = "Slug already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "catalog"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(store_id): Path<Uuid>,
    Json(payload): Json<CreateProductRequest>,
) -> ApiResult<ProductSummary> {
    ensure_store_access(&user, store_id)?;
    payload.validate()?;
    let status = parse_status::<ProductStatus>(payload.status)?.unwrap_or(ProductStatus::Draft);

    let created = state
        .product_service()
        .create_product(
            store_id,
            CreateProductInput {
                name: payload.name,
                slug: payload.slug,
                description: payload.description,
                sku: payload.sku,
                price: payload.price,
                compare_at_price: payload.compare_at_price,
                category_id: payload.category_id,
                status,
                is_featured: payload.is_featured,
            },
        )
        .await?;
    state
        .cache
        .invalidate_store_area_best_effort(store_id, "catalog")
        .await;
    Ok(Json(ApiResponse::success(ProductSummary::from(created))))
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/{store_id}/products/{id}",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product fetched", body = ApiResponse<ProductSummary>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "catalog"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<ProductSummary> {
    ensure_store_access(&user, store_id)?;
    match state.product_service().get_product(store_id, id).await? {
        Some(model) => Ok(Json(ApiResponse::success(ProductSummary::from(model)))),
        None => Err(ServiceError::NotFound(format!("product {} not found", id))),
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/stores/{store_id}/products/{id}",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses((status = 200, description = "Product updated", body = ApiResponse<ProductSummary>)),
    tag = "catalog"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateProductRequest>,
) -> ApiResult<ProductSummary> {
    ensure_store_access(&user, store_id)?;
    payload.validate()?;
    let status = parse_status::<ProductStatus>(payload.status)?;

    let updated = state
        .product_service()
        .update_product(
            store_id,
            id,
            UpdateProductInput {
                name: payload.name,
                description: payload.description,
                sku: payload.sku.map(Some),
                price: payload.price,
                compare_at_price: payload.compare_at_price.map(Some),
                category_id: payload.category_id.map(Some),
                status,
                is_featured: payload.is_featured,
            },
        )
        .await?;
    state
        .cache
        .invalidate_store_area_best_effort(store_id, "catalog")
        .await;
    Ok(Json(ApiResponse::success(ProductSummary::from(updated))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/stores/{store_id}/products/{id}",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Product ID")),
    responses((status = 200, description = "Product archived", body = ApiResponse<ProductSummary>)),
    tag = "catalog"
)]
pub async fn archive_product(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<ProductSummary> {
    ensure_store_access(&user, store_id)?;
    let archived = state.product_service().archive_product(store_id, id).await?;
    state
        .cache
        .invalidate_store_area_best_effort(store_id, "catalog")
        .await;
    Ok(Json(ApiResponse::success(ProductSummary::from(archived))))
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/{store_id}/products/{id}/images",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Product ID")),
    responses((status = 200, description = "Images listed", body = ApiResponse<Vec<ProductImageSummary>>)),
    tag = "catalog"
)]
pub async fn list_product_images(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Vec<ProductImageSummary>> {
    ensure_store_access(&user, store_id)?;
    let images = state.product_service().list_images(store_id, id).await?;
    Ok(Json(ApiResponse::success(
        images.into_iter().map(ProductImageSummary::from).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/{store_id}/products/{id}/images",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Product ID")),
    request_body = AttachImageRequest,
    responses((status = 200, description = "Image attached", body = ApiResponse<ProductImageSummary>)),
    tag = "catalog"
)]
pub async fn attach_product_image(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<AttachImageRequest>,
) -> ApiResult<ProductImageSummary> {
    ensure_store_access(&user, store_id)?;
    payload.validate()?;
    let image = state
        .product_service()
        .attach_image(
            store_id,
            id,
            AttachImageInput {
                url: payload.url,
                provider_ref: payload.provider_ref,
                alt_text: payload.alt_text,
                position: payload.position,
            },
        )
        .await?;
    state
        .cache
        .invalidate_store_area_best_effort(store_id, "catalog")
        .await;
    Ok(Json(ApiResponse::success(ProductImageSummary::from(image))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/stores/{store_id}/products/{id}/images/{image_id}",
    params(
        ("store_id" = Uuid, Path, description = "Store ID"),
        ("id" = Uuid, Path, description = "Product ID"),
        ("image_id" = Uuid, Path, description = "Image ID")
    ),
    responses((status = 200, description = "Image detached", body = ApiResponse<serde_json::Value>)),
    tag = "catalog"
)]
pub async fn detach_product_image(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id, image_id)): Path<(Uuid, Uuid, Uuid)>,
) -> ApiResult<serde_json::Value> {
    ensure_store_access(&user, store_id)?;
    state
        .product_service()
        .detach_image(store_id, id, image_id)
        .await?;
    state
        .cache
        .invalidate_store_area_best_effort(store_id, "catalog")
        .await;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted": image_id }),
    )))
}
