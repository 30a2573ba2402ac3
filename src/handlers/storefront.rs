//! Public, unauthenticated storefront surface: catalog browsing, the live
//! design and coupon pre-validation, all store-slug addressed and fronted by
//! the Redis read cache.

use crate::{
    errors::ServiceError,
    handlers::common::{limit_or_default, page_or_default, total_pages},
    handlers::coupons::{CouponValidationResponse, ValidateCouponRequest},
    handlers::designs::DesignSummary,
    handlers::offers::OfferSummary,
    handlers::products::{ProductImageSummary, ProductSummary},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CatalogQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StorefrontCatalogPage {
    pub store_slug: String,
    pub products: Vec<StorefrontProduct>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StorefrontProduct {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub price: rust_decimal::Decimal,
    pub compare_at_price: Option<rust_decimal::Decimal>,
    pub is_featured: bool,
}

async fn resolve_store(state: &AppState, slug: &str) -> Result<Uuid, ServiceError> {
    state
        .store_service()
        .get_store_by_slug(slug)
        .await?
        .map(|store| store.id)
        .ok_or_else(|| ServiceError::NotFound(format!("store '{}' not found", slug)))
}

#[utoipa::path(
    get,
    path = "/api/v1/storefront/{store_slug}/catalog",
    params(("store_slug" = String, Path, description = "Store slug"), CatalogQuery),
    responses(
        (status = 200, description = "Active products for the storefront", body = ApiResponse<StorefrontCatalogPage>),
        (status = 404, description = "Unknown store", body = crate::errors::ErrorResponse)
    ),
    tag = "storefront"
)]
pub async fn catalog(
    State(state): State<AppState>,
    Path(store_slug): Path<String>,
    Query(query): Query<CatalogQuery>,
) -> ApiResult<StorefrontCatalogPage> {
    let store_id = resolve_store(&state, &store_slug).await?;
    let page = page_or_default(query.page);
    let limit = limit_or_default(query.limit);

    let cache_key = state.cache.store_key(
        store_id,
        &format!(
            "catalog:products:{}:{}:{}",
            page,
            limit,
            query
                .category_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "all".to_string())
        ),
    );

    match state.cache.get_json::<StorefrontCatalogPage>(&cache_key).await {
        Ok(Some(cached)) => return Ok(Json(ApiResponse::success(cached))),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "storefront cache read failed; serving from database"),
    }

    let (records, total) = state
        .product_service()
        .list_active_products(store_id, page, limit, query.category_id)
        .await?;

    let payload = StorefrontCatalogPage {
        store_slug,
        products: records
            .into_iter()
            .map(|p| StorefrontProduct {
                id: p.id,
                name: p.name,
                slug: p.slug,
                price: p.price,
                compare_at_price: p.compare_at_price,
                is_featured: p.is_featured,
            })
            .collect(),
        total,
        page,
        limit,
        total_pages: total_pages(total, limit),
    };

    if let Err(e) = state.cache.put_json(&cache_key, &payload).await {
        warn!(error = %e, "storefront cache write failed");
    }
    Ok(Json(ApiResponse::success(payload)))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StorefrontProductDetail {
    #[serde(flatten)]
    pub product: ProductSummary,
    pub images: Vec<ProductImageSummary>,
}

#[utoipa::path(
    get,
    path = "/api/v1/storefront/{store_slug}/products/{product_slug}",
    params(
        ("store_slug" = String, Path, description = "Store slug"),
        ("product_slug" = String, Path, description = "Product slug")
    ),
    responses(
        (status = 200, description = "Product detail", body = ApiResponse<StorefrontProductDetail>),
        (status = 404, description = "Product not found or not active", body = crate::errors::ErrorResponse)
    ),
    tag = "storefront"
)]
pub async fn product_detail(
    State(state): State<AppState>,
    Path((store_slug, product_slug)): Path<(String, String)>,
) -> ApiResult<StorefrontProductDetail> {
    let store_id = resolve_store(&state, &store_slug).await?;
    let product = state
        .product_service()
        .get_product_by_slug(store_id, &product_slug)
        .await?
        .filter(|p| p.status == crate::entities::product::ProductStatus::Active)
        .ok_or_else(|| {
            ServiceError::NotFound(format!("product '{}' not found", product_slug))
        })?;

    let images = state
        .product_service()
        .list_images(store_id, product.id)
        .await?;
    Ok(Json(ApiResponse::success(StorefrontProductDetail {
        product: ProductSummary::from(product),
        images: images.into_iter().map(ProductImageSummary::from).collect(),
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/storefront/{store_slug}/offers",
    params(("store_slug" = String, Path, description = "Store slug")),
    responses((status = 200, description = "Offers currently live", body = ApiResponse<Vec<OfferSummary>>)),
    tag = "storefront"
)]
pub async fn active_offers(
    State(state): State<AppState>,
    Path(store_slug): Path<String>,
) -> ApiResult<Vec<OfferSummary>> {
    let store_id = resolve_store(&state, &store_slug).await?;
    let offers = state.offer_service().list_active_offers(store_id).await?;
    Ok(Json(ApiResponse::success(
        offers.into_iter().map(OfferSummary::from).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/storefront/{store_slug}/design",
    params(("store_slug" = String, Path, description = "Store slug")),
    responses(
        (status = 200, description = "The published design", body = ApiResponse<DesignSummary>),
        (status = 404, description = "No published design", body = crate::errors::ErrorResponse)
    ),
    tag = "storefront"
)]
pub async fn published_design(
    State(state): State<AppState>,
    Path(store_slug): Path<String>,
) -> ApiResult<DesignSummary> {
    let store_id = resolve_store(&state, &store_slug).await?;
    match state.design_service().published_design(store_id).await? {
        Some(model) => Ok(Json(ApiResponse::success(DesignSummary::from(model)))),
        None => Err(ServiceError::NotFound(format!(
            "store '{}' has no published design",
            store_slug
        ))),
    }
}

/// Customer-side coupon pre-validation before checkout.
#[utoipa::path(
    post,
    path = "/api/v1/storefront/{store_slug}/coupons/validate",
    params(("store_slug" = String, Path, description = "Store slug")),
    request_body = ValidateCouponRequest,
    responses(
        (status = 200, description = "Coupon applies", body = ApiResponse<CouponValidationResponse>),
        (status = 400, description = "Coupon does not apply", body = crate::errors::ErrorResponse)
    ),
    tag = "storefront"
)]
pub async fn validate_coupon(
    State(state): State<AppState>,
    Path(store_slug): Path<String>,
    Json(payload): Json<ValidateCouponRequest>,
) -> ApiResult<CouponValidationResponse> {
    payload.validate()?;
    let store_id = resolve_store(&state, &store_slug).await?;
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
