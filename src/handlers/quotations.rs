use crate::{
    auth::AuthUser,
    entities::quotation::{self, QuotationStatus},
    entities::quotation_item,
    errors::ServiceError,
    handlers::common::{ensure_store_access, limit_or_default, page_or_default, total_pages},
    handlers::orders::OrderSummary,
    services::quotations::{CreateQuotationInput, QuotationItemInput},
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
pub struct QuotationListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Filter by status (draft, sent, accepted, converted, declined, expired)
    pub status: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuotationSummary {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub quotation_number: String,
    pub status: String,
    pub valid_until: Option<DateTime<Utc>>,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub notes: Option<String>,
    pub converted_order_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<quotation::Model> for QuotationSummary {
    fn from(model: quotation::Model) -> Self {
        Self {
            id: model.id,
            customer_id: model.customer_id,
            quotation_number: model.quotation_number,
            status: model.status.to_string(),
            valid_until: model.valid_until,
            subtotal: model.subtotal,
            total: model.total,
            notes: model.notes,
            converted_order_id: model.converted_order_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuotationItemSummary {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total: Decimal,
}

impl From<quotation_item::Model> for QuotationItemSummary {
    fn from(model: quotation_item::Model) -> Self {
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
pub struct QuotationWithItems {
    #[serde(flatten)]
    pub quotation: QuotationSummary,
    pub items: Vec<QuotationItemSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConvertedQuotationResponse {
    pub quotation: QuotationSummary,
    pub order: OrderSummary,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct QuotationItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    /// Proposed price; defaults to the catalog price
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateQuotationRequest {
    pub customer_id: Uuid,
    #[validate(length(min = 1))]
    pub items: Vec<QuotationItemRequest>,
    pub valid_until: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/{store_id}/quotations",
    params(("store_id" = Uuid, Path, description = "Store ID"), QuotationListQuery),
    responses((status = 200, description = "Quotations listed", body = ApiResponse<PaginatedResponse<QuotationSummary>>)),
    tag = "quotations"
)]
pub async fn list_quotations(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(store_id): Path<Uuid>,
    Query(query): Query<QuotationListQuery>,
) -> ApiResult<PaginatedResponse<QuotationSummary>> {
    ensure_store_access(&user, store_id)?;
    let page = page_or_default(query.page);
    let limit = limit_or_default(query.limit);
    let status = match query.status {
        Some(raw) => Some(parse_quotation_status(&raw)?),
        None => None,
    };

    let (records, total) = state
        .quotation_service()
        .list_quotations(store_id, page, limit, status)
        .await?;
    Ok(Json(ApiResponse::success(PaginatedResponse {
        items: records.into_iter().map(QuotationSummary::from).collect(),
        total,
        page,
        limit,
        total_pages: total_pages(total, limit),
    })))
}

fn parse_quotation_status(raw: &str) -> Result<QuotationStatus, ServiceError> {
    match raw.to_ascii_lowercase().as_str() {
        "draft" => Ok(QuotationStatus::Draft),
        "sent" => Ok(QuotationStatus::Sent),
        "accepted" => Ok(QuotationStatus::Accepted),
        "converted" => Ok(QuotationStatus::Converted),
        "declined" => Ok(QuotationStatus::Declined),
        "expired" => Ok(QuotationStatus::Expired),
        other => Err(ServiceError::ValidationError(format!(
            "unknown quotation status '{}'",
            other
        ))),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/{store_id}/quotations",
    params(("store_id" = Uuid, Path, description = "Store ID")),
    request_body = CreateQuotationRequest,
    responses((status = 200, description = "Quotation created", body = ApiResponse<QuotationWithItems>)),
    tag = "quotations"
)]
pub async fn create_quotation(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(store_id): Path<Uuid>,
    Json(payload): Json<CreateQuotationRequest>,
) -> ApiResult<QuotationWithItems> {
    ensure_store_access(&user, store_id)?;
    payload.validate()?;

    let (quotation, items) = state
        .quotation_service()
        .create_quotation(
            store_id,
            CreateQuotationInput {
                customer_id: payload.customer_id,
                items: payload
                    .items
                    .iter()
                    .map(|item| QuotationItemInput {
                        product_id: item.product_id,
                        quantity: item.quantity,
                        unit_price: item.unit_price,
                    })
                    .collect(),
                valid_until: payload.valid_until,
                notes: payload.notes,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(QuotationWithItems {
        quotation: QuotationSummary::from(quotation),
        items: items.into_iter().map(QuotationItemSummary::from).collect(),
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/{store_id}/quotations/{id}",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Quotation ID")),
    responses(
        (status = 200, description = "Quotation fetched with items", body = ApiResponse<QuotationWithItems>),
        (status = 404, description = "Quotation not found", body = crate::errors::ErrorResponse)
    ),
    tag = "quotations"
)]
pub async fn get_quotation(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<QuotationWithItems> {
    ensure_store_access(&user, store_id)?;
    let quotation = state
        .quotation_service()
        .get_quotation(store_id, id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("quotation {} not found", id)))?;
    let items = state
        .quotation_service()
        .get_quotation_items(store_id, id)
        .await?;
    Ok(Json(ApiResponse::success(QuotationWithItems {
        quotation: QuotationSummary::from(quotation),
        items: items.into_iter().map(QuotationItemSummary::from).collect(),
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/{store_id}/quotations/{id}/send",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Quotation ID")),
    responses((status = 200, description = "Quotation sent", body = ApiResponse<QuotationSummary>)),
    tag = "quotations"
)]
pub async fn send_quotation(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<QuotationSummary> {
    ensure_store_access(&user, store_id)?;
    let updated = state.quotation_service().send_quotation(store_id, id).await?;
    Ok(Json(ApiResponse::success(QuotationSummary::from(updated))))
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/{store_id}/quotations/{id}/accept",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Quotation ID")),
    responses((status = 200, description = "Quotation accepted", body = ApiResponse<QuotationSummary>)),
    tag = "quotations"
)]
pub async fn accept_quotation(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<QuotationSummary> {
    ensure_store_access(&user, store_id)?;
    let updated = state
        .quotation_service()
        .accept_quotation(store_id, id)
        .await?;
    Ok(Json(ApiResponse::success(QuotationSummary::from(updated))))
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/{store_id}/quotations/{id}/decline",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Quotation ID")),
    responses((status = 200, description = "Quotation declined", body = ApiResponse<QuotationSummary>)),
    tag = "quotations"
)]
pub async fn decline_quotation(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<QuotationSummary> {
    ensure_store_access(&user, store_id)?;
    let updated = state
        .quotation_service()
        .decline_quotation(store_id, id)
        .await?;
    Ok(Json(ApiResponse::success(QuotationSummary::from(updated))))
}

/// Converts an accepted quotation into a real order; converting twice is a
/// 409.
#[utoipa::path(
    post,
    path = "/api/v1/stores/{store_id}/quotations/{id}/convert",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Quotation ID")),
    responses(
        (status = 200, description = "Order created from quotation", body = ApiResponse<ConvertedQuotationResponse>),
        (status = 409, description = "Already converted", body = crate::errors::ErrorResponse)
    ),
    tag = "quotations"
)]
pub async fn convert_quotation(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<ConvertedQuotationResponse> {
    ensure_store_access(&user, store_id)?;
    let (quotation, order) = state
        .quotation_service()
        .convert_to_order(store_id, id)
        .await?;
    Ok(Json(ApiResponse::success(ConvertedQuotationResponse {
        quotation: QuotationSummary::from(quotation),
        order: OrderSummary::from(order),
    })))
}
