use crate::{
    auth::AuthUser,
    entities::invoice,
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
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InvoiceListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceSummary {
    pub id: Uuid,
    pub order_id: Uuid,
    pub invoice_number: String,
    pub status: String,
    pub amount: Decimal,
    pub currency: String,
    pub issued_at: DateTime<Utc>,
    pub due_at: Option<DateTime<Utc>>,
}

impl From<invoice::Model> for InvoiceSummary {
    fn from(model: invoice::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            invoice_number: model.invoice_number,
            status: model.status.to_string(),
            amount: model.amount,
            currency: model.currency,
            issued_at: model.issued_at,
            due_at: model.due_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/{store_id}/invoices",
    params(("store_id" = Uuid, Path, description = "Store ID"), InvoiceListQuery),
    responses((status = 200, description = "Invoices listed", body = ApiResponse<PaginatedResponse<InvoiceSummary>>)),
    tag = "invoices"
)]
pub async fn list_invoices(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(store_id): Path<Uuid>,
    Query(query): Query<InvoiceListQuery>,
) -> ApiResult<PaginatedResponse<InvoiceSummary>> {
    ensure_store_access(&user, store_id)?;
    let page = page_or_default(query.page);
    let limit = limit_or_default(query.limit);
    let (records, total) = state
        .invoice_service()
        .list_invoices(store_id, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(PaginatedResponse {
        items: records.into_iter().map(InvoiceSummary::from).collect(),
        total,
        page,
        limit,
        total_pages: total_pages(total, limit),
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/{store_id}/invoices/{id}",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice fetched", body = ApiResponse<InvoiceSummary>),
        (status = 404, description = "Invoice not found", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn get_invoice(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<InvoiceSummary> {
    ensure_store_access(&user, store_id)?;
    match state.invoice_service().get_invoice(store_id, id).await? {
        Some(model) => Ok(Json(ApiResponse::success(InvoiceSummary::from(model)))),
        None => Err(ServiceError::NotFound(format!("invoice {} not found", id))),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/{store_id}/orders/{order_id}/invoice",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("order_id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Invoice for order", body = ApiResponse<InvoiceSummary>),
        (status = 404, description = "Order has no invoice yet", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn get_order_invoice(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, order_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<InvoiceSummary> {
    ensure_store_access(&user, store_id)?;
    match state
        .invoice_service()
        .get_invoice_for_order(store_id, order_id)
        .await?
    {
        Some(model) => Ok(Json(ApiResponse::success(InvoiceSummary::from(model)))),
        None => Err(ServiceError::NotFound(format!(
            "order {} has no invoice",
            order_id
        ))),
    }
}
