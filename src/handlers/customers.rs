use crate::{
    auth::AuthUser,
    entities::customer,
    errors::ServiceError,
    handlers::common::{ensure_store_access, limit_or_default, page_or_default, total_pages},
    services::customers::{CreateCustomerInput, UpdateCustomerInput},
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
pub struct CustomerListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerSummary {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub shipping_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<customer::Model> for CustomerSummary {
    fn from(model: customer::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            name: model.name,
            phone: model.phone,
            shipping_address: model.shipping_address,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCustomerRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub name: String,
    pub phone: Option<String>,
    pub shipping_address: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCustomerRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub shipping_address: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/{store_id}/customers",
    params(("store_id" = Uuid, Path, description = "Store ID"), CustomerListQuery),
    responses((status = 200, description = "Customers listed", body = ApiResponse<PaginatedResponse<CustomerSummary>>)),
    tag = "customers"
)]
pub async fn list_customers(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(store_id): Path<Uuid>,
    Query(query): Query<CustomerListQuery>,
) -> ApiResult<PaginatedResponse<CustomerSummary>> {
    ensure_store_access(&user, store_id)?;
    let page = page_or_default(query.page);
    let limit = limit_or_default(query.limit);
    let (records, total) = state
        .customer_service()
        .list_customers(store_id, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(PaginatedResponse {
        items: records.into_iter().map(CustomerSummary::from).collect(),
        total,
        page,
        limit,
        total_pages: total_pages(total, limit),
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/{store_id}/customers",
    params(("store_id" = Uuid, Path, description = "Store ID")),
    request_body = CreateCustomerRequest,
    responses(
        (status = 200, description = "Customer created", body = ApiResponse<CustomerSummary>),
        (status = 409, description = "Email already registered", body = crate::errors::ErrorResponse)
    ),
    tag = "customers"
)]
pub async fn create_customer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(store_id): Path<Uuid>,
    Json(payload): Json<CreateCustomerRequest>,
) -> ApiResult<CustomerSummary> {
    ensure_store_access(&user, store_id)?;
    payload.validate()?;
    let created = state
        .customer_service()
        .create_customer(
            store_id,
            CreateCustomerInput {
                email: payload.email,
                name: payload.name,
                phone: payload.phone,
                shipping_address: payload.shipping_address,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(CustomerSummary::from(created))))
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/{store_id}/customers/{id}",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Customer ID")),
    responses(
        (status = 200, description = "Customer fetched", body = ApiResponse<CustomerSummary>),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse)
    ),
    tag = "customers"
)]
pub async fn get_customer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<CustomerSummary> {
    ensure_store_access(&user, store_id)?;
    match state.customer_service().get_customer(store_id, id).await? {
        Some(model) => Ok(Json(ApiResponse::success(CustomerSummary::from(model)))),
        None => Err(ServiceError::NotFound(format!(
            "customer {} not found",
            id
        ))),
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/stores/{store_id}/customers/{id}",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Customer ID")),
    request_body = UpdateCustomerRequest,
    responses((status = 200, description = "Customer updated", body = ApiResponse<CustomerSummary>)),
    tag = "customers"
)]
pub async fn update_customer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateCustomerRequest>,
) -> ApiResult<CustomerSummary> {
    ensure_store_access(&user, store_id)?;
    let updated = state
        .customer_service()
        .update_customer(
            store_id,
            id,
            UpdateCustomerInput {
                name: payload.name,
                phone: payload.phone.map(Some),
                shipping_address: payload.shipping_address.map(Some),
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(CustomerSummary::from(updated))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/stores/{store_id}/customers/{id}",
    params(("store_id" = Uuid, Path, description = "Store ID"), ("id" = Uuid, Path, description = "Customer ID")),
    responses((status = 200, description = "Customer deleted", body = ApiResponse<serde_json::Value>)),
    tag = "customers"
)]
pub async fn delete_customer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((store_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<serde_json::Value> {
    ensure_store_access(&user, store_id)?;
    state.customer_service().delete_customer(store_id, id).await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted": id }),
    )))
}
