//! Maintenance endpoints driven by the external cron scheduler, gated by a
//! shared-secret token rather than a user session.

use crate::{
    errors::ServiceError,
    events::Event,
    ApiResponse, ApiResult, AppState,
};
use axum::{extract::State, http::HeaderMap, response::Json};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

pub const CRON_TOKEN_HEADER: &str = "x-cron-token";

#[derive(Debug, Serialize, ToSchema)]
pub struct SweepReport {
    pub coupons_activated: u64,
    pub coupons_deactivated: u64,
    pub offers_activated: u64,
    pub offers_deactivated: u64,
    pub cache_keys_invalidated: Option<u64>,
}

fn ensure_cron_token(state: &AppState, headers: &HeaderMap) -> Result<(), ServiceError> {
    let Some(expected) = state.config.cron_token.as_deref() else {
        return Err(ServiceError::Unauthorized(
            "maintenance endpoints are disabled (no cron token configured)".into(),
        ));
    };

    let provided = headers
        .get(CRON_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if provided != expected {
        return Err(ServiceError::Unauthorized("invalid cron token".into()));
    }
    Ok(())
}

/// The discount validity sweep: coupons then offers, each as a
/// deactivate-then-activate transaction, followed by a best-effort cache
/// invalidation pass.
#[utoipa::path(
    post,
    path = "/api/v1/maintenance/discounts/sweep",
    responses(
        (status = 200, description = "Sweep completed", body = ApiResponse<SweepReport>),
        (status = 401, description = "Missing or invalid cron token", body = crate::errors::ErrorResponse)
    ),
    tag = "maintenance"
)]
pub async fn discount_sweep(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<SweepReport> {
    ensure_cron_token(&state, &headers)?;

    let coupons = state.coupon_service().run_validity_sweep().await?;
    let offers = state.offer_service().run_validity_sweep().await?;

    // Stale discount payloads may be cached for any store; drop them all.
    // Failure degrades to shorter-lived staleness, never a sweep failure.
    let cache_keys_invalidated = match state.cache.invalidate_area_all_stores("discounts").await {
        Ok(removed) => Some(removed),
        Err(e) => {
            warn!(error = %e, "discount cache invalidation failed after sweep");
            None
        }
    };

    info!(
        coupons_activated = coupons.activated,
        coupons_deactivated = coupons.deactivated,
        offers_activated = offers.activated,
        offers_deactivated = offers.deactivated,
        "discount sweep completed"
    );
    if let Err(e) = state
        .event_sender
        .send(Event::DiscountSweepCompleted {
            coupons_activated: coupons.activated,
            coupons_deactivated: coupons.deactivated,
            offers_activated: offers.activated,
            offers_deactivated: offers.deactivated,
            swept_at: Utc::now(),
        })
        .await
    {
        warn!(error = %e, "failed to send sweep event");
    }

    Ok(Json(ApiResponse::success(SweepReport {
        coupons_activated: coupons.activated,
        coupons_deactivated: coupons.deactivated,
        offers_activated: offers.activated,
        offers_deactivated: offers.deactivated,
        cache_keys_invalidated,
    })))
}
