//! Payment-provider webhook: signature-verified, no session. The provider
//! signs the raw body with HMAC-SHA256 and sends the hex digest in a header.

use crate::{errors::ServiceError, ApiResponse, ApiResult, AppState};
use axum::{body::Bytes, extract::State, http::HeaderMap, response::Json};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{info, warn};
use uuid::Uuid;

pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Deserialize)]
pub struct PaymentWebhookEvent {
    pub event_type: String,
    pub store_id: Uuid,
    pub order_id: Uuid,
    pub payment_reference: String,
}

fn verify_signature(secret: &str, body: &[u8], signature_hex: &str) -> Result<(), ServiceError> {
    let signature = hex::decode(signature_hex)
        .map_err(|_| ServiceError::Unauthorized("malformed webhook signature".into()))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| ServiceError::InternalError("invalid webhook secret".into()))?;
    mac.update(body);
    mac.verify_slice(&signature)
        .map_err(|_| ServiceError::Unauthorized("webhook signature mismatch".into()))
}

/// Entry point for provider payment notifications. A `payment.succeeded`
/// event marks the order paid (stock decrement + invoice, once); anything
/// else is acknowledged and ignored.
#[utoipa::path(
    post,
    path = "/api/v1/payments/webhook",
    request_body = Vec<u8>,
    responses(
        (status = 200, description = "Event processed or ignored", body = ApiResponse<serde_json::Value>),
        (status = 401, description = "Bad signature", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order already paid", body = crate::errors::ErrorResponse)
    ),
    tag = "payments"
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<serde_json::Value> {
    let Some(secret) = state.config.payment_webhook_secret.as_deref() else {
        warn!("payment webhook received but no secret configured");
        return Err(ServiceError::Unauthorized(
            "payment webhooks are not configured".into(),
        ));
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServiceError::Unauthorized("missing webhook signature".into()))?;
    verify_signature(secret, &body, signature)?;

    let event: PaymentWebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| ServiceError::ValidationError(format!("invalid webhook payload: {}", e)))?;

    match event.event_type.as_str() {
        "payment.succeeded" => {
            let order = state
                .order_service()
                .mark_paid(event.store_id, event.order_id, event.payment_reference)
                .await?;
            info!(order_id = %order.id, "payment webhook applied");
            Ok(Json(ApiResponse::success(serde_json::json!({
                "order_id": order.id,
                "payment_status": order.payment_status.to_string(),
            }))))
        }
        other => {
            info!(event_type = %other, "ignoring unhandled payment event");
            Ok(Json(ApiResponse::success(serde_json::json!({
                "ignored": other,
            }))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn valid_signature_passes() {
        let body = br#"{"event_type":"payment.succeeded"}"#;
        let signature = sign("webhook-secret", body);
        assert!(verify_signature("webhook-secret", body, &signature).is_ok());
    }

    #[test]
    fn tampered_body_fails() {
        let signature = sign("webhook-secret", b"original");
        let err = verify_signature("webhook-secret", b"tampered", &signature).unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[test]
    fn non_hex_signature_fails_cleanly() {
        let err = verify_signature("webhook-secret", b"body", "not-hex!").unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }
}
