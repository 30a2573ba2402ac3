//! Shipping-carrier integration: rate quotes and shipping guides.
//!
//! One HTTP round-trip per operation, no retries; a provider failure is
//! surfaced to the caller with the provider's own message attached and the
//! shipment left as it was.

use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum CarrierError {
    #[error("carrier request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("carrier rejected request ({status}): {message}")]
    Provider { status: u16, message: String },
    #[error("carrier base URL invalid: {0}")]
    BaseUrl(#[from] url::ParseError),
}

#[derive(Debug, Clone, Serialize)]
pub struct RateRequest {
    pub shipment_id: Uuid,
    pub recipient_name: String,
    pub address: String,
    pub service_level: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateQuote {
    pub rate_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub carrier: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GuideRequest {
    pub shipment_id: Uuid,
    pub rate_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuideDocument {
    pub guide_id: String,
    pub tracking_number: String,
    pub label_url: String,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
}

#[async_trait]
pub trait CarrierClient: Send + Sync {
    async fn quote_rate(&self, request: &RateRequest) -> Result<RateQuote, CarrierError>;
    async fn create_guide(&self, request: &GuideRequest) -> Result<GuideDocument, CarrierError>;
}

/// reqwest-backed client against the carrier's REST API.
pub struct HttpCarrierClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpCarrierClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, CarrierError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
            api_key,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, CarrierError> {
        Ok(self.base_url.join(path)?)
    }

    async fn post_json<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, CarrierError> {
        let mut request = self.http.post(self.endpoint(path)?).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ProviderErrorBody>()
                .await
                .map(|b| b.message)
                .unwrap_or_else(|_| {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown carrier error")
                        .to_string()
                });
            return Err(CarrierError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl CarrierClient for HttpCarrierClient {
    async fn quote_rate(&self, request: &RateRequest) -> Result<RateQuote, CarrierError> {
        self.post_json("/v1/rates", request).await
    }

    async fn create_guide(&self, request: &GuideRequest) -> Result<GuideDocument, CarrierError> {
        self.post_json("/v1/guides", request).await
    }
}

impl CarrierError {
    /// True when the failure came from the provider rather than transport.
    pub fn is_provider_rejection(&self) -> bool {
        matches!(
            self,
            CarrierError::Provider { status, .. } if StatusCode::from_u16(*status)
                .map(|s| s.is_client_error())
                .unwrap_or(false)
        )
    }
}
