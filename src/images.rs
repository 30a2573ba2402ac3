//! Image-host integration. Uploads happen client-side against the provider;
//! the API only records URLs and provider references, and issues a
//! best-effort delete when an image is detached.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ImageHostError {
    #[error("image host request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("image host rejected delete ({status})")]
    Provider { status: u16 },
    #[error("image host base URL invalid: {0}")]
    BaseUrl(#[from] url::ParseError),
}

#[async_trait]
pub trait ImageHostClient: Send + Sync {
    async fn delete(&self, provider_ref: &str) -> Result<(), ImageHostError>;
}

pub struct HttpImageHostClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpImageHostClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, ImageHostError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
            api_key,
        })
    }
}

#[async_trait]
impl ImageHostClient for HttpImageHostClient {
    async fn delete(&self, provider_ref: &str) -> Result<(), ImageHostError> {
        let url = self.base_url.join(&format!("/v1/assets/{}", provider_ref))?;
        let mut request = self.http.delete(url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        // 404 counts as deleted; the row is going away either way.
        if !status.is_success() && status.as_u16() != 404 {
            return Err(ImageHostError::Provider {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
