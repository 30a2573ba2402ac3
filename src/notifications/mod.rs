//! Transactional email through the external mail provider.
//!
//! Sends are fire-and-forget from the services' point of view: callers
//! spawn them and a failed send is logged, never bubbled to the request.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("email request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("email provider rejected message ({status})")]
    Provider { status: u16 },
    #[error("email base URL invalid: {0}")]
    BaseUrl(#[from] url::ParseError),
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait EmailClient: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

pub struct HttpEmailClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
    from: String,
}

impl HttpEmailClient {
    pub fn new(base_url: &str, api_key: Option<String>, from: impl Into<String>) -> Result<Self, EmailError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
            api_key,
            from: from.into(),
        })
    }

    pub fn order_confirmation(&self, to: &str, order_number: &str, total: &str) -> EmailMessage {
        EmailMessage {
            from: self.from.clone(),
            to: to.to_string(),
            subject: format!("Order {} confirmed", order_number),
            body: format!(
                "Thanks for your purchase. Order {} for {} has been received and paid.",
                order_number, total
            ),
        }
    }

    pub fn guide_created(&self, to: &str, order_number: &str, tracking_number: &str) -> EmailMessage {
        EmailMessage {
            from: self.from.clone(),
            to: to.to_string(),
            subject: format!("Order {} is on its way", order_number),
            body: format!(
                "A shipping guide was created for order {}. Track it with number {}.",
                order_number, tracking_number
            ),
        }
    }
}

#[async_trait]
impl EmailClient for HttpEmailClient {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        let mut request = self.http.post(self.base_url.join("/v1/messages")?).json(message);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EmailError::Provider {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

/// Spawns a send and logs failures; used everywhere email must not block
/// or fail the surrounding request.
pub fn send_detached(client: std::sync::Arc<dyn EmailClient>, message: EmailMessage) {
    tokio::spawn(async move {
        if let Err(e) = client.send(&message).await {
            warn!(to = %message.to, subject = %message.subject, error = %e, "email send failed");
        }
    });
}
