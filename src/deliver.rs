//! Outbound delivery: one best-effort JSON POST per message, no retry.

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::Duration;

#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The destination answered outside the 2xx range. The body is captured
    /// best-effort so a foreground sender can see what the service said.
    #[error("webhook error {status}{}", format_body(.body))]
    Status { status: u16, body: String },

    /// DNS, TLS, connect or timeout failure before a response arrived.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The selected endpoint slot has no URL.
    #[error("endpoint not configured")]
    Unconfigured,
}

fn format_body(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {body}")
    }
}

/// Seam between the scheduler and the network. Implementations issue exactly
/// one send attempt; the caller decides the job's fate on failure.
#[async_trait]
pub trait Deliver: Send + Sync {
    async fn send(&self, url: &str, content: &str) -> Result<(), DeliveryError>;
}

pub struct WebhookDispatcher {
    client: reqwest::Client,
}

impl WebhookDispatcher {
    pub fn new(request_timeout_secs: u64) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(request_timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Deliver for WebhookDispatcher {
    async fn send(&self, url: &str, content: &str) -> Result<(), DeliveryError> {
        let res = self
            .client
            .post(url)
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_includes_body_when_present() {
        let err = DeliveryError::Status {
            status: 429,
            body: "rate limited".to_string(),
        };
        assert_eq!(err.to_string(), "webhook error 429: rate limited");
    }

    #[test]
    fn status_error_omits_empty_body() {
        let err = DeliveryError::Status {
            status: 404,
            body: String::new(),
        };
        assert_eq!(err.to_string(), "webhook error 404");
    }

    #[test]
    fn unconfigured_reads_like_the_user_message() {
        assert_eq!(DeliveryError::Unconfigured.to_string(), "endpoint not configured");
    }
}
