//! Outbound mail transport
//!
//! Delivery itself is an external collaborator; the queue only needs a
//! `send -> success|failure` contract.

use std::time::Duration;

use async_trait::async_trait;

/// Default per-send timeout applied by the queue worker
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Contract with the external mail delivery collaborator
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<(), DeliveryError>;
}

/// Delivery failures as seen by the queue worker
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Relay error: {0}")]
    Relay(String),

    #[error("Relay returned status {0}")]
    Rejected(u16),

    #[error("Send timed out after {0:?}")]
    Timeout(Duration),
}

/// Sends mail by POSTing JSON to an HTTP relay endpoint
pub struct HttpRelayTransport {
    client: reqwest::Client,
    relay_url: String,
}

impl HttpRelayTransport {
    pub fn new(relay_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            relay_url: relay_url.into(),
        }
    }
}

#[async_trait]
impl MailTransport for HttpRelayTransport {
    async fn send(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<(), DeliveryError> {
        let payload = serde_json::json!({
            "recipients": recipients,
            "subject": subject,
            "body": body,
        });

        let response = self
            .client
            .post(&self.relay_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Relay(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DeliveryError::Rejected(response.status().as_u16()));
        }

        tracing::debug!(
            recipients = recipients.len(),
            subject = %subject,
            "Mail handed to relay"
        );

        Ok(())
    }
}

/// Logs instead of sending. Used when no relay is configured.
pub struct LogTransport;

#[async_trait]
impl MailTransport for LogTransport {
    async fn send(
        &self,
        recipients: &[String],
        subject: &str,
        _body: &str,
    ) -> Result<(), DeliveryError> {
        tracing::info!(
            recipients = ?recipients,
            subject = %subject,
            "Mail transport disabled, logging only"
        );
        Ok(())
    }
}
