//! Notification channels for fired alerts

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::rule::{AlertEvent, Severity};
use crate::queue::{EmailJob, EmailQueue};

/// A delivery target for fired alert events.
///
/// The manager iterates a list of channel instances; one channel's failure
/// never blocks the others.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, event: &AlertEvent) -> Result<(), ChannelError>;
}

/// Channel dispatch errors
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Email channel error: {0}")]
    Email(String),

    #[error("Webhook error: {0}")]
    Webhook(String),
}

/// Formats events into email jobs and hands them to the delivery queue
pub struct EmailChannel {
    queue: Arc<EmailQueue>,
    recipients: Vec<String>,
}

impl EmailChannel {
    pub fn new(queue: Arc<EmailQueue>, recipients: Vec<String>) -> Self {
        Self { queue, recipients }
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn name(&self) -> &str {
        "email"
    }

    async fn send(&self, event: &AlertEvent) -> Result<(), ChannelError> {
        let subject = format!("[{}] {}", event.severity, event.title);
        let mut body = event.message.clone();
        if let Some(value) = event.metric_value {
            body.push_str(&format!("\n\nObserved value: {}", value));
        }
        body.push_str(&format!("\nRule: {}", event.rule_name));

        let job = EmailJob::new(self.recipients.clone(), subject, body);
        self.queue
            .enqueue(job)
            .map_err(|e| ChannelError::Email(e.to_string()))
    }
}

/// POSTs the event as JSON to a configured URL
pub struct WebhookChannel {
    client: reqwest::Client,
    url: String,
    headers: HashMap<String, String>,
}

impl WebhookChannel {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            headers: HashMap::new(),
        }
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, event: &AlertEvent) -> Result<(), ChannelError> {
        let mut request = self.client.post(&self.url).json(event);

        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ChannelError::Webhook(format!("Failed to send webhook: {}", e)))?;

        if !response.status().is_success() {
            return Err(ChannelError::Webhook(format!(
                "Webhook returned status {}",
                response.status()
            )));
        }

        tracing::debug!(
            rule = %event.rule_name,
            url = %self.url,
            "Webhook notification sent"
        );

        Ok(())
    }
}

/// Writes the event to the log; always succeeds
pub struct LogChannel;

#[async_trait]
impl NotificationChannel for LogChannel {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, event: &AlertEvent) -> Result<(), ChannelError> {
        match event.severity {
            Severity::Info => tracing::info!(
                rule = %event.rule_name,
                title = %event.title,
                "Alert: {}",
                event.message
            ),
            Severity::Warning => tracing::warn!(
                rule = %event.rule_name,
                title = %event.title,
                "Alert: {}",
                event.message
            ),
            Severity::Error | Severity::Critical => tracing::error!(
                rule = %event.rule_name,
                severity = %event.severity,
                title = %event.title,
                "Alert: {}",
                event.message
            ),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::QueueConfig;
    use crate::transport::LogTransport;

    fn event(severity: Severity) -> AlertEvent {
        AlertEvent {
            timestamp: 1_700_000_000_000,
            rule_name: "high-latency".to_string(),
            severity,
            title: "High latency".to_string(),
            message: "latency > 100".to_string(),
            metric_value: Some(150.0),
        }
    }

    #[tokio::test]
    async fn test_log_channel_always_succeeds() {
        let channel = LogChannel;
        assert!(channel.send(&event(Severity::Critical)).await.is_ok());
    }

    #[tokio::test]
    async fn test_email_channel_enqueues_job() {
        let queue = Arc::new(EmailQueue::new(
            Arc::new(LogTransport),
            QueueConfig::default(),
        ));
        let channel = EmailChannel::new(
            Arc::clone(&queue),
            vec!["ops@example.com".to_string()],
        );

        channel.send(&event(Severity::Warning)).await.unwrap();
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_email_channel_surfaces_queue_full() {
        let queue = Arc::new(EmailQueue::new(
            Arc::new(LogTransport),
            QueueConfig {
                queue_capacity: 1,
                ..Default::default()
            },
        ));
        let channel = EmailChannel::new(
            Arc::clone(&queue),
            vec!["ops@example.com".to_string()],
        );

        channel.send(&event(Severity::Warning)).await.unwrap();
        let err = channel.send(&event(Severity::Warning)).await;
        assert!(matches!(err, Err(ChannelError::Email(_))));
    }
}
