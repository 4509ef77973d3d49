//! Klaxon Server
//!
//! Run with: cargo run
//!
//! Environment variables:
//! - KLAXON_HOST: Bind address (default: 0.0.0.0)
//! - KLAXON_PORT: Port number (default: 8080)
//! - KLAXON_QUEUE_CAPACITY: Max queued email jobs (default: 1000)
//! - KLAXON_BATCH_SIZE: Jobs drained per worker cycle (default: 10)
//! - KLAXON_BATCH_DELAY_MS: Pause between cycles in ms (default: 1000)
//! - KLAXON_MAX_RETRIES: Delivery attempts per job (default: 3)
//! - KLAXON_RELAY_URL: HTTP mail relay endpoint (unset: log only)
//! - KLAXON_ALERT_RECIPIENTS: Comma-separated email recipients for alerts
//! - KLAXON_WEBHOOK_URL: Webhook alert channel endpoint (optional)
//! - KLAXON_HISTORY_CAPACITY: Alert history ring size (default: 100)
//! - KLAXON_STATS_WINDOW_SECS: Default stats window (default: 300)
//! - KLAXON_SEND_TIMEOUT_SECS: Per-send timeout (default: 30)
//! - RUST_LOG: Log level (default: info)

use klaxon::api::{run_server, ServerConfig};
use klaxon::queue::QueueConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "klaxon=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse configuration from environment
    let host = std::env::var("KLAXON_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env_parse("KLAXON_PORT", 8080);

    let queue = QueueConfig {
        queue_capacity: env_parse("KLAXON_QUEUE_CAPACITY", 1000),
        batch_size: env_parse("KLAXON_BATCH_SIZE", 10),
        inter_batch_delay_ms: env_parse("KLAXON_BATCH_DELAY_MS", 1000),
        max_retries: env_parse("KLAXON_MAX_RETRIES", 3),
    };

    // Comma-separated recipient list
    let email_recipients: Vec<String> = std::env::var("KLAXON_ALERT_RECIPIENTS")
        .ok()
        .map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let config = ServerConfig {
        host,
        port,
        queue,
        relay_url: std::env::var("KLAXON_RELAY_URL").ok(),
        email_recipients,
        webhook_url: std::env::var("KLAXON_WEBHOOK_URL").ok(),
        history_capacity: env_parse("KLAXON_HISTORY_CAPACITY", 100),
        stats_window_secs: env_parse("KLAXON_STATS_WINDOW_SECS", 300),
        send_timeout_secs: env_parse("KLAXON_SEND_TIMEOUT_SECS", 30),
    };

    tracing::info!("Klaxon configuration:");
    tracing::info!("  Host: {}:{}", config.host, config.port);
    tracing::info!(
        "  Queue: capacity={}, batch_size={}, delay={}ms, max_retries={}",
        config.queue.queue_capacity,
        config.queue.batch_size,
        config.queue.inter_batch_delay_ms,
        config.queue.max_retries
    );
    tracing::info!(
        "  Mail relay: {}",
        config.relay_url.as_deref().unwrap_or("disabled (log only)")
    );
    tracing::info!("  Alert recipients: {}", config.email_recipients.len());
    if let Some(ref url) = config.webhook_url {
        tracing::info!("  Webhook channel: {}", url);
    }

    println!(
        r#"
  _  ___
 | |/ / | __ ___  _____  _ __
 | ' /| |/ _` \ \/ / _ \| '_ \
 | . \| | (_| |>  < (_) | | | |
 |_|\_\_|\__,_/_/\_\___/|_| |_|

 Alerting & Email Notification Queue
 Version: {}
"#,
        env!("CARGO_PKG_VERSION")
    );

    run_server(config).await
}
