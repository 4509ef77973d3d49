use axum::{
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    alert_stats, create_rule, delete_rule, email_stats, health_check, ingest, list_rules,
    queue_status, test_alert, update_queue_config, AppState,
};
use crate::alerts::{AlertManager, EmailChannel, LogChannel, WebhookChannel};
use crate::queue::{EmailQueue, QueueConfig};
use crate::transport::{HttpRelayTransport, LogTransport, MailTransport};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub queue: QueueConfig,
    /// HTTP mail relay endpoint; logs only when unset
    pub relay_url: Option<String>,
    /// Recipients for the email alert channel
    pub email_recipients: Vec<String>,
    /// Optional webhook alert channel
    pub webhook_url: Option<String>,
    pub history_capacity: usize,
    pub stats_window_secs: u64,
    pub send_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            queue: QueueConfig::default(),
            relay_url: None,
            email_recipients: Vec::new(),
            webhook_url: None,
            history_capacity: 100,
            stats_window_secs: 300,
            send_timeout_secs: 30,
        }
    }
}

/// Build the application router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Metric ingestion
        .route("/ingest", post(ingest))
        // Email queue monitoring
        .route("/admin/email/stats", get(email_stats))
        .route("/admin/email/queue", get(queue_status))
        .route("/admin/email/queue/config", post(update_queue_config))
        // Alerting
        .route("/admin/alerts/stats", get(alert_stats))
        .route("/admin/alerts/test", post(test_alert))
        .route("/admin/alerts/rules", get(list_rules))
        .route("/admin/alerts/rules", post(create_rule))
        .route("/admin/alerts/rules/:name", delete(delete_rule))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Mail transport
    let transport: Arc<dyn MailTransport> = match &config.relay_url {
        Some(url) => {
            tracing::info!(relay = %url, "Using HTTP mail relay");
            Arc::new(HttpRelayTransport::new(url.clone()))
        }
        None => {
            tracing::warn!("No mail relay configured, emails will only be logged");
            Arc::new(LogTransport)
        }
    };

    // Delivery queue + background worker
    let queue = Arc::new(
        EmailQueue::new(transport, config.queue.clone())
            .with_send_timeout(Duration::from_secs(config.send_timeout_secs)),
    );
    let worker_handle = Arc::clone(&queue).start();

    // Alert manager with the configured channels
    let mut alerts = AlertManager::new(config.history_capacity).with_channel(Arc::new(LogChannel));
    if config.email_recipients.is_empty() {
        tracing::warn!("No alert recipients configured, email channel disabled");
    } else {
        alerts = alerts.with_channel(Arc::new(EmailChannel::new(
            Arc::clone(&queue),
            config.email_recipients.clone(),
        )));
    }
    if let Some(url) = &config.webhook_url {
        alerts = alerts.with_channel(Arc::new(WebhookChannel::new(url.clone())));
    }

    let state = Arc::new(AppState {
        alerts: Arc::new(alerts),
        queue: Arc::clone(&queue),
        stats_window: Duration::from_secs(config.stats_window_secs),
    });

    // Build router
    let app = build_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Starting Klaxon server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&queue)))
        .await?;

    // Let the worker finish its current batch
    if let Some(handle) = worker_handle {
        let _ = handle.await;
    }

    tracing::info!("Klaxon server stopped");
    Ok(())
}

async fn shutdown_signal(queue: Arc<EmailQueue>) {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");

    tracing::info!("Shutdown signal received, stopping queue worker...");
    queue.stop().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::util::ServiceExt;

    fn create_test_state() -> Arc<AppState> {
        let queue = Arc::new(EmailQueue::new(
            Arc::new(LogTransport),
            QueueConfig::default(),
        ));
        let alerts = AlertManager::new(100).with_channel(Arc::new(EmailChannel::new(
            Arc::clone(&queue),
            vec!["ops@example.com".to_string()],
        )));

        Arc::new(AppState {
            alerts: Arc::new(alerts),
            queue,
            stats_window: Duration::from_secs(300),
        })
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = build_router(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rule_crud() {
        let app = build_router(create_test_state());

        let rule = serde_json::json!({
            "name": "high-latency",
            "metric_key": "latency",
            "comparator": ">",
            "threshold": 100.0,
            "severity": "warning",
            "cooldown_seconds": 60
        });

        let response = app
            .clone()
            .oneshot(json_request("POST", "/admin/alerts/rules", rule.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Duplicate name conflicts
        let response = app
            .clone()
            .oneshot(json_request("POST", "/admin/alerts/rules", rule))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        // Listed
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/admin/alerts/rules")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["rules"].as_array().unwrap().len(), 1);
        assert_eq!(body["rules"][0]["comparator"], ">");

        // Delete, then deleting again is a 404
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/admin/alerts/rules/high-latency")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/admin/alerts/rules/high-latency")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_rule_rejects_bad_comparator() {
        let app = build_router(create_test_state());

        let rule = serde_json::json!({
            "name": "bad",
            "metric_key": "latency",
            "comparator": "!=",
            "threshold": 1.0,
            "severity": "info"
        });

        let response = app
            .oneshot(json_request("POST", "/admin/alerts/rules", rule))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_queue_config_endpoint() {
        let app = build_router(create_test_state());

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/admin/email/queue/config",
                serde_json::json!({"batch_size": 5}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["batch_size"], 5);
        // Unspecified fields keep defaults
        assert_eq!(body["max_retries"], 3);

        let response = app
            .oneshot(json_request(
                "POST",
                "/admin/email/queue/config",
                serde_json::json!({"batch_size": 0}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_queue_status_snapshot() {
        let app = build_router(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/admin/email/queue")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["queue_size"], 0);
        assert_eq!(body["is_processing"], false);
        assert_eq!(body["batch_size"], 10);
    }

    #[tokio::test]
    async fn test_test_alert_shows_in_stats() {
        let app = build_router(create_test_state());

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/admin/alerts/test",
                serde_json::json!({"severity": "warning", "message": "operational check"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/admin/alerts/stats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["total_alerts"], 1);
        assert_eq!(body["by_severity"]["warning"], 1);
    }

    #[tokio::test]
    async fn test_test_alert_rejects_bad_severity() {
        let app = build_router(create_test_state());

        let response = app
            .oneshot(json_request(
                "POST",
                "/admin/alerts/test",
                serde_json::json!({"severity": "fatal", "message": "nope"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_ingest_fires_rule_and_queues_email() {
        let state = create_test_state();
        let app = build_router(Arc::clone(&state));

        let rule = serde_json::json!({
            "name": "high-latency",
            "metric_key": "latency",
            "comparator": ">",
            "threshold": 100.0,
            "severity": "warning"
        });
        let response = app
            .clone()
            .oneshot(json_request("POST", "/admin/alerts/rules", rule))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(json_request(
                "POST",
                "/ingest",
                serde_json::json!({
                    "samples": [
                        {"metric_key": "latency", "value": 150.0},
                        {"metric_key": "latency", "value": 50.0}
                    ]
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["samples"], 2);
        assert_eq!(body["events_fired"], 1);

        // The fired event reached the email channel
        assert_eq!(state.queue.len(), 1);
    }
}
