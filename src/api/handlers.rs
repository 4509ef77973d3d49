use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::alerts::{AlertManager, AlertRule, AlertStats, Comparator, RuleError, Severity};
use crate::queue::{CounterStats, EmailQueue, QueueConfig, QueueConfigUpdate, QueueStatus};

/// Application state shared across handlers
pub struct AppState {
    pub alerts: Arc<AlertManager>,
    pub queue: Arc<EmailQueue>,
    /// Default window for stats endpoints
    pub stats_window: Duration,
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// Metric Ingestion
// ============================================================================

#[derive(Deserialize)]
pub struct MetricSample {
    pub metric_key: String,
    pub value: f64,
    /// Unix millis; defaults to now
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Deserialize)]
pub struct IngestRequest {
    pub samples: Vec<MetricSample>,
}

#[derive(Serialize)]
pub struct IngestResponse {
    pub samples: usize,
    pub events_fired: usize,
}

pub async fn ingest(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IngestRequest>,
) -> Json<IngestResponse> {
    let total = request.samples.len();
    let mut events_fired = 0;

    for sample in request.samples {
        let timestamp = sample
            .timestamp
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
        let fired = state
            .alerts
            .ingest_sample(&sample.metric_key, sample.value, timestamp)
            .await;
        events_fired += fired.len();
    }

    Json(IngestResponse {
        samples: total,
        events_fired,
    })
}

// ============================================================================
// Email Queue Monitoring
// ============================================================================

#[derive(Serialize)]
pub struct EmailStatsResponse {
    pub stats: CounterStats,
    pub queue_size: usize,
}

pub async fn email_stats(State(state): State<Arc<AppState>>) -> Json<EmailStatsResponse> {
    Json(EmailStatsResponse {
        stats: state.queue.counter_stats(),
        queue_size: state.queue.len(),
    })
}

pub async fn queue_status(State(state): State<Arc<AppState>>) -> Json<QueueStatus> {
    Json(state.queue.status())
}

pub async fn update_queue_config(
    State(state): State<Arc<AppState>>,
    Json(update): Json<QueueConfigUpdate>,
) -> Result<Json<QueueConfig>, ApiError> {
    let config = state
        .queue
        .update_config(&update)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    Ok(Json(config))
}

// ============================================================================
// Alert Stats & Test Alerts
// ============================================================================

#[derive(Deserialize)]
pub struct StatsParams {
    #[serde(default)]
    pub window_secs: Option<u64>,
}

pub async fn alert_stats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StatsParams>,
) -> Json<AlertStats> {
    let window = params
        .window_secs
        .map(Duration::from_secs)
        .unwrap_or(state.stats_window);

    Json(state.alerts.stats(window))
}

#[derive(Deserialize)]
pub struct TestAlertRequest {
    pub severity: String,
    #[serde(default)]
    pub title: Option<String>,
    pub message: String,
}

pub async fn test_alert(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TestAlertRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let severity =
        Severity::parse(&request.severity).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let title = request.title.unwrap_or_else(|| "Test alert".to_string());
    let event = state
        .alerts
        .inject_event(severity, title, request.message)
        .await;

    Ok(Json(serde_json::json!({
        "message": "Test alert sent",
        "event": event,
    })))
}

// ============================================================================
// Rule Management
// ============================================================================

#[derive(Serialize)]
pub struct RulesResponse {
    pub rules: Vec<AlertRule>,
}

pub async fn list_rules(State(state): State<Arc<AppState>>) -> Json<RulesResponse> {
    Json(RulesResponse {
        rules: state.alerts.list_rules(),
    })
}

#[derive(Deserialize)]
pub struct CreateRuleRequest {
    pub name: String,
    pub metric_key: String,
    pub comparator: String,
    pub threshold: f64,
    pub severity: String,
    #[serde(default)]
    pub cooldown_seconds: Option<u64>,
}

pub async fn create_rule(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateRuleRequest>,
) -> Result<Json<AlertRule>, ApiError> {
    let comparator =
        Comparator::parse(&request.comparator).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let severity =
        Severity::parse(&request.severity).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let mut rule = AlertRule::new(
        request.name,
        request.metric_key,
        comparator,
        request.threshold,
        severity,
    )
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    if let Some(cooldown) = request.cooldown_seconds {
        rule = rule.with_cooldown(cooldown);
    }

    state.alerts.register_rule(rule.clone()).map_err(|e| match e {
        RuleError::DuplicateRule(_) => ApiError::Conflict(e.to_string()),
        other => ApiError::BadRequest(other.to_string()),
    })?;

    Ok(Json(rule))
}

pub async fn delete_rule(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .alerts
        .remove_rule(&name)
        .ok_or_else(|| ApiError::NotFound(format!("Rule '{}' not found", name)))?;

    Ok(Json(serde_json::json!({ "deleted": name })))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
