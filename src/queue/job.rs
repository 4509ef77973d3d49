//! Email job types

use serde::{Deserialize, Serialize};

/// Delivery state of an email job.
///
/// Transitions: `Queued -> InFlight -> {Sent | Queued (retry) | Failed}`.
/// A job never moves backward from a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    InFlight,
    Sent,
    Failed,
}

/// A pending outbound email.
///
/// Owned exclusively by the queue from enqueue until a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailJob {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
    /// Creation time (unix millis)
    pub created_at: i64,
    /// Number of delivery attempts so far
    pub attempt_count: u32,
    pub state: JobState,
}

impl EmailJob {
    pub fn new(
        recipients: Vec<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            recipients,
            subject: subject.into(),
            body: body.into(),
            created_at: chrono::Utc::now().timestamp_millis(),
            attempt_count: 0,
            state: JobState::Queued,
        }
    }
}
