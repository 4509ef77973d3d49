//! Queue configuration with validated live updates

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bounds accepted by the admin config endpoint
pub const MIN_BATCH_SIZE: usize = 1;
pub const MAX_BATCH_SIZE: usize = 50;
pub const MIN_DELAY_MS: u64 = 100;
pub const MAX_DELAY_MS: u64 = 10_000;

/// Runtime parameters of the email queue.
///
/// Mutated only through [`super::EmailQueue::update_config`]; the worker reads
/// one complete snapshot per batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum queued jobs before enqueue is rejected
    pub queue_capacity: usize,
    /// Maximum jobs drained per worker cycle
    pub batch_size: usize,
    /// Pause between worker cycles (millis)
    pub inter_batch_delay_ms: u64,
    /// Delivery attempts before a job becomes terminally failed
    pub max_retries: u32,
}

impl QueueConfig {
    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_batch_delay_ms)
    }

    /// Apply a partial update, validating each supplied field.
    ///
    /// Unspecified fields keep their current values.
    pub fn apply(&self, update: &QueueConfigUpdate) -> Result<QueueConfig, ConfigError> {
        let mut next = self.clone();

        if let Some(batch_size) = update.batch_size {
            if !(MIN_BATCH_SIZE..=MAX_BATCH_SIZE).contains(&batch_size) {
                return Err(ConfigError::BatchSizeOutOfRange(batch_size));
            }
            next.batch_size = batch_size;
        }

        if let Some(delay_ms) = update.inter_batch_delay_ms {
            if !(MIN_DELAY_MS..=MAX_DELAY_MS).contains(&delay_ms) {
                return Err(ConfigError::DelayOutOfRange(delay_ms));
            }
            next.inter_batch_delay_ms = delay_ms;
        }

        if let Some(capacity) = update.queue_capacity {
            if capacity == 0 {
                return Err(ConfigError::ZeroCapacity);
            }
            next.queue_capacity = capacity;
        }

        if let Some(max_retries) = update.max_retries {
            if max_retries == 0 {
                return Err(ConfigError::ZeroRetries);
            }
            next.max_retries = max_retries;
        }

        Ok(next)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
            batch_size: 10,
            inter_batch_delay_ms: 1000,
            max_retries: 3,
        }
    }
}

/// Partial config update accepted by the admin API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueConfigUpdate {
    #[serde(default)]
    pub queue_capacity: Option<usize>,
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub inter_batch_delay_ms: Option<u64>,
    #[serde(default)]
    pub max_retries: Option<u32>,
}

/// Config validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Batch size must be between {MIN_BATCH_SIZE} and {MAX_BATCH_SIZE}, got {0}")]
    BatchSizeOutOfRange(usize),

    #[error("Delay must be between {MIN_DELAY_MS} and {MAX_DELAY_MS} ms, got {0}")]
    DelayOutOfRange(u64),

    #[error("Queue capacity must be nonzero")]
    ZeroCapacity,

    #[error("Max retries must be nonzero")]
    ZeroRetries,
}
