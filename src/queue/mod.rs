//! Batched email delivery queue
//!
//! A bounded FIFO of pending email jobs drained by a single background
//! worker. Batch size and inter-batch delay bound the outbound send rate;
//! failed jobs are retried from the tail up to a configurable limit.

pub mod config;
pub mod counters;
pub mod email_queue;
pub mod job;

pub use config::{ConfigError, QueueConfig, QueueConfigUpdate};
pub use counters::{CounterStats, DeliveryCounters};
pub use email_queue::{EmailQueue, QueueError, QueueStatus};
pub use job::{EmailJob, JobState};
