//! Klaxon: alerting with a batched email delivery queue
//!
//! An in-memory alerting core: threshold rules are evaluated against
//! ingested metric samples, fired events fan out to notification channels
//! (log, email, webhook), and outbound email drains through a bounded FIFO
//! queue with batching, inter-batch delay, and bounded retries. An admin
//! HTTP API exposes delivery stats and live queue reconfiguration.
//!
//! # Features
//!
//! - **Threshold rules**: named `metric comparator threshold` conditions
//!   with per-rule severity and cooldown
//! - **Bounded history**: fired events kept in a FIFO-evicting ring buffer
//! - **Batched delivery**: a single worker drains the email queue in
//!   configurable batches with an inter-batch delay, bounding send rate
//! - **Retry with requeue**: failed sends go back to the tail so one bad
//!   recipient never blocks the queue
//! - **Live reconfiguration**: batch size, delay, capacity, and retry limit
//!   adjustable at runtime through the admin API
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use klaxon::alerts::{AlertManager, AlertRule, Comparator, Severity};
//! use klaxon::queue::{EmailQueue, QueueConfig};
//! use klaxon::transport::LogTransport;
//!
//! # async fn example() {
//! let queue = Arc::new(EmailQueue::new(Arc::new(LogTransport), QueueConfig::default()));
//! let manager = AlertManager::new(100);
//!
//! let rule = AlertRule::new("high-latency", "latency", Comparator::GreaterThan, 100.0, Severity::Warning)
//!     .unwrap()
//!     .with_cooldown(60);
//! manager.register_rule(rule).unwrap();
//!
//! let fired = manager.ingest_sample("latency", 150.0, 0).await;
//! assert_eq!(fired.len(), 1);
//! # }
//! ```

pub mod alerts;
pub mod api;
pub mod queue;
pub mod transport;

// Re-export commonly used types
pub use alerts::{AlertEvent, AlertManager, AlertRule, Comparator, Severity};
pub use queue::{EmailJob, EmailQueue, QueueConfig, QueueError};
pub use transport::{DeliveryError, MailTransport};
