//! Bounded email queue drained by a single background worker

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;

use super::config::{ConfigError, QueueConfig, QueueConfigUpdate};
use super::counters::{CounterStats, DeliveryCounters};
use super::job::{EmailJob, JobState};
use crate::transport::{DeliveryError, MailTransport, DEFAULT_SEND_TIMEOUT};

/// In-memory FIFO of pending email jobs.
///
/// Enqueue is called from request-handling tasks; exactly one background
/// worker drains the queue in batches, so FIFO order holds for jobs that are
/// never retried. A failed job is re-enqueued at the tail and loses its
/// original position.
pub struct EmailQueue {
    /// Pending jobs, head = next to send
    inner: Mutex<VecDeque<EmailJob>>,
    config: RwLock<QueueConfig>,
    counters: DeliveryCounters,
    transport: Arc<dyn MailTransport>,
    send_timeout: Duration,
    /// Whether a drain cycle is currently executing
    processing: AtomicBool,
    /// Whether the background worker loop is active
    running: AtomicBool,
    shutdown_tx: Mutex<Option<mpsc::Sender<()>>>,
}

impl EmailQueue {
    pub fn new(transport: Arc<dyn MailTransport>, config: QueueConfig) -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            config: RwLock::new(config),
            counters: DeliveryCounters::default(),
            transport,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            processing: AtomicBool::new(false),
            running: AtomicBool::new(false),
            shutdown_tx: Mutex::new(None),
        }
    }

    /// Override the per-send timeout
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Append a job at the tail.
    ///
    /// Rejected synchronously when the queue is at capacity; jobs are never
    /// dropped silently.
    pub fn enqueue(&self, job: EmailJob) -> Result<(), QueueError> {
        let capacity = self.config.read().queue_capacity;
        let mut inner = self.inner.lock();

        if inner.len() >= capacity {
            return Err(QueueError::QueueFull(capacity));
        }

        inner.push_back(job);
        Ok(())
    }

    /// Number of queued (not in-flight) jobs
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Validate and atomically swap the queue configuration.
    ///
    /// Takes effect from the next drain cycle; the cycle in progress keeps
    /// the snapshot it took at batch start.
    pub fn update_config(&self, update: &QueueConfigUpdate) -> Result<QueueConfig, ConfigError> {
        // Apply under the write lock so concurrent updates to different
        // fields compose instead of overwriting each other.
        let next = {
            let mut config = self.config.write();
            let next = config.apply(update)?;
            *config = next.clone();
            next
        };

        tracing::info!(
            batch_size = next.batch_size,
            delay_ms = next.inter_batch_delay_ms,
            queue_capacity = next.queue_capacity,
            max_retries = next.max_retries,
            "Queue configuration updated"
        );

        Ok(next)
    }

    pub fn config(&self) -> QueueConfig {
        self.config.read().clone()
    }

    /// Point-in-time queue status snapshot
    pub fn status(&self) -> QueueStatus {
        let config = self.config.read().clone();
        QueueStatus {
            queue_size: self.len(),
            is_processing: self.processing.load(Ordering::SeqCst),
            batch_size: config.batch_size,
            delay_ms: config.inter_batch_delay_ms,
        }
    }

    /// Delivery counter snapshot
    pub fn counter_stats(&self) -> CounterStats {
        self.counters.stats()
    }

    /// Run one drain cycle: pop up to `batch_size` jobs from the head and
    /// attempt delivery for each. Returns the number of jobs sent.
    ///
    /// Called by the background worker every `inter_batch_delay`; exposed so
    /// tests can step the queue deterministically.
    pub async fn drain_cycle(&self) -> usize {
        self.processing.store(true, Ordering::SeqCst);

        // One complete config snapshot per batch; later updates apply to the
        // next cycle only.
        let config = self.config.read().clone();

        let batch: Vec<EmailJob> = {
            let mut inner = self.inner.lock();
            let take = config.batch_size.min(inner.len());
            inner
                .drain(..take)
                .map(|mut job| {
                    job.state = JobState::InFlight;
                    job
                })
                .collect()
        };

        let mut sent = 0;
        for mut job in batch {
            match self.deliver(&job).await {
                Ok(()) => {
                    job.state = JobState::Sent;
                    self.counters.record_sent();
                    sent += 1;
                    tracing::debug!(
                        subject = %job.subject,
                        recipients = job.recipients.len(),
                        "Email sent"
                    );
                }
                Err(e) => {
                    job.attempt_count += 1;
                    if job.attempt_count < config.max_retries {
                        // Requeue at the tail so a failing job does not block
                        // the jobs behind it.
                        job.state = JobState::Queued;
                        tracing::debug!(
                            subject = %job.subject,
                            attempt = job.attempt_count,
                            error = %e,
                            "Delivery failed, requeued"
                        );
                        self.inner.lock().push_back(job);
                    } else {
                        job.state = JobState::Failed;
                        self.counters.record_failed();
                        tracing::warn!(
                            subject = %job.subject,
                            attempts = job.attempt_count,
                            error = %e,
                            "Email permanently failed"
                        );
                    }
                }
            }
        }

        self.processing.store(false, Ordering::SeqCst);
        sent
    }

    /// One delivery attempt with the send timeout applied
    async fn deliver(&self, job: &EmailJob) -> Result<(), DeliveryError> {
        match tokio::time::timeout(
            self.send_timeout,
            self.transport.send(&job.recipients, &job.subject, &job.body),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout(self.send_timeout)),
        }
    }

    /// Start the background worker.
    ///
    /// Returns `None` if a worker is already active; exactly one worker may
    /// drain the queue at a time.
    pub fn start(self: Arc<Self>) -> Option<tokio::task::JoinHandle<()>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!("Queue worker already running, ignoring start");
            return None;
        }

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        *self.shutdown_tx.lock() = Some(shutdown_tx);

        let queue = self;
        Some(tokio::spawn(async move {
            tracing::info!("Email queue worker started");

            loop {
                let delay = queue.config.read().inter_batch_delay();
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {
                        // Shutdown during a cycle waits for the cycle to
                        // finish before the next select sees the signal.
                        queue.drain_cycle().await;
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }

            queue.running.store(false, Ordering::SeqCst);

            let remaining = queue.len();
            if remaining > 0 {
                tracing::warn!(
                    dropped = remaining,
                    "Email queue worker stopping with undelivered jobs"
                );
            }
            tracing::info!("Email queue worker stopped");
        }))
    }

    /// Signal the worker to stop after its current batch
    pub async fn stop(&self) {
        let tx = self.shutdown_tx.lock().take();
        if let Some(tx) = tx {
            let _ = tx.send(()).await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Point-in-time queue status
#[derive(Debug, Clone, serde::Serialize)]
pub struct QueueStatus {
    pub queue_size: usize,
    pub is_processing: bool,
    pub batch_size: usize,
    pub delay_ms: u64,
}

/// Enqueue errors
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Queue is full (capacity {0})")]
    QueueFull(usize),
}
