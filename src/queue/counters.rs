//! Delivery outcome counters

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Tracks delivery outcomes across the queue worker.
///
/// Totals are monotonic; the `recent_*` figures cover a rolling window and
/// are pruned lazily on record and read.
#[derive(Debug)]
pub struct DeliveryCounters {
    total_sent: AtomicU64,
    total_failed: AtomicU64,
    window: Duration,
    /// (when, success) outcomes inside the rolling window
    recent: Mutex<VecDeque<(Instant, bool)>>,
}

impl DeliveryCounters {
    pub fn new(window: Duration) -> Self {
        Self {
            total_sent: AtomicU64::new(0),
            total_failed: AtomicU64::new(0),
            window,
            recent: Mutex::new(VecDeque::new()),
        }
    }

    pub fn record_sent(&self) {
        self.total_sent.fetch_add(1, Ordering::SeqCst);
        self.record_recent(true);
    }

    pub fn record_failed(&self) {
        self.total_failed.fetch_add(1, Ordering::SeqCst);
        self.record_recent(false);
    }

    fn record_recent(&self, success: bool) {
        let now = Instant::now();
        let mut recent = self.recent.lock();
        Self::prune(&mut recent, now, self.window);
        recent.push_back((now, success));
    }

    fn prune(recent: &mut VecDeque<(Instant, bool)>, now: Instant, window: Duration) {
        while let Some((when, _)) = recent.front() {
            if now.duration_since(*when) > window {
                recent.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn total_sent(&self) -> u64 {
        self.total_sent.load(Ordering::SeqCst)
    }

    pub fn total_failed(&self) -> u64 {
        self.total_failed.load(Ordering::SeqCst)
    }

    /// Point-in-time snapshot of all counters
    pub fn stats(&self) -> CounterStats {
        let now = Instant::now();
        let mut recent = self.recent.lock();
        Self::prune(&mut recent, now, self.window);

        let recent_sent = recent.iter().filter(|(_, ok)| *ok).count() as u64;
        let recent_failed = recent.len() as u64 - recent_sent;

        CounterStats {
            total_sent: self.total_sent(),
            total_failed: self.total_failed(),
            recent_sent,
            recent_failed,
            window_secs: self.window.as_secs(),
        }
    }
}

impl Default for DeliveryCounters {
    fn default() -> Self {
        // 5 minute rolling window
        Self::new(Duration::from_secs(300))
    }
}

/// Counter snapshot
#[derive(Debug, Clone, serde::Serialize)]
pub struct CounterStats {
    pub total_sent: u64,
    pub total_failed: u64,
    pub recent_sent: u64,
    pub recent_failed: u64,
    pub window_secs: u64,
}
