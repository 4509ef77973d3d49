//! Alert manager: rule registry, cooldown gating, event history, fan-out

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use super::channel::NotificationChannel;
use super::rule::{AlertEvent, AlertRule, RuleError, Severity};

/// How many events the stats endpoint echoes back
const RECENT_ALERTS_SHOWN: usize = 10;

/// Bounded event history with severity tallies.
///
/// Totals are monotonic; the ring buffer evicts oldest-first.
struct History {
    events: VecDeque<AlertEvent>,
    capacity: usize,
    total: u64,
    by_severity: [u64; 4],
}

impl History {
    fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            total: 0,
            by_severity: [0; 4],
        }
    }

    fn record(&mut self, event: AlertEvent) {
        self.total += 1;
        self.by_severity[event.severity as usize] += 1;

        // Capacity 0 retains nothing but the tallies above still count.
        if self.capacity == 0 {
            return;
        }
        while self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Owns the rule set and alert history; decides whether a sample triggers an
/// event and fans fired events out to the configured channels.
pub struct AlertManager {
    rules: RwLock<HashMap<String, AlertRule>>,
    /// Last fired timestamp per rule (unix millis), checked and updated
    /// atomically so concurrent ingests cannot double-fire within a cooldown
    last_fired: Mutex<HashMap<String, i64>>,
    history: RwLock<History>,
    channels: Vec<Arc<dyn NotificationChannel>>,
}

impl AlertManager {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            rules: RwLock::new(HashMap::new()),
            last_fired: Mutex::new(HashMap::new()),
            history: RwLock::new(History::new(history_capacity)),
            channels: Vec::new(),
        }
    }

    /// Add a notification channel (builder style, before sharing)
    pub fn with_channel(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.channels.push(channel);
        self
    }

    /// Register a rule. Names are unique.
    pub fn register_rule(&self, rule: AlertRule) -> Result<(), RuleError> {
        let mut rules = self.rules.write();
        if rules.contains_key(&rule.name) {
            return Err(RuleError::DuplicateRule(rule.name));
        }
        tracing::info!(
            rule = %rule.name,
            metric = %rule.metric_key,
            condition = %format!("{} {}", rule.comparator, rule.threshold),
            "Alert rule registered"
        );
        rules.insert(rule.name.clone(), rule);
        Ok(())
    }

    /// Remove a rule by name
    pub fn remove_rule(&self, name: &str) -> Option<AlertRule> {
        let removed = self.rules.write().remove(name);
        if removed.is_some() {
            self.last_fired.lock().remove(name);
        }
        removed
    }

    pub fn get_rule(&self, name: &str) -> Option<AlertRule> {
        self.rules.read().get(name).cloned()
    }

    pub fn list_rules(&self) -> Vec<AlertRule> {
        let mut rules: Vec<AlertRule> = self.rules.read().values().cloned().collect();
        rules.sort_by(|a, b| a.name.cmp(&b.name));
        rules
    }

    /// Evaluate every rule watching `metric_key` against a sample.
    ///
    /// Each firing rule that has cleared its cooldown produces one
    /// [`AlertEvent`], recorded in history and fanned out to every channel.
    /// Returns the events fired.
    pub async fn ingest_sample(
        &self,
        metric_key: &str,
        value: f64,
        timestamp_ms: i64,
    ) -> Vec<AlertEvent> {
        let matching: Vec<AlertRule> = {
            let rules = self.rules.read();
            rules
                .values()
                .filter(|r| r.metric_key == metric_key && r.matches(value))
                .cloned()
                .collect()
        };

        let mut fired = Vec::new();
        for rule in matching {
            // Check-and-set under one lock so a rule fires at most once per
            // cooldown even with concurrent ingests.
            {
                let mut last_fired = self.last_fired.lock();
                if let Some(last) = last_fired.get(&rule.name) {
                    let cooldown_ms = rule.cooldown_seconds as i64 * 1000;
                    if timestamp_ms - last < cooldown_ms {
                        tracing::debug!(
                            rule = %rule.name,
                            "Alert suppressed by cooldown"
                        );
                        continue;
                    }
                }
                last_fired.insert(rule.name.clone(), timestamp_ms);
            }

            let event = AlertEvent {
                timestamp: timestamp_ms,
                rule_name: rule.name.clone(),
                severity: rule.severity,
                title: format!("{} on {}", rule.name, rule.metric_key),
                message: format!(
                    "{} = {} (threshold: {} {})",
                    rule.metric_key, value, rule.comparator, rule.threshold
                ),
                metric_value: Some(value),
            };

            self.history.write().record(event.clone());
            fired.push(event);
        }

        for event in &fired {
            self.dispatch(event).await;
        }

        fired
    }

    /// Record and dispatch a synthetic event, bypassing rule evaluation.
    /// Used by the admin test-alert endpoint.
    pub async fn inject_event(
        &self,
        severity: Severity,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> AlertEvent {
        let event = AlertEvent {
            timestamp: chrono::Utc::now().timestamp_millis(),
            rule_name: "manual".to_string(),
            severity,
            title: title.into(),
            message: message.into(),
            metric_value: None,
        };

        self.history.write().record(event.clone());
        self.dispatch(&event).await;
        event
    }

    /// Send an event to every channel. Failures are logged per channel and
    /// never abort the fan-out.
    async fn dispatch(&self, event: &AlertEvent) {
        for channel in &self.channels {
            if let Err(e) = channel.send(event).await {
                tracing::error!(
                    channel = channel.name(),
                    rule = %event.rule_name,
                    error = %e,
                    "Notification channel failed"
                );
            }
        }
    }

    /// Consistent stats snapshot over the given window
    pub fn stats(&self, window: Duration) -> AlertStats {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let cutoff = now_ms - window.as_millis() as i64;

        let history = self.history.read();
        let alerts_in_window = history
            .events
            .iter()
            .filter(|e| e.timestamp >= cutoff)
            .count();

        let by_severity = Severity::ALL
            .iter()
            .map(|s| (s.as_str().to_string(), history.by_severity[*s as usize]))
            .collect();

        let recent_alerts = history
            .events
            .iter()
            .rev()
            .take(RECENT_ALERTS_SHOWN)
            .cloned()
            .collect();

        AlertStats {
            total_alerts: history.total,
            by_severity,
            alerts_in_window,
            window_secs: window.as_secs(),
            recent_alerts,
        }
    }

    /// Events currently retained, oldest first
    pub fn history(&self) -> Vec<AlertEvent> {
        self.history.read().events.iter().cloned().collect()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.read().len()
    }
}

/// Alert statistics snapshot
#[derive(Debug, Clone, Serialize)]
pub struct AlertStats {
    pub total_alerts: u64,
    pub by_severity: HashMap<String, u64>,
    pub alerts_in_window: usize,
    pub window_secs: u64,
    pub recent_alerts: Vec<AlertEvent>,
}
