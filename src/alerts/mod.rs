//! Threshold alerting over ingested metric samples
//!
//! Rules map a metric sample to a fire/no-fire decision; the manager owns
//! the rule set, enforces per-rule cooldowns, keeps a bounded event history,
//! and fans fired events out to notification channels.

pub mod channel;
pub mod manager;
pub mod rule;

pub use channel::{ChannelError, EmailChannel, LogChannel, NotificationChannel, WebhookChannel};
pub use manager::{AlertManager, AlertStats};
pub use rule::{AlertEvent, AlertRule, Comparator, RuleError, Severity};
