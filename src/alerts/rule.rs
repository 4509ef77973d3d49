//! Alert rule types and threshold evaluation

use serde::{Deserialize, Serialize};

/// Default tolerance for `==` comparisons on non-integral values
pub const DEFAULT_EQ_TOLERANCE: f64 = 1e-9;

/// Alert severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// All severities in ascending order
    pub const ALL: [Severity; 4] = [
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }

    /// Parse from the lowercase wire form
    pub fn parse(s: &str) -> Result<Self, RuleError> {
        match s {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            "critical" => Ok(Severity::Critical),
            other => Err(RuleError::InvalidSeverity(other.to_string())),
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric comparator for threshold rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Comparator {
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
    Equal,
}

impl Comparator {
    /// Parse from the symbol form used on the wire
    pub fn parse(s: &str) -> Result<Self, RuleError> {
        match s {
            ">" => Ok(Comparator::GreaterThan),
            "<" => Ok(Comparator::LessThan),
            ">=" => Ok(Comparator::GreaterOrEqual),
            "<=" => Ok(Comparator::LessOrEqual),
            "==" => Ok(Comparator::Equal),
            other => Err(RuleError::InvalidComparator(other.to_string())),
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::GreaterThan => ">",
            Comparator::LessThan => "<",
            Comparator::GreaterOrEqual => ">=",
            Comparator::LessOrEqual => "<=",
            Comparator::Equal => "==",
        }
    }

    /// Evaluate `value <comparator> threshold` with the default tolerance
    pub fn evaluate(&self, value: f64, threshold: f64) -> bool {
        self.evaluate_with_tolerance(value, threshold, DEFAULT_EQ_TOLERANCE)
    }

    /// Evaluate with an explicit `==` tolerance.
    ///
    /// Equality is exact when both operands are integral, epsilon-tolerant
    /// otherwise.
    pub fn evaluate_with_tolerance(&self, value: f64, threshold: f64, tolerance: f64) -> bool {
        match self {
            Comparator::GreaterThan => value > threshold,
            Comparator::LessThan => value < threshold,
            Comparator::GreaterOrEqual => value >= threshold,
            Comparator::LessOrEqual => value <= threshold,
            Comparator::Equal => {
                if value.fract() == 0.0 && threshold.fract() == 0.0 {
                    value == threshold
                } else {
                    (value - threshold).abs() <= tolerance
                }
            }
        }
    }
}

impl std::fmt::Display for Comparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

impl TryFrom<String> for Comparator {
    type Error = RuleError;

    fn try_from(s: String) -> Result<Self, RuleError> {
        Comparator::parse(&s)
    }
}

impl From<Comparator> for String {
    fn from(c: Comparator) -> String {
        c.symbol().to_string()
    }
}

/// A named threshold condition over a metric.
///
/// Immutable once registered; identified by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    /// Unique rule name
    pub name: String,
    /// Metric this rule watches
    pub metric_key: String,
    /// Comparison against the threshold
    pub comparator: Comparator,
    /// Threshold value
    pub threshold: f64,
    /// Severity of events fired by this rule
    pub severity: Severity,
    /// Minimum interval between two events from this rule
    pub cooldown_seconds: u64,
}

impl AlertRule {
    /// Create a new rule, validating name and metric key
    pub fn new(
        name: impl Into<String>,
        metric_key: impl Into<String>,
        comparator: Comparator,
        threshold: f64,
        severity: Severity,
    ) -> Result<Self, RuleError> {
        let name = name.into();
        let metric_key = metric_key.into();

        if name.trim().is_empty() {
            return Err(RuleError::InvalidRule("rule name is empty".to_string()));
        }
        if metric_key.trim().is_empty() {
            return Err(RuleError::InvalidRule("metric key is empty".to_string()));
        }

        Ok(Self {
            name,
            metric_key,
            comparator,
            threshold,
            severity,
            cooldown_seconds: 60,
        })
    }

    /// Set the cooldown interval in seconds
    pub fn with_cooldown(mut self, seconds: u64) -> Self {
        self.cooldown_seconds = seconds;
        self
    }

    /// Whether a sample value satisfies this rule's condition
    pub fn matches(&self, value: f64) -> bool {
        self.comparator.evaluate(value, self.threshold)
    }
}

/// An alert fired by a rule (or injected synthetically).
///
/// Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    /// When the event fired (unix millis)
    pub timestamp: i64,
    /// Name of the rule that fired, or "manual" for injected events
    pub rule_name: String,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    /// Sample value that triggered the rule, if any
    pub metric_value: Option<f64>,
}

/// Rule validation errors
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("Rule '{0}' already registered")]
    DuplicateRule(String),

    #[error("Unrecognized comparator: '{0}'")]
    InvalidComparator(String),

    #[error("Unrecognized severity: '{0}'")]
    InvalidSeverity(String),

    #[error("Invalid rule: {0}")]
    InvalidRule(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparator_parse() {
        assert_eq!(Comparator::parse(">").unwrap(), Comparator::GreaterThan);
        assert_eq!(Comparator::parse("<=").unwrap(), Comparator::LessOrEqual);
        assert_eq!(Comparator::parse("==").unwrap(), Comparator::Equal);

        assert!(matches!(
            Comparator::parse("!="),
            Err(RuleError::InvalidComparator(_))
        ));
        assert!(matches!(
            Comparator::parse("=>"),
            Err(RuleError::InvalidComparator(_))
        ));
    }

    #[test]
    fn test_ordering_comparators() {
        assert!(Comparator::GreaterThan.evaluate(150.0, 100.0));
        assert!(!Comparator::GreaterThan.evaluate(100.0, 100.0));

        assert!(Comparator::GreaterOrEqual.evaluate(100.0, 100.0));
        assert!(Comparator::LessThan.evaluate(99.0, 100.0));
        assert!(Comparator::LessOrEqual.evaluate(100.0, 100.0));
        assert!(!Comparator::LessOrEqual.evaluate(100.1, 100.0));
    }

    #[test]
    fn test_equal_exact_for_integers() {
        assert!(Comparator::Equal.evaluate(100.0, 100.0));
        assert!(!Comparator::Equal.evaluate(100.0, 101.0));
    }

    #[test]
    fn test_equal_tolerant_for_floats() {
        // Within default tolerance
        assert!(Comparator::Equal.evaluate(0.1 + 0.2, 0.3));
        // Outside it
        assert!(!Comparator::Equal.evaluate(0.30001, 0.3));
        // Custom tolerance
        assert!(Comparator::Equal.evaluate_with_tolerance(0.30001, 0.3, 0.001));
    }

    #[test]
    fn test_rule_validation() {
        let rule = AlertRule::new(
            "high-latency",
            "latency",
            Comparator::GreaterThan,
            100.0,
            Severity::Warning,
        )
        .unwrap()
        .with_cooldown(30);

        assert_eq!(rule.cooldown_seconds, 30);
        assert!(rule.matches(150.0));
        assert!(!rule.matches(50.0));

        assert!(matches!(
            AlertRule::new("", "latency", Comparator::GreaterThan, 1.0, Severity::Info),
            Err(RuleError::InvalidRule(_))
        ));
        assert!(matches!(
            AlertRule::new("r", "  ", Comparator::GreaterThan, 1.0, Severity::Info),
            Err(RuleError::InvalidRule(_))
        ));
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!(Severity::parse("critical").unwrap(), Severity::Critical);
        assert!(matches!(
            Severity::parse("fatal"),
            Err(RuleError::InvalidSeverity(_))
        ));
    }

    #[test]
    fn test_comparator_serde_roundtrip() {
        let json = serde_json::to_string(&Comparator::GreaterOrEqual).unwrap();
        assert_eq!(json, "\">=\"");
        let back: Comparator = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Comparator::GreaterOrEqual);
    }
}
