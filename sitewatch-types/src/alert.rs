//! Alert records and their classification enums.

use chrono::{DateTime, Utc};

/// Kind of condition an alert reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum AlertType {
    /// A value crossed its threshold.
    Threshold,
    /// A metric moved the wrong way over the trend window.
    Trend,
    /// A probe failed to run.
    Error,
    Critical,
    Warning,
    /// A function responded, but slowly.
    Performance,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Threshold => "threshold",
            AlertType::Trend => "trend",
            AlertType::Error => "error",
            AlertType::Critical => "critical",
            AlertType::Warning => "warning",
            AlertType::Performance => "performance",
        }
    }
}

/// How urgent an alert is. Ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    /// Returns a short symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARN",
            Severity::Critical => "CRIT",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

/// The monitor that raised an alert.
///
/// Resolution only considers alerts of the monitor being evaluated, so a
/// function health run never closes a Lighthouse alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Monitor {
    /// Lighthouse category scores.
    Scores,
    /// Core Web Vitals timings.
    Vitals,
    /// Serverless function health.
    Functions,
}

impl Monitor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Monitor::Scores => "scores",
            Monitor::Vitals => "vitals",
            Monitor::Functions => "functions",
        }
    }
}

/// An alert raised by analysis.
///
/// Alerts are never deleted. The sink fills in the issue fields, a human (or
/// a later run that no longer sees the condition) sets `resolved`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Alert {
    pub id: String,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub alert_type: AlertType,
    pub monitor: Monitor,
    /// `None` for global alerts.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub subject: Option<String>,
    /// Metric or score category the alert is about.
    pub category: String,
    pub value: Option<f64>,
    pub threshold: Option<f64>,
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub resolved: bool,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub resolved_at: Option<DateTime<Utc>>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub acknowledged: bool,
    /// Whether at least one sink channel accepted the alert.
    #[cfg_attr(feature = "serde", serde(default))]
    pub delivered: bool,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub issue_number: Option<u64>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub issue_url: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub issue_created_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// Create a builder for an alert.
    pub fn builder(alert_type: AlertType, monitor: Monitor) -> AlertBuilder {
        AlertBuilder::new(alert_type, monitor)
    }

    /// Cooldown key: `type:subject`, or just `type` for global alerts.
    pub fn cooldown_key(&self) -> String {
        match &self.subject {
            Some(subject) => format!("{}:{}", self.alert_type.as_str(), subject),
            None => self.alert_type.as_str().to_string(),
        }
    }

    /// Whether the alert is still open.
    pub fn is_open(&self) -> bool {
        !self.resolved
    }

    /// Whether two alerts describe the same (monitor, subject, category).
    pub fn same_condition(&self, other: &Alert) -> bool {
        self.monitor == other.monitor
            && self.subject == other.subject
            && self.category == other.category
    }

    /// Subject for display, `global` when absent.
    pub fn subject_label(&self) -> &str {
        self.subject.as_deref().unwrap_or("global")
    }

    /// A one-line title suitable for an issue or chat message.
    pub fn title(&self) -> String {
        format!(
            "[{}] {} {} on {}",
            self.severity.symbol(),
            self.category,
            self.alert_type.as_str(),
            self.subject_label()
        )
    }

    /// Mark the alert resolved at `at`.
    pub fn resolve(&mut self, at: DateTime<Utc>) {
        self.resolved = true;
        self.resolved_at = Some(at);
    }
}

/// Builder for `Alert`.
#[derive(Debug)]
pub struct AlertBuilder {
    alert_type: AlertType,
    monitor: Monitor,
    subject: Option<String>,
    category: String,
    value: Option<f64>,
    threshold: Option<f64>,
    severity: Severity,
    message: Option<String>,
}

impl AlertBuilder {
    /// Create a new builder. Severity defaults to warning.
    pub fn new(alert_type: AlertType, monitor: Monitor) -> Self {
        Self {
            alert_type,
            monitor,
            subject: None,
            category: String::new(),
            value: None,
            threshold: None,
            severity: Severity::Warning,
            message: None,
        }
    }

    /// Set the subject. Leave unset for a global alert.
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the metric or score category.
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Set the observed value.
    pub fn value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    /// Set the threshold the value was compared against.
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Set the severity.
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Set the human-readable message.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Build the alert stamped with `timestamp`.
    pub fn build_at(self, timestamp: DateTime<Utc>) -> Alert {
        let subject_part = self.subject.as_deref().unwrap_or("global");
        let id = format!(
            "{}-{}-{}-{}",
            self.monitor.as_str(),
            subject_part,
            self.category,
            timestamp.timestamp_millis()
        );
        let message = self.message.unwrap_or_else(|| {
            format!(
                "{} {} on {}",
                self.category,
                self.alert_type.as_str(),
                subject_part
            )
        });

        Alert {
            id,
            alert_type: self.alert_type,
            monitor: self.monitor,
            subject: self.subject,
            category: self.category,
            value: self.value,
            threshold: self.threshold,
            severity: self.severity,
            message,
            timestamp,
            resolved: false,
            resolved_at: None,
            acknowledged: false,
            delivered: false,
            issue_number: None,
            issue_url: None,
            issue_created_at: None,
        }
    }

    /// Build the alert stamped with the current time.
    pub fn build(self) -> Alert {
        self.build_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn cooldown_key_includes_subject() {
        let alert = Alert::builder(AlertType::Threshold, Monitor::Vitals)
            .subject("home")
            .category("lcp")
            .build_at(at());
        assert_eq!(alert.cooldown_key(), "threshold:home");
    }

    #[test]
    fn cooldown_key_for_global_alert_is_type_only() {
        let alert = Alert::builder(AlertType::Error, Monitor::Scores)
            .category("audit")
            .build_at(at());
        assert_eq!(alert.cooldown_key(), "error");
        assert_eq!(alert.subject_label(), "global");
    }

    #[test]
    fn builder_defaults() {
        let alert = Alert::builder(AlertType::Trend, Monitor::Vitals)
            .subject("blog")
            .category("cls")
            .build_at(at());
        assert_eq!(alert.severity, Severity::Warning);
        assert!(alert.is_open());
        assert!(!alert.acknowledged);
        assert!(!alert.delivered);
        assert_eq!(alert.message, "cls trend on blog");
        assert!(alert.id.starts_with("vitals-blog-cls-"));
    }

    #[test]
    fn same_condition_ignores_type_and_severity() {
        let a = Alert::builder(AlertType::Threshold, Monitor::Vitals)
            .subject("home")
            .category("lcp")
            .severity(Severity::Critical)
            .build_at(at());
        let b = Alert::builder(AlertType::Trend, Monitor::Vitals)
            .subject("home")
            .category("lcp")
            .build_at(at());
        let c = Alert::builder(AlertType::Trend, Monitor::Scores)
            .subject("home")
            .category("lcp")
            .build_at(at());
        assert!(a.same_condition(&b));
        assert!(!a.same_condition(&c));
    }

    #[test]
    fn resolve_sets_timestamp() {
        let mut alert = Alert::builder(AlertType::Threshold, Monitor::Scores)
            .subject("home")
            .category("seo")
            .build_at(at());
        alert.resolve(at());
        assert!(!alert.is_open());
        assert_eq!(alert.resolved_at, Some(at()));
    }

    #[test]
    fn severity_orders_by_urgency() {
        assert!(Severity::Critical > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn alert_round_trips_through_json() {
        let alert = Alert::builder(AlertType::Performance, Monitor::Functions)
            .subject("contact")
            .category("responseTime")
            .value(3400.0)
            .threshold(1000.0)
            .severity(Severity::Warning)
            .build_at(at());

        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["type"], "performance");
        assert_eq!(json["monitor"], "functions");
        assert_eq!(json["severity"], "warning");
        assert!(json.get("issueNumber").is_none());

        let back: Alert = serde_json::from_value(json).unwrap();
        assert_eq!(back, alert);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn unknown_severity_is_rejected() {
        let json = r#"{
            "id": "x", "type": "threshold", "monitor": "vitals", "category": "lcp",
            "value": null, "threshold": null, "severity": "apocalyptic",
            "message": "m", "timestamp": "2024-05-01T12:00:00Z"
        }"#;
        assert!(serde_json::from_str::<Alert>(json).is_err());
    }
}
