//! Measurement records - one probe result per subject and timestamp.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// A single probe result for one subject.
///
/// A subject is a page name for the Lighthouse monitors or a function name for
/// the health monitor. Records are immutable once appended to the history.
/// The history is kept in append order, so readers sort by `timestamp`
/// before computing anything order dependent.
///
/// # Example
///
/// ```rust
/// use sitewatch_types::MeasurementRecord;
///
/// let record = MeasurementRecord::builder("contact-form")
///     .url("https://example.dev/.netlify/functions/contact")
///     .metric("responseTime", 420.0)
///     .build();
///
/// assert!(record.is_success());
/// assert_eq!(record.metric("responseTime"), Some(420.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct MeasurementRecord {
    /// The entity being measured.
    pub subject: String,

    /// Where the probe pointed, when known.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub url: Option<String>,

    /// When the probe ran.
    pub timestamp: DateTime<Utc>,

    /// Named numeric measurements (milliseconds, unitless shift scores, ...).
    ///
    /// Non-numeric and non-finite values in a state file are dropped on load.
    #[cfg_attr(
        feature = "serde",
        serde(default, deserialize_with = "lenient::metrics")
    )]
    pub metrics: BTreeMap<String, f64>,

    /// Category scores in 0..=100, `None` when the audit could not score it.
    #[cfg_attr(
        feature = "serde",
        serde(default, deserialize_with = "lenient::scores")
    )]
    pub scores: BTreeMap<String, Option<u8>>,

    /// Set when the probe itself failed.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub error: Option<String>,
}

impl MeasurementRecord {
    /// Create an empty record for `subject` stamped with the current time.
    pub fn new(subject: impl Into<String>) -> Self {
        Self::with_timestamp(subject, Utc::now())
    }

    /// Create an empty record with a specific timestamp.
    pub fn with_timestamp(subject: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            subject: subject.into(),
            url: None,
            timestamp,
            metrics: BTreeMap::new(),
            scores: BTreeMap::new(),
            error: None,
        }
    }

    /// Create a builder for a record about `subject`.
    pub fn builder(subject: impl Into<String>) -> MeasurementRecordBuilder {
        MeasurementRecordBuilder::new(subject)
    }

    /// Record a failed probe.
    pub fn failure(
        subject: impl Into<String>,
        timestamp: DateTime<Utc>,
        error: impl Into<String>,
    ) -> Self {
        let mut record = Self::with_timestamp(subject, timestamp);
        record.error = Some(error.into());
        record
    }

    /// Whether the probe that produced this record succeeded.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Look up a finite metric value.
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied().filter(|v| v.is_finite())
    }

    /// Look up a category score, flattening "missing" and "unscored".
    pub fn score(&self, category: &str) -> Option<u8> {
        self.scores.get(category).copied().flatten()
    }

    /// Whether any category carries a score.
    pub fn has_scores(&self) -> bool {
        self.scores.values().any(Option::is_some)
    }
}

/// Builder for `MeasurementRecord`.
#[derive(Debug)]
pub struct MeasurementRecordBuilder {
    record: MeasurementRecord,
}

impl MeasurementRecordBuilder {
    /// Create a new builder stamped with the current time.
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            record: MeasurementRecord::new(subject),
        }
    }

    /// Set the probe URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.record.url = Some(url.into());
        self
    }

    /// Set the timestamp.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.record.timestamp = timestamp;
        self
    }

    /// Add a metric value.
    pub fn metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.record.metrics.insert(name.into(), value);
        self
    }

    /// Add a category score.
    pub fn score(mut self, category: impl Into<String>, score: Option<u8>) -> Self {
        self.record.scores.insert(category.into(), score);
        self
    }

    /// Mark the probe as failed.
    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.record.error = Some(error.into());
        self
    }

    /// Build the record.
    pub fn build(self) -> MeasurementRecord {
        self.record
    }
}

#[cfg(feature = "serde")]
mod lenient {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Value {
        Number(f64),
        Other(serde::de::IgnoredAny),
    }

    pub fn metrics<'de, D>(deserializer: D) -> Result<BTreeMap<String, f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .filter_map(|(name, value)| match value {
                Value::Number(n) if n.is_finite() => Some((name, n)),
                _ => None,
            })
            .collect())
    }

    pub fn scores<'de, D>(deserializer: D) -> Result<BTreeMap<String, Option<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|(category, value)| {
                let score = match value {
                    Value::Number(n) if (0.0..=100.0).contains(&n) => Some(n.round() as u8),
                    _ => None,
                };
                (category, score)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn builder_sets_all_fields() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let record = MeasurementRecord::builder("home")
            .url("https://example.dev/")
            .timestamp(at)
            .metric("lcp", 2100.0)
            .score("performance", Some(93))
            .score("seo", None)
            .build();

        assert_eq!(record.subject, "home");
        assert_eq!(record.url.as_deref(), Some("https://example.dev/"));
        assert_eq!(record.timestamp, at);
        assert_eq!(record.metric("lcp"), Some(2100.0));
        assert_eq!(record.score("performance"), Some(93));
        assert_eq!(record.score("seo"), None);
        assert!(record.has_scores());
        assert!(record.is_success());
    }

    #[test]
    fn metric_ignores_non_finite_values() {
        let record = MeasurementRecord::builder("home").metric("lcp", f64::NAN).build();
        assert_eq!(record.metric("lcp"), None);
    }

    #[test]
    fn failure_record_has_no_measurements() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let record = MeasurementRecord::failure("home", at, "lighthouse timed out");
        assert!(!record.is_success());
        assert!(record.metrics.is_empty());
        assert!(!record.has_scores());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize_skips_malformed_values() {
        let json = r#"{
            "subject": "home",
            "timestamp": "2024-05-01T12:00:00Z",
            "metrics": { "lcp": 2400, "cls": "n/a", "fcp": null },
            "scores": { "performance": 91, "seo": null, "accessibility": 140 },
            "unknownField": true
        }"#;

        let record: MeasurementRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.metrics.len(), 1);
        assert_eq!(record.metric("lcp"), Some(2400.0));
        assert_eq!(record.score("performance"), Some(91));
        assert_eq!(record.scores.get("seo"), Some(&None));
        assert_eq!(record.score("accessibility"), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serialize_uses_camel_case_and_omits_empty_options() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let record = MeasurementRecord::builder("home")
            .timestamp(at)
            .metric("speedIndex", 3000.0)
            .build();

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["timestamp"], "2024-05-01T12:00:00Z");
        assert_eq!(value["metrics"]["speedIndex"], 3000.0);
        assert!(value.get("error").is_none());
        assert!(value.get("url").is_none());
    }
}
