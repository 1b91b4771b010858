//! Trend analysis over measurement history.
//!
//! Groups the history by subject and metric, sorts each series by timestamp
//! and reduces it to a [`TrendResult`]. Results that are poor or degrading
//! become candidate alerts for the decision engine.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sitewatch_types::{
    Alert, AlertType, MeasurementRecord, MetricThreshold, Monitor, Rating, Severity, Trend,
};

use super::recommend::{recommend, Recommendation};
use super::thresholds::Thresholds;

/// Number of most recent samples the trend is computed over.
pub const TREND_WINDOW: usize = 3;

/// Statistics for one metric of one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendResult {
    pub subject: String,
    pub metric: String,
    pub latest: f64,
    /// Mean of all samples, rounded to 2 decimals.
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub rating: Rating,
    pub trend: Trend,
    /// Percentage change across the trend window, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_percent: Option<f64>,
    pub sample_count: usize,
}

/// Output of [`analyze`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub generated_at: Option<DateTime<Utc>>,
    /// metric -> subject -> result
    pub metrics: BTreeMap<String, BTreeMap<String, TrendResult>>,
    /// Candidate alerts, in subject then metric order.
    pub alerts: Vec<Alert>,
    pub recommendations: Vec<Recommendation>,
}

impl Analysis {
    /// All results in subject then metric order.
    pub fn results(&self) -> Vec<&TrendResult> {
        let mut results: Vec<&TrendResult> =
            self.metrics.values().flat_map(|by_subject| by_subject.values()).collect();
        results.sort_by(|a, b| a.subject.cmp(&b.subject).then_with(|| a.metric.cmp(&b.metric)));
        results
    }

    /// Count of results per rating.
    pub fn rating_counts(&self) -> BTreeMap<Rating, usize> {
        let mut counts = BTreeMap::new();
        for result in self.metrics.values().flat_map(|m| m.values()) {
            *counts.entry(result.rating).or_insert(0) += 1;
        }
        counts
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Analyze `records` for `monitor`.
///
/// Only metrics present in the threshold table are considered; missing and
/// non-finite values are skipped per record. Each series is sorted by
/// timestamp (ties by value) first, so the result does not depend on the
/// order records were appended in.
pub fn analyze(
    records: &[MeasurementRecord],
    thresholds: &Thresholds,
    monitor: Monitor,
    now: DateTime<Utc>,
) -> Analysis {
    // subject -> metric -> (timestamp, value)
    let mut series: BTreeMap<&str, BTreeMap<&str, Vec<(DateTime<Utc>, f64)>>> = BTreeMap::new();
    for record in records {
        for name in record.metrics.keys() {
            let Some(value) = record.metric(name) else {
                continue;
            };
            if thresholds.metric(name).is_none() {
                continue;
            }
            series
                .entry(record.subject.as_str())
                .or_default()
                .entry(name.as_str())
                .or_default()
                .push((record.timestamp, value));
        }
    }

    let mut analysis = Analysis {
        generated_at: Some(now),
        ..Default::default()
    };

    for (subject, metrics) in series {
        for (metric, mut samples) in metrics {
            let Some(threshold) = thresholds.metric(metric) else {
                continue;
            };
            samples.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.total_cmp(&b.1)));
            let values: Vec<f64> = samples.into_iter().map(|(_, v)| v).collect();

            let Some(result) = summarize(subject, metric, &values, threshold) else {
                continue;
            };

            if let Some(alert) = candidate(&result, threshold, monitor, now) {
                analysis.alerts.push(alert);
            }
            analysis
                .metrics
                .entry(metric.to_string())
                .or_default()
                .insert(subject.to_string(), result);
        }
    }

    analysis.recommendations = recommend(&analysis.metrics);
    analysis
}

/// Reduce a timestamp-sorted series to a trend result.
pub fn summarize(
    subject: &str,
    metric: &str,
    values: &[f64],
    threshold: &MetricThreshold,
) -> Option<TrendResult> {
    let latest = *values.last()?;
    let sum: f64 = values.iter().sum();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let change_percent = window_change(values);
    let trend = change_percent.map_or(Trend::Stable, Trend::from_percent_change);

    Some(TrendResult {
        subject: subject.to_string(),
        metric: metric.to_string(),
        latest,
        average: round2(sum / values.len() as f64),
        min,
        max,
        rating: threshold.rate(latest),
        trend,
        change_percent: change_percent.map(round2),
        sample_count: values.len(),
    })
}

/// Percentage change between the oldest and newest of the last
/// [`TREND_WINDOW`] samples. `None` for short series or a zero baseline.
fn window_change(values: &[f64]) -> Option<f64> {
    if values.len() < TREND_WINDOW {
        return None;
    }
    let window = &values[values.len() - TREND_WINDOW..];
    let oldest = window[0];
    let newest = window[TREND_WINDOW - 1];
    if oldest == 0.0 {
        return None;
    }
    Some((newest - oldest) / oldest * 100.0)
}

/// Candidate alert for a result that is poor or degrading.
fn candidate(
    result: &TrendResult,
    threshold: &MetricThreshold,
    monitor: Monitor,
    now: DateTime<Utc>,
) -> Option<Alert> {
    let poor = result.rating == Rating::Poor;
    let degrading = result.trend == Trend::Degrading;
    if !poor && !degrading {
        return None;
    }

    let alert_type = match (monitor, poor) {
        (Monitor::Functions, _) => AlertType::Performance,
        (_, true) => AlertType::Threshold,
        (_, false) => AlertType::Trend,
    };

    let (severity, limit, message) = if poor {
        (
            Severity::Critical,
            threshold.needs_improvement,
            format!(
                "{} is poor on {}: {} (limit {})",
                result.metric,
                result.subject,
                threshold.format_value(result.latest),
                threshold.format_value(threshold.needs_improvement)
            ),
        )
    } else {
        (
            Severity::Warning,
            threshold.good,
            format!(
                "{} is degrading on {}: {:+.1}% over the last {} runs (now {})",
                result.metric,
                result.subject,
                result.change_percent.unwrap_or_default(),
                TREND_WINDOW,
                threshold.format_value(result.latest)
            ),
        )
    };

    Some(
        Alert::builder(alert_type, monitor)
            .subject(&result.subject)
            .category(&result.metric)
            .value(result.latest)
            .threshold(limit)
            .severity(severity)
            .message(message)
            .build_at(now),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap()
    }

    fn record(subject: &str, minute: u32, metric: &str, value: f64) -> MeasurementRecord {
        MeasurementRecord::builder(subject)
            .timestamp(at(minute))
            .metric(metric, value)
            .build()
    }

    fn lcp_history() -> Vec<MeasurementRecord> {
        vec![
            record("home", 1, "lcp", 2000.0),
            record("home", 2, "lcp", 2600.0),
            record("home", 3, "lcp", 3000.0),
        ]
    }

    #[test]
    fn test_lcp_scenario_degrading_warning() {
        let thresholds = Thresholds::default();
        let analysis = analyze(&lcp_history(), &thresholds, Monitor::Vitals, now());

        let result = &analysis.metrics["lcp"]["home"];
        assert_eq!(result.latest, 3000.0);
        assert_eq!(result.average, 2533.33);
        assert_eq!(result.min, 2000.0);
        assert_eq!(result.max, 3000.0);
        assert_eq!(result.rating, Rating::NeedsImprovement);
        assert_eq!(result.trend, Trend::Degrading);
        assert_eq!(result.change_percent, Some(50.0));
        assert_eq!(result.sample_count, 3);

        assert_eq!(analysis.alerts.len(), 1);
        let alert = &analysis.alerts[0];
        assert_eq!(alert.alert_type, AlertType::Trend);
        assert_eq!(alert.severity, Severity::Warning);
        assert_eq!(alert.subject.as_deref(), Some("home"));
        assert_eq!(alert.category, "lcp");
        assert_eq!(alert.threshold, Some(2500.0));
    }

    #[test]
    fn test_ratings_per_prefix_of_scenario() {
        let t = Thresholds::default();
        let lcp = t.metric("lcp").unwrap();
        let ratings: Vec<Rating> = [2000.0, 2600.0, 3000.0].iter().map(|v| lcp.rate(*v)).collect();
        assert_eq!(
            ratings,
            vec![Rating::Good, Rating::NeedsImprovement, Rating::NeedsImprovement]
        );
    }

    #[test]
    fn test_analysis_is_independent_of_record_order() {
        let thresholds = Thresholds::default();
        let mut shuffled = lcp_history();
        shuffled.push(record("blog", 4, "cls", 0.3));
        shuffled.push(record("blog", 2, "cls", 0.05));
        shuffled.push(record("blog", 3, "cls", 0.05));

        let sorted = {
            let mut s = shuffled.clone();
            s.sort_by_key(|r| r.timestamp);
            s
        };
        shuffled.swap(0, 2);
        shuffled.reverse();

        let a = analyze(&sorted, &thresholds, Monitor::Vitals, now());
        let b = analyze(&shuffled, &thresholds, Monitor::Vitals, now());
        assert_eq!(a.metrics, b.metrics);
        assert_eq!(a.alerts, b.alerts);
    }

    #[test]
    fn test_poor_rating_is_critical_threshold_alert() {
        let history = vec![record("home", 1, "lcp", 4500.0)];
        let analysis = analyze(&history, &Thresholds::default(), Monitor::Vitals, now());

        let result = &analysis.metrics["lcp"]["home"];
        assert_eq!(result.rating, Rating::Poor);
        assert_eq!(result.trend, Trend::Stable);

        let alert = &analysis.alerts[0];
        assert_eq!(alert.alert_type, AlertType::Threshold);
        assert_eq!(alert.severity, Severity::Critical);
        assert_eq!(alert.threshold, Some(4000.0));
        assert_eq!(alert.message, "lcp is poor on home: 4500ms (limit 4000ms)");
    }

    #[test]
    fn test_short_series_is_stable() {
        let history = vec![record("home", 1, "lcp", 1000.0), record("home", 2, "lcp", 2400.0)];
        let analysis = analyze(&history, &Thresholds::default(), Monitor::Vitals, now());
        let result = &analysis.metrics["lcp"]["home"];
        assert_eq!(result.trend, Trend::Stable);
        assert_eq!(result.change_percent, None);
        assert!(analysis.alerts.is_empty());
    }

    #[test]
    fn test_trend_uses_only_last_three_samples() {
        let history = vec![
            record("home", 1, "lcp", 500.0),
            record("home", 2, "lcp", 2000.0),
            record("home", 3, "lcp", 2100.0),
            record("home", 4, "lcp", 2050.0),
        ];
        let analysis = analyze(&history, &Thresholds::default(), Monitor::Vitals, now());
        let result = &analysis.metrics["lcp"]["home"];
        assert_eq!(result.trend, Trend::Stable);
        assert_eq!(result.change_percent, Some(2.5));
    }

    #[test]
    fn test_improving_trend() {
        let history = vec![
            record("home", 1, "tbt", 500.0),
            record("home", 2, "tbt", 400.0),
            record("home", 3, "tbt", 150.0),
        ];
        let analysis = analyze(&history, &Thresholds::default(), Monitor::Vitals, now());
        assert_eq!(analysis.metrics["tbt"]["home"].trend, Trend::Improving);
        assert!(analysis.alerts.is_empty());
        assert_eq!(analysis.recommendations.len(), 1);
    }

    #[test]
    fn test_zero_baseline_is_stable() {
        let history = vec![
            record("home", 1, "cls", 0.0),
            record("home", 2, "cls", 0.01),
            record("home", 3, "cls", 0.02),
        ];
        let analysis = analyze(&history, &Thresholds::default(), Monitor::Vitals, now());
        assert_eq!(analysis.metrics["cls"]["home"].trend, Trend::Stable);
    }

    #[test]
    fn test_unknown_metrics_and_bad_values_are_skipped() {
        let mut bad = record("home", 2, "lcp", f64::NAN);
        bad.metrics.insert("statusCode".into(), 200.0);
        let history = vec![record("home", 1, "lcp", 1000.0), bad, record("home", 3, "custom", 1.0)];

        let analysis = analyze(&history, &Thresholds::default(), Monitor::Vitals, now());
        assert_eq!(analysis.metrics.len(), 1);
        assert_eq!(analysis.metrics["lcp"]["home"].sample_count, 1);
    }

    #[test]
    fn test_function_monitor_raises_performance_alerts() {
        let history = vec![record("contact", 1, "responseTime", 3500.0)];
        let analysis = analyze(&history, &Thresholds::default(), Monitor::Functions, now());
        let alert = &analysis.alerts[0];
        assert_eq!(alert.alert_type, AlertType::Performance);
        assert_eq!(alert.monitor, Monitor::Functions);
        assert_eq!(alert.severity, Severity::Critical);
    }

    #[test]
    fn test_alerts_follow_subject_then_metric_order() {
        let history = vec![
            record("home", 1, "lcp", 5000.0),
            record("blog", 1, "tbt", 900.0),
            record("blog", 1, "cls", 0.5),
        ];
        let analysis = analyze(&history, &Thresholds::default(), Monitor::Vitals, now());
        let order: Vec<(String, String)> = analysis
            .alerts
            .iter()
            .map(|a| (a.subject_label().to_string(), a.category.clone()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("blog".to_string(), "cls".to_string()),
                ("blog".to_string(), "tbt".to_string()),
                ("home".to_string(), "lcp".to_string()),
            ]
        );
    }

    #[test]
    fn test_rating_counts() {
        let history = vec![
            record("home", 1, "lcp", 5000.0),
            record("blog", 1, "lcp", 1000.0),
            record("blog", 1, "cls", 0.2),
        ];
        let analysis = analyze(&history, &Thresholds::default(), Monitor::Vitals, now());
        let counts = analysis.rating_counts();
        assert_eq!(counts[&Rating::Poor], 1);
        assert_eq!(counts[&Rating::Good], 1);
        assert_eq!(counts[&Rating::NeedsImprovement], 1);
    }
}
