//! Threshold tables.
//!
//! Loaded once per process (defaults, then configuration overrides) and
//! never mutated afterwards.

use std::collections::BTreeMap;

use sitewatch_types::{MetricThreshold, ScoreThreshold};
use tracing::warn;

/// Lighthouse categories tracked by the score monitor.
pub const SCORE_CATEGORIES: &[&str] = &["performance", "accessibility", "best-practices", "seo"];

/// Default minimum for every tracked category.
pub const DEFAULT_SCORE_MINIMUM: u8 = 90;

/// Default point drop between consecutive runs that raises a trend alert.
pub const DEFAULT_SCORE_DROP: u8 = 10;

/// Thresholds for rating measurements.
///
/// Timing metrics and category scores are kept in separate tables because
/// they rate in opposite directions.
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    /// Lower-is-better metric thresholds keyed by metric name.
    pub metrics: BTreeMap<String, MetricThreshold>,
    /// Higher-is-better score minimums keyed by category.
    pub scores: BTreeMap<String, ScoreThreshold>,
    /// Drop in points since the previous run that counts as degrading.
    pub score_drop: u8,
}

impl Default for Thresholds {
    fn default() -> Self {
        let metrics = [
            MetricThreshold::new("lcp", 2500.0, 4000.0, "ms"),
            MetricThreshold::new("fcp", 1800.0, 3000.0, "ms"),
            MetricThreshold::new("cls", 0.1, 0.25, "score"),
            MetricThreshold::new("fid", 100.0, 300.0, "ms"),
            MetricThreshold::new("inp", 200.0, 500.0, "ms"),
            MetricThreshold::new("ttfb", 800.0, 1800.0, "ms"),
            MetricThreshold::new("tbt", 200.0, 600.0, "ms"),
            MetricThreshold::new("speedIndex", 3400.0, 5800.0, "ms"),
            MetricThreshold::new("responseTime", 1000.0, 3000.0, "ms"),
        ]
        .into_iter()
        .map(|t| (t.metric.clone(), t))
        .collect();

        let scores = SCORE_CATEGORIES
            .iter()
            .map(|c| (c.to_string(), ScoreThreshold::new(*c, DEFAULT_SCORE_MINIMUM)))
            .collect();

        Self {
            metrics,
            scores,
            score_drop: DEFAULT_SCORE_DROP,
        }
    }
}

impl Thresholds {
    /// Look up the threshold for a metric.
    pub fn metric(&self, name: &str) -> Option<&MetricThreshold> {
        self.metrics.get(name)
    }

    /// Look up the minimum for a score category.
    pub fn score(&self, category: &str) -> Option<&ScoreThreshold> {
        self.scores.get(category)
    }

    /// Add or replace a metric threshold. Inverted bands are rejected.
    pub fn set_metric(&mut self, threshold: MetricThreshold) -> bool {
        let valid = threshold.good.is_finite()
            && threshold.needs_improvement.is_finite()
            && threshold.good <= threshold.needs_improvement;
        if !valid {
            warn!(
                "Ignoring threshold for {}: good ({}) must not exceed needsImprovement ({})",
                threshold.metric, threshold.good, threshold.needs_improvement
            );
            return false;
        }
        self.metrics.insert(threshold.metric.clone(), threshold);
        true
    }

    /// Add or replace a score minimum. Minimums above 100 are rejected.
    pub fn set_score(&mut self, threshold: ScoreThreshold) -> bool {
        if threshold.minimum > 100 {
            warn!(
                "Ignoring score minimum for {}: {} is above 100",
                threshold.category, threshold.minimum
            );
            return false;
        }
        self.scores.insert(threshold.category.clone(), threshold);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let t = Thresholds::default();
        let lcp = t.metric("lcp").unwrap();
        assert_eq!(lcp.good, 2500.0);
        assert_eq!(lcp.needs_improvement, 4000.0);
        assert_eq!(lcp.unit, "ms");
        assert_eq!(t.metric("cls").unwrap().unit, "score");
        assert!(t.metric("responseTime").is_some());
        assert!(t.metric("unknown").is_none());

        assert_eq!(t.scores.len(), 4);
        assert_eq!(t.score("seo").unwrap().minimum, 90);
        assert_eq!(t.score_drop, 10);
    }

    #[test]
    fn test_set_metric_rejects_inverted_band() {
        let mut t = Thresholds::default();
        assert!(!t.set_metric(MetricThreshold::new("lcp", 5000.0, 4000.0, "ms")));
        assert_eq!(t.metric("lcp").unwrap().good, 2500.0);

        assert!(t.set_metric(MetricThreshold::new("lcp", 2000.0, 3500.0, "ms")));
        assert_eq!(t.metric("lcp").unwrap().good, 2000.0);
    }

    #[test]
    fn test_set_score_rejects_out_of_range() {
        let mut t = Thresholds::default();
        assert!(!t.set_score(ScoreThreshold::new("seo", 120)));
        assert!(t.set_score(ScoreThreshold::new("pwa", 50)));
        assert_eq!(t.score("pwa").unwrap().minimum, 50);
    }
}
