//! Threshold variants and the judgments derived from them.
//!
//! Timing metrics and category scores point in opposite directions, so they
//! get separate threshold types instead of one comparator with a direction
//! flag.

use crate::Severity;

/// Percentage change over the trend window that counts as movement.
pub const TREND_CHANGE_PERCENT: f64 = 10.0;

/// Scores below this are critical regardless of the category minimum.
pub const SCORE_CRITICAL_BELOW: u8 = 70;

/// Scores below this (and at or above the critical band) are warnings.
pub const SCORE_WARNING_BELOW: u8 = 85;

/// Categorical judgment of a metric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum Rating {
    Good,
    NeedsImprovement,
    Poor,
}

impl Rating {
    /// Returns a short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Rating::Good => "good",
            Rating::NeedsImprovement => "needs improvement",
            Rating::Poor => "poor",
        }
    }
}

/// Short-window direction of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum Trend {
    Improving,
    Degrading,
    Stable,
}

impl Trend {
    /// Classify a percentage change of a lower-is-better metric.
    pub fn from_percent_change(percent: f64) -> Self {
        if percent > TREND_CHANGE_PERCENT {
            Trend::Degrading
        } else if percent < -TREND_CHANGE_PERCENT {
            Trend::Improving
        } else {
            Trend::Stable
        }
    }

    /// Returns an arrow for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            Trend::Improving => "↓",
            Trend::Degrading => "↑",
            Trend::Stable => "→",
        }
    }
}

/// Threshold for a metric where lower values are better (latency, layout shift).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct MetricThreshold {
    pub metric: String,
    /// Values at or below this are good.
    pub good: f64,
    /// Values above `good` and at or below this need improvement.
    pub needs_improvement: f64,
    pub unit: String,
}

impl MetricThreshold {
    pub fn new(
        metric: impl Into<String>,
        good: f64,
        needs_improvement: f64,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            metric: metric.into(),
            good,
            needs_improvement,
            unit: unit.into(),
        }
    }

    /// Rate a value against this threshold.
    pub fn rate(&self, value: f64) -> Rating {
        if value > self.needs_improvement {
            Rating::Poor
        } else if value > self.good {
            Rating::NeedsImprovement
        } else {
            Rating::Good
        }
    }

    /// Format a value with this metric's unit.
    pub fn format_value(&self, value: f64) -> String {
        if self.unit == "ms" {
            format!("{:.0}ms", value)
        } else {
            format!("{:.3}", value)
        }
    }
}

/// Threshold for a category score where higher is better.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ScoreThreshold {
    pub category: String,
    pub minimum: u8,
}

impl ScoreThreshold {
    pub fn new(category: impl Into<String>, minimum: u8) -> Self {
        Self {
            category: category.into(),
            minimum,
        }
    }

    /// Whether a score meets the minimum.
    pub fn passes(&self, score: u8) -> bool {
        score >= self.minimum
    }

    /// Severity of a score below the minimum, `None` when it passes.
    pub fn severity(&self, score: u8) -> Option<Severity> {
        if self.passes(score) {
            None
        } else if score < SCORE_CRITICAL_BELOW {
            Some(Severity::Critical)
        } else if score < SCORE_WARNING_BELOW {
            Some(Severity::Warning)
        } else {
            Some(Severity::Info)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lcp() -> MetricThreshold {
        MetricThreshold::new("lcp", 2500.0, 4000.0, "ms")
    }

    #[test]
    fn rating_boundaries_are_inclusive_on_the_lower_band() {
        let t = lcp();
        assert_eq!(t.rate(0.0), Rating::Good);
        assert_eq!(t.rate(2500.0), Rating::Good);
        assert_eq!(t.rate(2500.1), Rating::NeedsImprovement);
        assert_eq!(t.rate(4000.0), Rating::NeedsImprovement);
        assert_eq!(t.rate(4000.1), Rating::Poor);
    }

    #[test]
    fn rating_orders_by_badness() {
        assert!(Rating::Poor > Rating::NeedsImprovement);
        assert!(Rating::NeedsImprovement > Rating::Good);
    }

    #[test]
    fn trend_from_percent_change() {
        assert_eq!(Trend::from_percent_change(50.0), Trend::Degrading);
        assert_eq!(Trend::from_percent_change(10.0), Trend::Stable);
        assert_eq!(Trend::from_percent_change(-10.0), Trend::Stable);
        assert_eq!(Trend::from_percent_change(-10.5), Trend::Improving);
    }

    #[test]
    fn score_severity_bands() {
        let t = ScoreThreshold::new("performance", 90);
        assert_eq!(t.severity(65), Some(Severity::Critical));
        assert_eq!(t.severity(82), Some(Severity::Warning));
        assert_eq!(t.severity(88), Some(Severity::Info));
        assert_eq!(t.severity(90), None);
        assert_eq!(t.severity(100), None);
    }

    #[test]
    fn format_value_uses_unit() {
        assert_eq!(lcp().format_value(2512.4), "2512ms");
        let cls = MetricThreshold::new("cls", 0.1, 0.25, "score");
        assert_eq!(cls.format_value(0.12), "0.120");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn rating_serializes_camel_case() {
        let json = serde_json::to_string(&Rating::NeedsImprovement).unwrap();
        assert_eq!(json, "\"needsImprovement\"");
    }
}
