//! Fixed remediation advice keyed by metric.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sitewatch_types::{Rating, Trend};

use super::trend::TrendResult;

/// How soon a recommendation should be acted on. Sorts high first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn label(&self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        }
    }
}

/// Which text variant of the advice applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// At least one subject is over the good threshold.
    Poor,
    Degrading,
    Improving,
}

/// Advice for one metric, aggregated over the subjects it applies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub metric: String,
    pub category: String,
    pub priority: Priority,
    pub variant: Variant,
    pub message: String,
    pub subjects: Vec<String>,
}

struct Advice {
    metric: &'static str,
    category: &'static str,
    priority: Priority,
    poor: &'static str,
    degrading: &'static str,
    improving: &'static str,
}

const ADVICE: &[Advice] = &[
    Advice {
        metric: "cls",
        category: "layout-stability",
        priority: Priority::High,
        poor: "Reserve space for images, embeds and web fonts (explicit width/height, font-display: optional) to stop layout shifts.",
        degrading: "Layout shift is creeping up; check recently added images, ads or late-injected banners.",
        improving: "Layout shift is improving; keep size attributes on new media.",
    },
    Advice {
        metric: "lcp",
        category: "loading",
        priority: Priority::High,
        poor: "Preload the hero image, serve it in a modern format and cut render-blocking CSS to speed up the largest paint.",
        degrading: "Largest paint is getting slower; compare hero image weight and server timing against the last good build.",
        improving: "Largest paint is improving; keep the hero image preloaded.",
    },
    Advice {
        metric: "tbt",
        category: "javascript",
        priority: Priority::Medium,
        poor: "Split long JavaScript tasks, defer non-critical scripts and drop unused bundles to reduce blocking time.",
        degrading: "Main-thread blocking is growing; audit recently added dependencies and third-party scripts.",
        improving: "Blocking time is improving; keep code-splitting new routes.",
    },
    Advice {
        metric: "fid",
        category: "javascript",
        priority: Priority::Medium,
        poor: "Break up JavaScript executed during load so the page can respond to the first input.",
        degrading: "Input delay is growing; look for new synchronous work in startup scripts.",
        improving: "Input delay is improving.",
    },
    Advice {
        metric: "inp",
        category: "javascript",
        priority: Priority::Medium,
        poor: "Move heavy event-handler work off the main thread and yield between updates to improve interaction latency.",
        degrading: "Interaction latency is growing; profile the slowest event handlers.",
        improving: "Interaction latency is improving.",
    },
    Advice {
        metric: "fcp",
        category: "rendering",
        priority: Priority::Medium,
        poor: "Inline critical CSS and defer the rest so first content paints sooner.",
        degrading: "First paint is getting slower; check for new render-blocking resources.",
        improving: "First paint is improving.",
    },
    Advice {
        metric: "responseTime",
        category: "functions",
        priority: Priority::Medium,
        poor: "Reduce cold-start cost (smaller bundles, fewer top-level imports) and cache upstream calls in slow functions.",
        degrading: "Function latency is growing; check upstream API latency and recent deploys.",
        improving: "Function latency is improving.",
    },
    Advice {
        metric: "ttfb",
        category: "server",
        priority: Priority::Low,
        poor: "Serve pages from the CDN edge and enable caching headers to cut time to first byte.",
        degrading: "Time to first byte is growing; check CDN cache hit rates.",
        improving: "Time to first byte is improving.",
    },
    Advice {
        metric: "speedIndex",
        category: "rendering",
        priority: Priority::Low,
        poor: "Prioritise above-the-fold content and lazy-load the rest to improve visual progress.",
        degrading: "Visual progress is slowing; compare above-the-fold payloads.",
        improving: "Visual progress is improving.",
    },
];

/// Build recommendations from trend results.
///
/// One recommendation per metric with advice. The variant is the most
/// urgent that applies to any subject (poor, then degrading, then
/// improving); metrics that are good and stable everywhere produce nothing.
/// Output is sorted by priority, then metric name.
pub fn recommend(results: &BTreeMap<String, BTreeMap<String, TrendResult>>) -> Vec<Recommendation> {
    let mut recommendations: Vec<Recommendation> = ADVICE
        .iter()
        .filter_map(|advice| {
            let by_subject = results.get(advice.metric)?;

            let poor = subjects_where(by_subject, |r| r.rating != Rating::Good);
            let degrading = subjects_where(by_subject, |r| r.trend == Trend::Degrading);
            let improving = subjects_where(by_subject, |r| r.trend == Trend::Improving);

            let (variant, message, subjects) = if !poor.is_empty() {
                (Variant::Poor, advice.poor, poor)
            } else if !degrading.is_empty() {
                (Variant::Degrading, advice.degrading, degrading)
            } else if !improving.is_empty() {
                (Variant::Improving, advice.improving, improving)
            } else {
                return None;
            };

            Some(Recommendation {
                metric: advice.metric.to_string(),
                category: advice.category.to_string(),
                priority: advice.priority,
                variant,
                message: message.to_string(),
                subjects,
            })
        })
        .collect();

    recommendations.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| a.metric.cmp(&b.metric))
    });
    recommendations
}

fn subjects_where<F>(by_subject: &BTreeMap<String, TrendResult>, pred: F) -> Vec<String>
where
    F: Fn(&TrendResult) -> bool,
{
    by_subject
        .values()
        .filter(|r| pred(r))
        .map(|r| r.subject.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(subject: &str, metric: &str, rating: Rating, trend: Trend) -> TrendResult {
        TrendResult {
            subject: subject.to_string(),
            metric: metric.to_string(),
            latest: 0.0,
            average: 0.0,
            min: 0.0,
            max: 0.0,
            rating,
            trend,
            change_percent: None,
            sample_count: 3,
        }
    }

    fn table(results: Vec<TrendResult>) -> BTreeMap<String, BTreeMap<String, TrendResult>> {
        let mut map: BTreeMap<String, BTreeMap<String, TrendResult>> = BTreeMap::new();
        for r in results {
            map.entry(r.metric.clone()).or_default().insert(r.subject.clone(), r);
        }
        map
    }

    #[test]
    fn test_good_and_stable_produces_nothing() {
        let results = table(vec![result("home", "lcp", Rating::Good, Trend::Stable)]);
        assert!(recommend(&results).is_empty());
    }

    #[test]
    fn test_sorted_by_priority_then_metric() {
        let results = table(vec![
            result("home", "ttfb", Rating::Poor, Trend::Stable),
            result("home", "tbt", Rating::NeedsImprovement, Trend::Stable),
            result("home", "lcp", Rating::Good, Trend::Degrading),
            result("blog", "cls", Rating::Poor, Trend::Stable),
        ]);

        let recs = recommend(&results);
        let order: Vec<(&str, Priority)> =
            recs.iter().map(|r| (r.metric.as_str(), r.priority)).collect();
        assert_eq!(
            order,
            vec![
                ("cls", Priority::High),
                ("lcp", Priority::High),
                ("tbt", Priority::Medium),
                ("ttfb", Priority::Low),
            ]
        );
        assert_eq!(recs[1].variant, Variant::Degrading);
        assert_eq!(recs[0].category, "layout-stability");
    }

    #[test]
    fn test_poor_variant_wins_and_lists_subjects() {
        let results = table(vec![
            result("home", "lcp", Rating::Poor, Trend::Stable),
            result("blog", "lcp", Rating::Good, Trend::Degrading),
            result("about", "lcp", Rating::NeedsImprovement, Trend::Improving),
        ]);

        let recs = recommend(&results);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].variant, Variant::Poor);
        assert_eq!(recs[0].subjects, vec!["about", "home"]);
    }

    #[test]
    fn test_improving_variant() {
        let results = table(vec![result("home", "inp", Rating::Good, Trend::Improving)]);
        let recs = recommend(&results);
        assert_eq!(recs[0].variant, Variant::Improving);
        assert_eq!(recs[0].message, "Interaction latency is improving.");
    }

    #[test]
    fn test_metrics_without_advice_are_ignored() {
        let results = table(vec![result("home", "statusCode", Rating::Poor, Trend::Stable)]);
        assert!(recommend(&results).is_empty());
    }
}
