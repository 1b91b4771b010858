//! Lighthouse category score evaluation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sitewatch_types::{Alert, AlertType, MeasurementRecord, Monitor, Severity};

use super::thresholds::Thresholds;

/// Latest scores for one subject, with the previous run's for comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSummary {
    pub subject: String,
    pub timestamp: DateTime<Utc>,
    pub scores: BTreeMap<String, u8>,
    #[serde(default)]
    pub previous: BTreeMap<String, u8>,
}

impl ScoreSummary {
    /// Change in points since the previous run, when both runs scored it.
    pub fn delta(&self, category: &str) -> Option<i16> {
        let latest = *self.scores.get(category)?;
        let previous = *self.previous.get(category)?;
        Some(latest as i16 - previous as i16)
    }
}

/// Output of [`evaluate_scores`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreEvaluation {
    pub summaries: Vec<ScoreSummary>,
    pub alerts: Vec<Alert>,
}

fn scored(record: &MeasurementRecord) -> BTreeMap<String, u8> {
    record
        .scores
        .iter()
        .filter_map(|(category, score)| score.map(|s| (category.clone(), s)))
        .collect()
}

/// Evaluate the latest scored run of every subject.
///
/// Records without any score (failed audits) are ignored when picking the
/// latest and previous runs. Only categories with a configured minimum are
/// checked.
pub fn evaluate_scores(
    records: &[MeasurementRecord],
    thresholds: &Thresholds,
    now: DateTime<Utc>,
) -> ScoreEvaluation {
    let mut by_subject: BTreeMap<&str, Vec<&MeasurementRecord>> = BTreeMap::new();
    for record in records.iter().filter(|r| r.has_scores()) {
        by_subject.entry(record.subject.as_str()).or_default().push(record);
    }

    let mut evaluation = ScoreEvaluation::default();

    for (subject, mut runs) in by_subject {
        runs.sort_by_key(|r| r.timestamp);
        let Some(latest) = runs.last() else {
            continue;
        };
        let previous = runs.len().checked_sub(2).map(|i| runs[i]);

        let summary = ScoreSummary {
            subject: subject.to_string(),
            timestamp: latest.timestamp,
            scores: scored(latest),
            previous: previous.map(scored).unwrap_or_default(),
        };

        for (category, &score) in &summary.scores {
            let Some(threshold) = thresholds.score(category) else {
                continue;
            };

            if let Some(severity) = threshold.severity(score) {
                evaluation.alerts.push(
                    Alert::builder(AlertType::Threshold, Monitor::Scores)
                        .subject(subject)
                        .category(category)
                        .value(score as f64)
                        .threshold(threshold.minimum as f64)
                        .severity(severity)
                        .message(format!(
                            "{} score on {} is {} (minimum {})",
                            category, subject, score, threshold.minimum
                        ))
                        .build_at(now),
                );
                continue;
            }

            if let Some(delta) = summary.delta(category) {
                if -delta >= thresholds.score_drop as i16 {
                    let before = score as i16 - delta;
                    evaluation.alerts.push(
                        Alert::builder(AlertType::Trend, Monitor::Scores)
                            .subject(subject)
                            .category(category)
                            .value(score as f64)
                            .threshold(before as f64)
                            .severity(Severity::Warning)
                            .message(format!(
                                "{} score on {} dropped {} points ({} -> {})",
                                category, subject, -delta, before, score
                            ))
                            .build_at(now),
                    );
                }
            }
        }

        evaluation.summaries.push(summary);
    }

    evaluation
}
