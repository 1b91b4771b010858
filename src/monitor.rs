//! The monitoring runs behind the CLI commands.
//!
//! Each run loads its history, appends this run's probe results, analyzes
//! the whole history and hands the candidate alerts to the [`AlertEngine`].
//! State is saved before returning; nothing is kept between runs in memory.

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sitewatch_adapters::github::GitHubClient;
use sitewatch_adapters::health::FunctionProbe;
use sitewatch_adapters::lighthouse::{AuditOutcome, LighthouseRunner};
use sitewatch_types::{Alert, AlertType, MeasurementRecord, Monitor, Severity};
use tracing::{info, warn};

use crate::alert::{
    AlertEngine, AlertState, ConsoleChannel, GitHubChannel, Outcome, SlackChannel,
};
use crate::config::{Endpoint, Settings};
use crate::data::{
    analyze, evaluate_scores, Analysis, History, ScoreEvaluation, ScoreSummary, Thresholds,
};
use crate::store;

pub const HISTORY_FILE: &str = "history.json";
pub const FUNCTIONS_FILE: &str = "functions.json";
pub const TRENDS_FILE: &str = "trends.json";

/// Runs a page audit.
#[async_trait]
pub trait Auditor: Send + Sync {
    async fn audit(&self, url: &str) -> AuditOutcome;
}

#[async_trait]
impl Auditor for LighthouseRunner {
    async fn audit(&self, url: &str) -> AuditOutcome {
        self.run(url).await
    }
}

/// Probes a function endpoint. Failures come back as records with `error`.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, name: &str, url: &str) -> MeasurementRecord;
}

#[async_trait]
impl Prober for FunctionProbe {
    async fn probe(&self, name: &str, url: &str) -> MeasurementRecord {
        self.check(name, url).await
    }
}

/// Result of a `check` run.
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    /// Records appended by this run.
    pub records: Vec<MeasurementRecord>,
    pub analysis: Analysis,
    pub scores: ScoreEvaluation,
    pub outcome: Outcome,
}

impl CheckReport {
    pub fn failures(&self) -> impl Iterator<Item = &MeasurementRecord> {
        self.records.iter().filter(|r| !r.is_success())
    }
}

/// Result of a `health` run.
#[derive(Debug, Clone, Default)]
pub struct HealthReport {
    pub records: Vec<MeasurementRecord>,
    pub analysis: Analysis,
    pub outcome: Outcome,
}

/// Snapshot written to `trends.json` by `report`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSnapshot {
    pub generated_at: DateTime<Utc>,
    pub vitals: Analysis,
    pub functions: Analysis,
    pub scores: Vec<ScoreSummary>,
}

/// Everything a run needs, resolved from [`Settings`].
#[derive(Debug)]
pub struct Pipeline {
    state_dir: PathBuf,
    retention: usize,
    thresholds: Thresholds,
    engine: AlertEngine,
}

impl Pipeline {
    pub fn new(
        state_dir: impl Into<PathBuf>,
        retention: usize,
        thresholds: Thresholds,
        engine: AlertEngine,
    ) -> Self {
        Self {
            state_dir: state_dir.into(),
            retention,
            thresholds,
            engine,
        }
    }

    /// Build a pipeline with every channel the settings enable. The console
    /// channel is always on.
    pub fn from_settings(settings: &Settings) -> Self {
        let mut engine =
            AlertEngine::new(settings.cooldown_policy()).with_channel(Box::new(ConsoleChannel));

        let mut client = GitHubClient::builder()
            .repository(&settings.github.owner, &settings.github.repo)
            .token_opt(std::env::var("GITHUB_TOKEN").ok());
        if let Some(endpoint) = &settings.github.endpoint {
            client = client.endpoint(endpoint);
        }
        let labels = settings.github.labels.clone();
        if let Some(github) = GitHubChannel::new(client.build(), labels) {
            engine = engine.with_channel(Box::new(github));
        }

        if let Some(slack) = SlackChannel::new(settings.slack_webhook(), settings.probe_timeout()) {
            engine = engine.with_channel(Box::new(slack));
        }

        info!("Alert channels: {}", engine.channel_names().join(", "));
        Self::new(
            &settings.state_dir,
            settings.retention,
            settings.thresholds(),
            engine,
        )
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    fn path(&self, file: &str) -> PathBuf {
        self.state_dir.join(file)
    }

    /// Audit every page, then evaluate scores and vitals.
    ///
    /// Score and vitals candidates are decided in one batch, but each monitor
    /// keeps its own cooldowns, so neither can hold back the other.
    pub async fn run_check(
        &self,
        auditor: &dyn Auditor,
        pages: &[Endpoint],
        now: DateTime<Utc>,
    ) -> Result<CheckReport> {
        if pages.is_empty() {
            warn!("No pages configured under [audit]; nothing to check");
        }

        let history_path = self.path(HISTORY_FILE);
        let mut history = History::load(&history_path);
        let mut report = CheckReport::default();
        let mut candidates = Vec::new();

        for page in pages {
            info!("Auditing {} ({})", page.name, page.url);
            let outcome = auditor.audit(&page.url).await;

            let record = match &outcome {
                AuditOutcome::Success(audit) => audit.to_record(&page.name, &page.url, now),
                _ => {
                    let reason = outcome.failure_reason().unwrap_or_default();
                    warn!("Audit of {} failed: {}", page.name, reason);
                    candidates.push(failure_alert(
                        Monitor::Scores,
                        &page.name,
                        "audit",
                        &reason,
                        now,
                    ));
                    let mut record = MeasurementRecord::failure(&page.name, now, reason);
                    record.url = Some(page.url.clone());
                    record
                }
            };

            history.append(record.clone(), self.retention);
            report.records.push(record);
        }
        history.save(&history_path)?;

        report.scores = evaluate_scores(history.records(), &self.thresholds, now);
        report.analysis = analyze(history.records(), &self.thresholds, Monitor::Vitals, now);
        candidates.extend(report.scores.alerts.iter().cloned());
        candidates.extend(report.analysis.alerts.iter().cloned());

        report.outcome = self
            .evaluate(&candidates, &[Monitor::Scores, Monitor::Vitals], now)
            .await?;
        Ok(report)
    }

    /// Probe every function and evaluate availability and response time.
    pub async fn run_health(
        &self,
        prober: &dyn Prober,
        functions: &[Endpoint],
        now: DateTime<Utc>,
    ) -> Result<HealthReport> {
        if functions.is_empty() {
            warn!("No functions configured; nothing to probe");
        }

        let history_path = self.path(FUNCTIONS_FILE);
        let mut history = History::load(&history_path);
        let mut report = HealthReport::default();
        let mut candidates = Vec::new();

        for function in functions {
            let mut record = prober.probe(&function.name, &function.url).await;
            record.timestamp = now;

            if let Some(error) = &record.error {
                warn!("{} is failing: {}", function.name, error);
                candidates.push(failure_alert(
                    Monitor::Functions,
                    &function.name,
                    "availability",
                    error,
                    now,
                ));
            }

            history.append(record.clone(), self.retention);
            report.records.push(record);
        }
        history.save(&history_path)?;

        report.analysis = analyze(history.records(), &self.thresholds, Monitor::Functions, now);
        candidates.extend(report.analysis.alerts.iter().cloned());

        report.outcome = self.evaluate(&candidates, &[Monitor::Functions], now).await?;
        Ok(report)
    }

    /// Analyze both histories without probing and write `trends.json`.
    pub fn report(&self, now: DateTime<Utc>) -> Result<TrendSnapshot> {
        let pages = History::load(&self.path(HISTORY_FILE));
        let functions = History::load(&self.path(FUNCTIONS_FILE));

        let snapshot = TrendSnapshot {
            generated_at: now,
            vitals: analyze(pages.records(), &self.thresholds, Monitor::Vitals, now),
            functions: analyze(functions.records(), &self.thresholds, Monitor::Functions, now),
            scores: evaluate_scores(pages.records(), &self.thresholds, now).summaries,
        };

        store::save(&self.path(TRENDS_FILE), &snapshot)?;
        Ok(snapshot)
    }

    /// Load alert state, apply the candidates, save.
    async fn evaluate(
        &self,
        candidates: &[Alert],
        evaluated: &[Monitor],
        now: DateTime<Utc>,
    ) -> Result<Outcome> {
        let mut state = AlertState::load(&self.state_dir, now);
        let outcome = self.engine.process(candidates, evaluated, &mut state, now).await;
        state.save(&self.state_dir)?;

        info!(
            "{} fired, {} skipped, {} resolved",
            outcome.fired.len(),
            outcome.skipped.len(),
            outcome.resolved.len()
        );
        Ok(outcome)
    }
}

fn failure_alert(
    monitor: Monitor,
    subject: &str,
    category: &str,
    reason: &str,
    now: DateTime<Utc>,
) -> Alert {
    Alert::builder(AlertType::Error, monitor)
        .subject(subject)
        .category(category)
        .severity(Severity::Critical)
        .message(format!("{} {} failed: {}", subject, category, reason))
        .build_at(now)
}
