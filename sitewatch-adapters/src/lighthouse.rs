//! Lighthouse adapter: runs the CLI as a child process and parses its report.
//!
//! The audit is bounded by a hard wall-clock timeout. When it expires the
//! child is killed and the run is reported as [`AuditOutcome::Timeout`]; a
//! nonzero exit becomes [`AuditOutcome::Failed`]. Neither is retried here.
//!
//! ## Metrics Collected
//!
//! - **Category scores**: performance, accessibility, best-practices, seo
//!   (Lighthouse reports 0..1, stored as 0..100)
//! - **Timings**: lcp, fcp, tbt, speedIndex, ttfb, inp, fid (milliseconds)
//! - **Layout shift**: cls (unitless)

use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::process::Command;

use sitewatch_types::MeasurementRecord;

use crate::AdapterError;

/// Lighthouse audit id to the metric name used in history.
pub const AUDIT_METRICS: &[(&str, &str)] = &[
    ("largest-contentful-paint", "lcp"),
    ("first-contentful-paint", "fcp"),
    ("cumulative-layout-shift", "cls"),
    ("total-blocking-time", "tbt"),
    ("speed-index", "speedIndex"),
    ("server-response-time", "ttfb"),
    ("interaction-to-next-paint", "inp"),
    ("max-potential-fid", "fid"),
];

/// Placeholder replaced by the audited URL inside configured arguments.
pub const URL_PLACEHOLDER: &str = "{url}";

/// Result of one audit run.
#[derive(Debug, Clone, PartialEq)]
pub enum AuditOutcome {
    /// The audit completed and produced a report.
    Success(AuditReport),
    /// The audit exceeded its timeout and was killed.
    Timeout,
    /// The process could not start, exited nonzero, or printed an unusable report.
    Failed { status: Option<i32>, stderr: String },
}

impl AuditOutcome {
    /// Short description of a failure, `None` on success.
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            AuditOutcome::Success(_) => None,
            AuditOutcome::Timeout => Some("audit timed out".to_string()),
            AuditOutcome::Failed { status, stderr } => {
                let stderr = stderr.trim();
                let detail = if stderr.is_empty() { "no output" } else { stderr };
                Some(match status {
                    Some(code) => format!("audit exited with status {}: {}", code, detail),
                    None => format!("audit failed: {}", detail),
                })
            }
        }
    }
}

/// The parts of a Lighthouse JSON report sitewatch reads.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    #[serde(default)]
    pub requested_url: Option<String>,
    #[serde(default)]
    pub final_url: Option<String>,
    #[serde(default)]
    pub categories: BTreeMap<String, CategoryResult>,
    #[serde(default)]
    pub audits: BTreeMap<String, AuditResult>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct CategoryResult {
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResult {
    #[serde(default)]
    pub numeric_value: Option<f64>,
}

impl AuditReport {
    /// Parse a report from the CLI's JSON output.
    pub fn parse(json: &str) -> Result<Self, AdapterError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Category scores scaled to 0..=100; unscored categories stay `None`.
    pub fn scores(&self) -> BTreeMap<String, Option<u8>> {
        self.categories
            .iter()
            .map(|(name, category)| {
                let score = category
                    .score
                    .filter(|s| s.is_finite())
                    .map(|s| (s * 100.0).round().clamp(0.0, 100.0) as u8);
                (name.clone(), score)
            })
            .collect()
    }

    /// Timing and layout metrics keyed by history metric name.
    pub fn metrics(&self) -> BTreeMap<String, f64> {
        AUDIT_METRICS
            .iter()
            .filter_map(|(audit, metric)| {
                let value = self.audits.get(*audit)?.numeric_value?;
                value.is_finite().then(|| (metric.to_string(), value))
            })
            .collect()
    }

    /// Convert into a history record for `subject`.
    pub fn to_record(
        &self,
        subject: &str,
        url: &str,
        timestamp: DateTime<Utc>,
    ) -> MeasurementRecord {
        let mut record = MeasurementRecord::with_timestamp(subject, timestamp);
        record.url = Some(self.final_url.clone().unwrap_or_else(|| url.to_string()));
        record.metrics = self.metrics();
        record.scores = self.scores();
        record
    }
}

/// Runs Lighthouse audits.
#[derive(Debug, Clone)]
pub struct LighthouseRunner {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl LighthouseRunner {
    /// Create a new builder for configuring the runner.
    pub fn builder() -> LighthouseRunnerBuilder {
        LighthouseRunnerBuilder::default()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Arguments for auditing `url`. The URL replaces every `{url}`
    /// placeholder, or goes first when there is none.
    fn args_for(&self, url: &str) -> Vec<String> {
        if self.args.iter().any(|a| a.contains(URL_PLACEHOLDER)) {
            self.args.iter().map(|a| a.replace(URL_PLACEHOLDER, url)).collect()
        } else {
            std::iter::once(url.to_string()).chain(self.args.iter().cloned()).collect()
        }
    }

    /// Audit `url`.
    pub async fn run(&self, url: &str) -> AuditOutcome {
        let mut command = Command::new(&self.program);
        command
            .args(self.args_for(url))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                return AuditOutcome::Failed {
                    status: None,
                    stderr: format!("could not start {}: {}", self.program, e),
                }
            }
        };

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Err(_) => return AuditOutcome::Timeout,
            Ok(Err(e)) => {
                return AuditOutcome::Failed {
                    status: None,
                    stderr: e.to_string(),
                }
            }
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            return AuditOutcome::Failed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            };
        }

        match AuditReport::parse(&String::from_utf8_lossy(&output.stdout)) {
            Ok(report) => AuditOutcome::Success(report),
            Err(e) => AuditOutcome::Failed {
                status: output.status.code(),
                stderr: format!("invalid report: {}", e),
            },
        }
    }
}

/// Builder for LighthouseRunner.
#[derive(Debug, Default)]
pub struct LighthouseRunnerBuilder {
    program: Option<String>,
    args: Option<Vec<String>>,
    timeout: Option<Duration>,
}

impl LighthouseRunnerBuilder {
    /// Set the program to run (default: "lighthouse").
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = Some(program.into());
        self
    }

    /// Replace the default arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// Set the hard timeout (default: 120 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the runner.
    pub fn build(self) -> LighthouseRunner {
        LighthouseRunner {
            program: self.program.unwrap_or_else(|| "lighthouse".to_string()),
            args: self.args.unwrap_or_else(default_args),
            timeout: self.timeout.unwrap_or(Duration::from_secs(120)),
        }
    }
}

/// Default Lighthouse CLI arguments: JSON report on stdout, headless Chrome.
pub fn default_args() -> Vec<String> {
    [
        "--output=json",
        "--output-path=stdout",
        "--quiet",
        "--chrome-flags=--headless",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const REPORT: &str = r#"{
        "requestedUrl": "https://example.dev/",
        "finalUrl": "https://example.dev/",
        "categories": {
            "performance": { "score": 0.87 },
            "accessibility": { "score": 1 },
            "seo": { "score": null }
        },
        "audits": {
            "largest-contentful-paint": { "numericValue": 2650.4, "displayValue": "2.7 s" },
            "cumulative-layout-shift": { "numericValue": 0.02 },
            "total-blocking-time": { "numericValue": 180 },
            "speed-index": { "score": 0.9 }
        }
    }"#;

    #[test]
    fn test_builder_defaults() {
        let runner = LighthouseRunner::builder().build();
        assert_eq!(runner.program, "lighthouse");
        assert_eq!(runner.timeout(), Duration::from_secs(120));
        assert_eq!(
            runner.args_for("https://example.dev/"),
            vec![
                "https://example.dev/",
                "--output=json",
                "--output-path=stdout",
                "--quiet",
                "--chrome-flags=--headless"
            ]
        );
    }

    #[test]
    fn test_url_placeholder_is_substituted() {
        let runner = LighthouseRunner::builder()
            .program("npx")
            .args(["lighthouse", "{url}", "--output=json"])
            .build();
        assert_eq!(
            runner.args_for("https://example.dev/blog"),
            vec!["lighthouse", "https://example.dev/blog", "--output=json"]
        );
    }

    #[test]
    fn test_report_scores_and_metrics() {
        let report = AuditReport::parse(REPORT).unwrap();

        let scores = report.scores();
        assert_eq!(scores["performance"], Some(87));
        assert_eq!(scores["accessibility"], Some(100));
        assert_eq!(scores["seo"], None);

        let metrics = report.metrics();
        assert_eq!(metrics["lcp"], 2650.4);
        assert_eq!(metrics["cls"], 0.02);
        assert_eq!(metrics["tbt"], 180.0);
        // speed-index has no numericValue in this report
        assert!(!metrics.contains_key("speedIndex"));
    }

    #[test]
    fn test_report_to_record() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let record = AuditReport::parse(REPORT)
            .unwrap()
            .to_record("home", "https://example.dev", at);

        assert_eq!(record.subject, "home");
        assert_eq!(record.url.as_deref(), Some("https://example.dev/"));
        assert_eq!(record.timestamp, at);
        assert_eq!(record.score("performance"), Some(87));
        assert!(record.is_success());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            AuditReport::parse("Lighthouse crashed"),
            Err(AdapterError::Parse(_))
        ));
    }

    #[test]
    fn test_failure_reason() {
        let failed = AuditOutcome::Failed {
            status: Some(1),
            stderr: "Chrome not found\n".into(),
        };
        assert_eq!(
            failed.failure_reason().unwrap(),
            "audit exited with status 1: Chrome not found"
        );
        assert_eq!(AuditOutcome::Timeout.failure_reason().unwrap(), "audit timed out");
        assert!(AuditOutcome::Success(AuditReport::default())
            .failure_reason()
            .is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_parses_stdout() {
        let dir = std::env::temp_dir().join(format!("sitewatch-lh-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("report.json");
        std::fs::write(&path, REPORT).unwrap();

        let script = format!("cat '{}'", path.display());
        let runner = LighthouseRunner::builder()
            .program("sh")
            .args(["-c", script.as_str(), "{url}"])
            .timeout(Duration::from_secs(10))
            .build();

        match runner.run("https://example.dev/").await {
            AuditOutcome::Success(report) => {
                assert_eq!(report.scores()["performance"], Some(87));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        std::fs::remove_dir_all(&dir).ok();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_times_out() {
        let runner = LighthouseRunner::builder()
            .program("sh")
            .args(["-c", "sleep 5", "{url}"])
            .timeout(Duration::from_millis(100))
            .build();

        assert_eq!(runner.run("https://example.dev/").await, AuditOutcome::Timeout);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_reports_nonzero_exit() {
        let runner = LighthouseRunner::builder()
            .program("sh")
            .args(["-c", "echo boom >&2; exit 3", "{url}"])
            .build();

        match runner.run("https://example.dev/").await {
            AuditOutcome::Failed { status, stderr } => {
                assert_eq!(status, Some(3));
                assert_eq!(stderr.trim(), "boom");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_missing_program() {
        let runner = LighthouseRunner::builder()
            .program("sitewatch-definitely-not-installed")
            .build();

        match runner.run("https://example.dev/").await {
            AuditOutcome::Failed { status, stderr } => {
                assert!(status.is_none());
                assert!(stderr.contains("could not start"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
