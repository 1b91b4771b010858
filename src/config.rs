//! Runtime configuration.
//!
//! Settings come from an optional TOML file (default `sitewatch.toml`)
//! layered with `SITEWATCH__*` environment variables, e.g.
//! `SITEWATCH__STATE_DIR=/var/lib/sitewatch` or
//! `SITEWATCH__COOLDOWNS__CRITICAL=2h`. Anything missing or malformed falls
//! back to the documented default with a warning.
//!
//! ```toml
//! state_dir = ".sitewatch"
//! retention = 500
//!
//! [cooldowns]
//! critical = "4h"
//! warning = "24h"
//!
//! [thresholds.lcp]
//! good = 2000
//! needs_improvement = 3500
//!
//! [scores]
//! performance = 85
//!
//! [audit]
//! timeout = "90s"
//! pages = [{ name = "home", url = "https://example.dev/" }]
//!
//! [[functions]]
//! name = "contact"
//! url = "https://example.dev/.netlify/functions/contact"
//!
//! [github]
//! owner = "octocat"
//! repo = "portfolio"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;
use sitewatch_types::{MetricThreshold, ScoreThreshold};
use tracing::{debug, warn};

use crate::alert::CooldownPolicy;
use crate::data::duration::parse_duration;
use crate::data::history::DEFAULT_RETENTION;
use crate::data::thresholds::{Thresholds, DEFAULT_SCORE_DROP};

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "sitewatch.toml";

/// A named URL to audit or probe.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Endpoint {
    pub name: String,
    pub url: String,
}

/// Override for one metric threshold. The unit defaults to the built-in one.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MetricOverride {
    pub good: f64,
    pub needs_improvement: f64,
    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CooldownSettings {
    pub critical: String,
    pub warning: String,
    pub info: String,
}

impl Default for CooldownSettings {
    fn default() -> Self {
        Self {
            critical: "4h".to_string(),
            warning: "24h".to_string(),
            info: "24h".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AuditSettings {
    pub program: String,
    /// Replaces the default Lighthouse arguments. `{url}` marks where the
    /// page URL goes.
    pub args: Option<Vec<String>>,
    pub timeout: String,
    pub pages: Vec<Endpoint>,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            program: "lighthouse".to_string(),
            args: None,
            timeout: "120s".to_string(),
            pages: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GitHubSettings {
    pub owner: String,
    pub repo: String,
    pub labels: Vec<String>,
    pub endpoint: Option<String>,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            labels: vec!["sitewatch".to_string()],
            endpoint: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SlackSettings {
    /// Falls back to `SLACK_WEBHOOK_URL`.
    pub webhook_url: Option<String>,
}

/// Everything a run needs to know.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub state_dir: PathBuf,
    /// Records kept per history file; 0 keeps everything.
    pub retention: usize,
    pub cooldowns: CooldownSettings,
    pub thresholds: BTreeMap<String, MetricOverride>,
    /// Minimum score per Lighthouse category.
    pub scores: BTreeMap<String, u8>,
    pub score_drop: u8,
    pub audit: AuditSettings,
    pub functions: Vec<Endpoint>,
    pub probe_timeout: String,
    pub github: GitHubSettings,
    pub slack: SlackSettings,
    pub watch_interval: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(".sitewatch"),
            retention: DEFAULT_RETENTION,
            cooldowns: CooldownSettings::default(),
            thresholds: BTreeMap::new(),
            scores: BTreeMap::new(),
            score_drop: DEFAULT_SCORE_DROP,
            audit: AuditSettings::default(),
            functions: Vec::new(),
            probe_timeout: "10s".to_string(),
            github: GitHubSettings::default(),
            slack: SlackSettings::default(),
            watch_interval: "15m".to_string(),
        }
    }
}

fn duration_or(value: &str, default: Duration, name: &str) -> Duration {
    match parse_duration(value) {
        Ok(d) if !d.is_zero() => d,
        Ok(_) => {
            warn!("{} must be greater than zero; using default", name);
            default
        }
        Err(e) => {
            warn!("Invalid {} {:?}: {}; using default", name, value, e);
            default
        }
    }
}

impl Settings {
    /// Build settings from `path` (or [`DEFAULT_CONFIG_FILE`]) and the
    /// environment.
    pub fn build(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        let required = path != Path::new(DEFAULT_CONFIG_FILE);

        let config = Config::builder()
            .add_source(File::from(path).required(required))
            .add_source(
                Environment::with_prefix("SITEWATCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Like [`Settings::build`], but a malformed configuration yields the
    /// defaults with a warning.
    pub fn load(path: Option<&Path>) -> Self {
        match Self::build(path) {
            Ok(settings) => {
                debug!("Loaded configuration: {:?}", settings);
                settings
            }
            Err(e) => {
                warn!("Configuration error: {:#}; using defaults", e);
                Self::default()
            }
        }
    }

    /// Built-in thresholds with the configured overrides applied.
    pub fn thresholds(&self) -> Thresholds {
        let mut thresholds = Thresholds {
            score_drop: self.score_drop,
            ..Thresholds::default()
        };

        for (key, over) in &self.thresholds {
            // Environment sources lowercase keys; match built-ins like
            // speedIndex regardless of case.
            let metric = thresholds
                .metrics
                .keys()
                .find(|name| name.eq_ignore_ascii_case(key))
                .cloned()
                .unwrap_or_else(|| key.clone());
            let unit = over
                .unit
                .clone()
                .or_else(|| thresholds.metric(&metric).map(|t| t.unit.clone()))
                .unwrap_or_else(|| "ms".to_string());
            thresholds.set_metric(MetricThreshold::new(
                metric,
                over.good,
                over.needs_improvement,
                unit,
            ));
        }

        for (category, minimum) in &self.scores {
            thresholds.set_score(ScoreThreshold::new(category.as_str(), *minimum));
        }

        thresholds
    }

    pub fn cooldown_policy(&self) -> CooldownPolicy {
        let defaults = CooldownPolicy::default();
        let cooldowns = &self.cooldowns;
        CooldownPolicy {
            critical: duration_or(&cooldowns.critical, defaults.critical, "cooldowns.critical"),
            warning: duration_or(&cooldowns.warning, defaults.warning, "cooldowns.warning"),
            info: duration_or(&cooldowns.info, defaults.info, "cooldowns.info"),
        }
    }

    pub fn audit_timeout(&self) -> Duration {
        duration_or(&self.audit.timeout, Duration::from_secs(120), "audit.timeout")
    }

    pub fn probe_timeout(&self) -> Duration {
        duration_or(&self.probe_timeout, Duration::from_secs(10), "probe_timeout")
    }

    pub fn watch_interval(&self) -> Duration {
        duration_or(&self.watch_interval, Duration::from_secs(15 * 60), "watch_interval")
    }

    pub fn slack_webhook(&self) -> Option<String> {
        self.slack
            .webhook_url
            .clone()
            .or_else(|| std::env::var("SLACK_WEBHOOK_URL").ok())
    }
}
