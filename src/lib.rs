//! # sitewatch
//!
//! Monitoring and alerting for a small website: Lighthouse scores, Core
//! Web Vitals and serverless function health.
//!
//! Every command is a short batch run against a state directory of JSON
//! files. A run appends probe results to a history, rates and trends each
//! metric against a threshold table, and decides which alerts to fire given
//! the open alerts and per-monitor cooldowns from earlier runs.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────┐   ┌─────────────────┐   ┌──────────────┐
//! │ Auditor /    │──▶│ History  │──▶│ analyze()       │──▶│ decide()     │
//! │ Prober       │   │ (JSON)   │   │ evaluate_scores │   │ AlertEngine  │
//! └──────────────┘   └──────────┘   └─────────────────┘   └──────┬───────┘
//!                                                                │
//!                                      console / GitHub / Slack ◀┘
//! ```
//!
//! - **[`data`]**: measurement history, threshold tables, trend analysis,
//!   score evaluation and recommendations
//! - **[`alert`]**: cooldowns, the decision engine, alert state and sink channels
//! - **[`monitor`]**: the `check`, `health` and `report` runs wiring it together
//! - **[`config`]**: settings from `sitewatch.toml` and `SITEWATCH__*` variables
//! - **[`rebuild`]**: coalescing of overlapping `watch` ticks
//! - **[`watch`]**: the `watch` loop driving repeated checks
//!
//! ## Example
//!
//! ```
//! use chrono::Utc;
//! use sitewatch::data::{analyze, Thresholds};
//! use sitewatch_types::{MeasurementRecord, Monitor, Rating};
//!
//! let history = vec![
//!     MeasurementRecord::builder("home").metric("lcp", 2000.0).build(),
//! ];
//! let analysis = analyze(&history, &Thresholds::default(), Monitor::Vitals, Utc::now());
//! assert_eq!(analysis.metrics["lcp"]["home"].rating, Rating::Good);
//! ```

pub mod alert;
pub mod config;
pub mod data;
pub mod monitor;
pub mod output;
pub mod rebuild;
pub mod store;
pub mod watch;

pub use alert::{AlertEngine, AlertState, CooldownPolicy, Cooldowns, Decision};
pub use config::Settings;
pub use data::{analyze, evaluate_scores, Analysis, History, Thresholds, TrendResult};
pub use monitor::{Auditor, Pipeline, Prober};
pub use rebuild::BuildCoordinator;
