//! # sitewatch-adapters
//!
//! Clients for the external collaborators the sitewatch monitors call into.
//!
//! Each adapter is a thin, typed wrapper around one outside system. None of
//! them decide anything: they run a probe and return a record, or deliver an
//! alert and report what happened.
//!
//! ## Supported Systems
//!
//! - **GitHub issues** (`github` feature) - create, list and close tracking
//!   issues via the REST API
//! - **Slack** (`slack` feature) - post alert messages to an incoming webhook
//! - **Lighthouse** (`lighthouse` feature) - run the Lighthouse CLI as a child
//!   process with a hard timeout and parse its JSON report
//! - **Function probes** (`health` feature) - time an HTTP request against a
//!   serverless function endpoint
//!
//! ## Quick Start (Lighthouse)
//!
//! ```rust,no_run
//! use sitewatch_adapters::lighthouse::{AuditOutcome, LighthouseRunner};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let runner = LighthouseRunner::builder()
//!         .timeout(Duration::from_secs(90))
//!         .build();
//!
//!     match runner.run("https://example.dev/").await {
//!         AuditOutcome::Success(report) => println!("{:?}", report.scores()),
//!         AuditOutcome::Timeout => eprintln!("audit timed out"),
//!         AuditOutcome::Failed { status, stderr } => eprintln!("{:?}: {}", status, stderr),
//!     }
//! }
//! ```

pub mod error;

#[cfg(feature = "github")]
pub mod github;

#[cfg(feature = "slack")]
pub mod slack;

#[cfg(feature = "lighthouse")]
pub mod lighthouse;

#[cfg(feature = "health")]
pub mod health;

pub use error::AdapterError;

// Re-export types for convenience
pub use sitewatch_types::{Alert, MeasurementRecord, Severity};
