//! # sitewatch-types
//!
//! Core types shared by the sitewatch monitors. This crate defines the
//! on-disk schema for measurement history, the threshold variants used to
//! rate measurements, and the alert records produced by the decision engine.
//!
//! ## Design Goals
//!
//! - **Plain data**: every type is a value with no I/O attached
//! - **Optional serialization**: enable the `serde` feature for JSON state files
//! - **Two rating schemes**: timing metrics (lower is better) and category
//!   scores (higher is better) are separate threshold types
//! - **Ergonomic builders**: fluent API for records and alerts
//!
//! ## Features
//!
//! - `serde`: JSON serialization via serde, camelCase field names
//!
//! ## Example
//!
//! ```rust
//! use sitewatch_types::{MeasurementRecord, MetricThreshold, Rating};
//!
//! let record = MeasurementRecord::builder("home")
//!     .metric("lcp", 2600.0)
//!     .score("performance", Some(92))
//!     .build();
//!
//! let lcp = MetricThreshold::new("lcp", 2500.0, 4000.0, "ms");
//! assert_eq!(lcp.rate(record.metrics["lcp"]), Rating::NeedsImprovement);
//! ```

mod alert;
mod record;
mod threshold;

pub use alert::*;
pub use record::*;
pub use threshold::*;
