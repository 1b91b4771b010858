//! Measurement data and the analysis run over it.
//!
//! ## Submodules
//!
//! - [`duration`]: Parsing and formatting of duration strings (e.g., "4h", "500ms")
//! - [`history`]: The append-only measurement log
//! - [`thresholds`]: Metric and score threshold tables
//! - [`trend`]: Per-subject, per-metric rating and trend ([`TrendResult`])
//! - [`scores`]: Lighthouse category score evaluation
//! - [`recommend`]: Remediation advice derived from trend results
//!
//! ## Data Flow
//!
//! ```text
//! History (history.json / functions.json)
//!        │
//!        ├──▶ analyze()          ──▶ TrendResult + candidate alerts
//!        │         └──▶ recommend()
//!        │
//!        └──▶ evaluate_scores()  ──▶ ScoreSummary + candidate alerts
//! ```

pub mod duration;
pub mod history;
pub mod recommend;
pub mod scores;
pub mod thresholds;
pub mod trend;

pub use history::History;
pub use recommend::{Priority, Recommendation};
pub use scores::{evaluate_scores, ScoreEvaluation, ScoreSummary};
pub use thresholds::Thresholds;
pub use trend::{analyze, Analysis, TrendResult};
