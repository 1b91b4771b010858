//! Alert decision and delivery.
//!
//! ```text
//! candidates ──▶ decide() ──▶ to_fire ──▶ AlertEngine::fire ──▶ channels
//!                  ▲    │                        │
//!   AlertState ────┘    └──▶ to_resolve ──▶ AlertEngine::resolve
//!  (alerts.json, cooldowns.json)
//! ```

pub mod cooldown;
pub mod decide;
pub mod engine;
pub mod sink;
pub mod state;

pub use cooldown::{CooldownEntry, CooldownPolicy, Cooldowns};
pub use decide::{decide, Decision, SkipReason, Skipped};
pub use engine::{AlertEngine, Outcome};
pub use sink::{AlertChannel, ConsoleChannel, Delivery, GitHubChannel, SlackChannel};
pub use state::AlertState;
