//! Which candidate alerts fire, which are held back, and which open alerts
//! can be closed.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use sitewatch_types::{Alert, Monitor};

use super::cooldown::Cooldowns;

/// Why a candidate did not fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// An unresolved alert for the same condition exists.
    AlreadyOpen,
    /// The cooldown for the candidate's key has not expired.
    Cooldown,
    /// Another candidate of the same monitor and key fires in this batch.
    DuplicateInBatch,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyOpen => write!(f, "already open"),
            SkipReason::Cooldown => write!(f, "cooldown"),
            SkipReason::DuplicateInBatch => write!(f, "duplicate in batch"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Skipped {
    pub alert: Alert,
    pub reason: SkipReason,
}

/// Result of [`decide`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decision {
    /// Candidates to fire, in candidate order.
    pub to_fire: Vec<Alert>,
    pub to_skip: Vec<Skipped>,
    /// Ids of open alerts whose condition is no longer present.
    pub to_resolve: Vec<String>,
}

impl Decision {
    pub fn is_empty(&self) -> bool {
        self.to_fire.is_empty() && self.to_skip.is_empty() && self.to_resolve.is_empty()
    }
}

/// Decide what happens to `candidates` given the alert log and cooldowns.
///
/// `evaluated` lists the monitors this run produced candidates for; only
/// their open alerts are considered for resolution. Candidates are checked
/// in order, so the first candidate of a key wins within a monitor's share
/// of the batch.
pub fn decide(
    candidates: &[Alert],
    alerts: &[Alert],
    cooldowns: &Cooldowns,
    evaluated: &[Monitor],
    now: DateTime<Utc>,
) -> Decision {
    let open: Vec<&Alert> = alerts.iter().filter(|a| a.is_open()).collect();
    let mut decision = Decision::default();
    let mut firing: BTreeSet<(Monitor, String)> = BTreeSet::new();

    for candidate in candidates {
        let key = (candidate.monitor, candidate.cooldown_key());

        let reason = if open.iter().any(|a| a.same_condition(candidate)) {
            Some(SkipReason::AlreadyOpen)
        } else if cooldowns.is_active(key.0, &key.1, now) {
            Some(SkipReason::Cooldown)
        } else if firing.contains(&key) {
            Some(SkipReason::DuplicateInBatch)
        } else {
            None
        };

        match reason {
            Some(reason) => decision.to_skip.push(Skipped {
                alert: candidate.clone(),
                reason,
            }),
            None => {
                firing.insert(key);
                decision.to_fire.push(candidate.clone());
            }
        }
    }

    decision.to_resolve = open
        .iter()
        .filter(|a| evaluated.contains(&a.monitor))
        .filter(|a| !candidates.iter().any(|c| c.same_condition(a)))
        .map(|a| a.id.clone())
        .collect();

    decision
}
