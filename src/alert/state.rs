//! Alert log and cooldowns, loaded and saved once per run.

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use sitewatch_types::{Alert, Monitor};
use tracing::debug;

use super::cooldown::Cooldowns;
use crate::store;

pub const ALERTS_FILE: &str = "alerts.json";
pub const COOLDOWNS_FILE: &str = "cooldowns.json";

/// Persistent alerting state for one state directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertState {
    /// Every alert ever fired, oldest first. Never pruned.
    pub alerts: Vec<Alert>,
    pub cooldowns: Cooldowns,
}

impl AlertState {
    /// Load from `dir`. Expired cooldowns are dropped on the way in, as are
    /// log entries that no longer parse (the file is kept aside first).
    pub fn load(dir: &Path, now: DateTime<Utc>) -> Self {
        let alerts: Vec<Alert> = store::load_list(&dir.join(ALERTS_FILE));
        let mut cooldowns: Cooldowns = store::load_or_default(&dir.join(COOLDOWNS_FILE));
        let pruned = cooldowns.prune_expired(now);
        if pruned > 0 {
            debug!("Pruned {} expired cooldowns", pruned);
        }
        Self { alerts, cooldowns }
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        store::save(&dir.join(ALERTS_FILE), &self.alerts)?;
        store::save(&dir.join(COOLDOWNS_FILE), &self.cooldowns)?;
        Ok(())
    }

    /// Unresolved alerts, optionally limited to one monitor.
    pub fn open(&self, monitor: Option<Monitor>) -> Vec<&Alert> {
        self.alerts
            .iter()
            .filter(|a| a.is_open())
            .filter(|a| monitor.is_none_or(|m| a.monitor == m))
            .collect()
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Alert> {
        self.alerts.iter_mut().find(|a| a.id == id)
    }
}
