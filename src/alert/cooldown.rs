//! Cooldown windows that suppress repeat alerts for the same key.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sitewatch_types::{Monitor, Severity};

/// A suppression window for one alert key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownEntry {
    pub key: String,
    /// Epoch milliseconds.
    pub expires_at: i64,
}

impl CooldownEntry {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now.timestamp_millis()
    }

    pub fn expires(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.expires_at)
    }
}

/// All cooldowns, namespaced by the monitor that raised the alert and then
/// keyed by alert cooldown key.
///
/// Each monitor suppresses only its own repeats: a low performance score on
/// a page never holds back a poor LCP alert for the same page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cooldowns {
    entries: BTreeMap<Monitor, BTreeMap<String, CooldownEntry>>,
}

impl Cooldowns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` is suppressed for `monitor` at `now`.
    pub fn is_active(&self, monitor: Monitor, key: &str, now: DateTime<Utc>) -> bool {
        self.get(monitor, key).is_some_and(|e| e.is_active(now))
    }

    pub fn get(&self, monitor: Monitor, key: &str) -> Option<&CooldownEntry> {
        self.entries.get(&monitor).and_then(|keys| keys.get(key))
    }

    /// Start (or restart) the window for `key` under `monitor`.
    pub fn set(
        &mut self,
        monitor: Monitor,
        key: impl Into<String>,
        now: DateTime<Utc>,
        window: Duration,
    ) {
        let key = key.into();
        let expires_at = now
            .timestamp_millis()
            .saturating_add(window.as_millis().min(i64::MAX as u128) as i64);
        self.entries
            .entry(monitor)
            .or_default()
            .insert(key.clone(), CooldownEntry { key, expires_at });
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn prune_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.len();
        for keys in self.entries.values_mut() {
            keys.retain(|_, e| e.is_active(now));
        }
        self.entries.retain(|_, keys| !keys.is_empty());
        before - self.len()
    }

    /// Entries still active at `now`, soonest expiry first.
    pub fn active(&self, now: DateTime<Utc>) -> Vec<(Monitor, &CooldownEntry)> {
        let mut active: Vec<(Monitor, &CooldownEntry)> = self
            .entries
            .iter()
            .flat_map(|(monitor, keys)| keys.values().map(move |e| (*monitor, e)))
            .filter(|(_, e)| e.is_active(now))
            .collect();
        active.sort_by_key(|(_, e)| e.expires_at);
        active
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cooldown window per severity class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownPolicy {
    pub critical: Duration,
    pub warning: Duration,
    pub info: Duration,
}

impl Default for CooldownPolicy {
    fn default() -> Self {
        Self {
            critical: Duration::from_secs(4 * 3600),
            warning: Duration::from_secs(24 * 3600),
            info: Duration::from_secs(24 * 3600),
        }
    }
}

impl CooldownPolicy {
    pub fn window_for(&self, severity: Severity) -> Duration {
        match severity {
            Severity::Critical => self.critical,
            Severity::Warning => self.warning,
            Severity::Info => self.info,
        }
    }
}
