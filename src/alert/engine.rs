//! Applies a [`Decision`]: fires alerts through the sink channels, starts
//! their cooldowns and resolves cleared conditions.

use chrono::{DateTime, Utc};
use sitewatch_types::{Alert, Monitor};
use tracing::{debug, info, warn};

use super::cooldown::CooldownPolicy;
use super::decide::{decide, Skipped};
use super::sink::{AlertChannel, Delivery};
use super::state::AlertState;

/// What one evaluation did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    pub fired: Vec<Alert>,
    pub skipped: Vec<Skipped>,
    pub resolved: Vec<Alert>,
}

impl Outcome {
    pub fn merge(&mut self, other: Outcome) {
        self.fired.extend(other.fired);
        self.skipped.extend(other.skipped);
        self.resolved.extend(other.resolved);
    }
}

/// Fires and resolves alerts against a set of channels.
#[derive(Debug, Default)]
pub struct AlertEngine {
    channels: Vec<Box<dyn AlertChannel>>,
    policy: CooldownPolicy,
}

impl AlertEngine {
    pub fn new(policy: CooldownPolicy) -> Self {
        Self {
            channels: Vec::new(),
            policy,
        }
    }

    /// Add a channel. Channels are invoked in the order they were added.
    pub fn with_channel(mut self, channel: Box<dyn AlertChannel>) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Decide on `candidates` for the `evaluated` monitors and apply the result
    /// to `state`.
    pub async fn process(
        &self,
        candidates: &[Alert],
        evaluated: &[Monitor],
        state: &mut AlertState,
        now: DateTime<Utc>,
    ) -> Outcome {
        let decision = decide(candidates, &state.alerts, &state.cooldowns, evaluated, now);

        for skipped in &decision.to_skip {
            debug!("Skipping {} ({})", skipped.alert.title(), skipped.reason);
        }

        let mut outcome = Outcome {
            skipped: decision.to_skip,
            ..Default::default()
        };

        for alert in decision.to_fire {
            let fired = self.fire(alert, state, now).await;
            outcome.fired.push(fired);
        }

        for id in &decision.to_resolve {
            if let Some(resolved) = self.resolve(id, state, now).await {
                outcome.resolved.push(resolved);
            }
        }

        outcome
    }

    /// Fire one alert: start its cooldown, offer it to every channel once and
    /// append it to the log.
    ///
    /// The alert counts as delivered when at least one channel accepted it.
    /// Channel failures are logged and never undo the other side effects.
    pub async fn fire(
        &self,
        mut alert: Alert,
        state: &mut AlertState,
        now: DateTime<Utc>,
    ) -> Alert {
        let window = self.policy.window_for(alert.severity);
        state.cooldowns.set(alert.monitor, alert.cooldown_key(), now, window);

        for channel in &self.channels {
            match channel.deliver(&alert).await {
                Ok(Delivery::Sent) => alert.delivered = true,
                Ok(Delivery::Issue {
                    number,
                    url,
                    created_at,
                }) => {
                    alert.delivered = true;
                    alert.issue_number = Some(number);
                    alert.issue_url = Some(url);
                    alert.issue_created_at = Some(created_at);
                }
                Err(e) => warn!(
                    "{} could not deliver {}: {}",
                    channel.name(),
                    alert.title(),
                    e
                ),
            }
        }

        if alert.delivered {
            info!("Fired {}", alert.title());
        } else {
            warn!("No channel accepted {}", alert.title());
        }

        state.alerts.push(alert.clone());
        alert
    }

    /// Mark the alert `id` resolved and tell every channel.
    pub async fn resolve(
        &self,
        id: &str,
        state: &mut AlertState,
        now: DateTime<Utc>,
    ) -> Option<Alert> {
        let alert = state.find_mut(id)?;
        if !alert.is_open() {
            return None;
        }
        alert.resolve(now);
        let alert = alert.clone();

        for channel in &self.channels {
            if let Err(e) = channel.resolve(&alert).await {
                warn!("{} could not resolve {}: {}", channel.name(), alert.title(), e);
            }
        }

        info!("Resolved {}", alert.title());
        Some(alert)
    }
}
