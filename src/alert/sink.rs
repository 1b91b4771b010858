//! Alert sink channels.
//!
//! Every fired alert is offered to each enabled channel exactly once. A
//! channel that is not configured is simply not built, so the engine never
//! has to ask whether GitHub or Slack is available.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sitewatch_adapters::github::{GitHubClient, NewIssue};
use sitewatch_adapters::slack::SlackWebhook;
use sitewatch_adapters::AdapterError;
use sitewatch_types::Alert;
use tracing::{debug, info, warn};

/// What a channel did with an alert.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// Delivered, nothing to record.
    Sent,
    /// Tracked by an issue, either new or already open with the same title.
    Issue {
        number: u64,
        url: String,
        created_at: DateTime<Utc>,
    },
}

/// A destination for alerts.
#[async_trait]
pub trait AlertChannel: Send + Sync + Debug {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Deliver a newly fired alert.
    async fn deliver(&self, alert: &Alert) -> Result<Delivery, AdapterError>;

    /// Tell the channel an alert has cleared. Most channels have nothing to do.
    async fn resolve(&self, _alert: &Alert) -> Result<(), AdapterError> {
        Ok(())
    }
}

/// Prints a one-line summary per alert. Always succeeds.
#[derive(Debug, Default)]
pub struct ConsoleChannel;

#[async_trait]
impl AlertChannel for ConsoleChannel {
    fn name(&self) -> &str {
        "console"
    }

    async fn deliver(&self, alert: &Alert) -> Result<Delivery, AdapterError> {
        println!("  {} {}", alert.title(), alert.message);
        Ok(Delivery::Sent)
    }

    async fn resolve(&self, alert: &Alert) -> Result<(), AdapterError> {
        println!("  [OK] {} {} cleared", alert.subject_label(), alert.category);
        Ok(())
    }
}

/// Opens a tracking issue per alert and closes it on resolution.
#[derive(Debug)]
pub struct GitHubChannel {
    client: GitHubClient,
    labels: Vec<String>,
}

impl GitHubChannel {
    /// Build the channel, or `None` with a warning when there is no token or
    /// no repository to file issues in.
    pub fn new(client: GitHubClient, labels: Vec<String>) -> Option<Self> {
        if !client.is_configured() {
            warn!("GITHUB_TOKEN is not set; GitHub issue alerts are disabled");
            return None;
        }
        if !client.has_repository() {
            warn!("No GitHub repository configured; GitHub issue alerts are disabled");
            return None;
        }
        Some(Self { client, labels })
    }
}

#[async_trait]
impl AlertChannel for GitHubChannel {
    fn name(&self) -> &str {
        "github"
    }

    async fn deliver(&self, alert: &Alert) -> Result<Delivery, AdapterError> {
        let request = NewIssue::from_alert(alert, &self.labels);

        let mut filter: Vec<&str> = self.labels.iter().map(String::as_str).collect();
        filter.push(alert.monitor.as_str());
        let open = self.client.list_open_issues(&filter).await?;

        let issue = match open.into_iter().find(|i| i.title == request.title) {
            Some(existing) => {
                debug!("Reusing open issue #{} for {}", existing.number, existing.title);
                existing
            }
            None => {
                let created = self.client.create_issue(&request).await?;
                info!("Opened issue #{} in {}", created.number, self.client.repository());
                created
            }
        };

        Ok(Delivery::Issue {
            number: issue.number,
            url: issue.html_url,
            created_at: issue.created_at,
        })
    }

    async fn resolve(&self, alert: &Alert) -> Result<(), AdapterError> {
        let Some(number) = alert.issue_number else {
            return Ok(());
        };
        let comment = format!(
            "Resolved: {} {} is back within limits.",
            alert.subject_label(),
            alert.category
        );
        self.client.close_issue(number, Some(&comment)).await?;
        info!("Closed issue #{}", number);
        Ok(())
    }
}

/// Posts alerts to a Slack webhook.
#[derive(Debug)]
pub struct SlackChannel {
    webhook: SlackWebhook,
}

impl SlackChannel {
    /// `None` when no webhook URL is configured.
    pub fn new(url: Option<String>, timeout: Duration) -> Option<Self> {
        SlackWebhook::new(url, timeout).map(|webhook| Self { webhook })
    }
}

#[async_trait]
impl AlertChannel for SlackChannel {
    fn name(&self) -> &str {
        "slack"
    }

    async fn deliver(&self, alert: &Alert) -> Result<Delivery, AdapterError> {
        self.webhook.post_alert(alert).await?;
        Ok(Delivery::Sent)
    }
}
