//! Slack incoming-webhook adapter.

use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};

use sitewatch_types::{Alert, Severity};

use crate::AdapterError;

/// Posts alert messages to a Slack incoming webhook.
#[derive(Debug, Clone)]
pub struct SlackWebhook {
    client: Client,
    url: String,
}

impl SlackWebhook {
    /// Create a webhook client. Returns `None` for a missing or blank URL so
    /// callers can skip the channel without further checks.
    pub fn new(url: Option<String>, timeout: Duration) -> Option<Self> {
        let url = url.filter(|u| !u.trim().is_empty())?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Some(Self { client, url })
    }

    /// Post a structured message.
    pub async fn post(&self, message: &Value) -> Result<(), AdapterError> {
        let response = self.client.post(&self.url).json(message).send().await?;

        if !response.status().is_success() {
            return Err(AdapterError::Http(format!(
                "Slack webhook returned status {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// Post an alert.
    pub async fn post_alert(&self, alert: &Alert) -> Result<(), AdapterError> {
        self.post(&alert_message(alert)).await
    }
}

fn severity_emoji(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => ":red_circle:",
        Severity::Warning => ":large_yellow_circle:",
        Severity::Info => ":large_blue_circle:",
    }
}

/// Render an alert as a Slack block-kit message.
pub fn alert_message(alert: &Alert) -> Value {
    let mut fields = vec![
        json!({ "type": "mrkdwn", "text": format!("*Subject:*\n{}", alert.subject_label()) }),
        json!({ "type": "mrkdwn", "text": format!("*Category:*\n{}", alert.category) }),
        json!({ "type": "mrkdwn", "text": format!("*Severity:*\n{}", alert.severity.as_str()) }),
    ];
    if let Some(value) = alert.value {
        fields.push(json!({ "type": "mrkdwn", "text": format!("*Value:*\n{}", value) }));
    }
    if let Some(url) = &alert.issue_url {
        fields.push(json!({ "type": "mrkdwn", "text": format!("*Issue:*\n<{}>", url) }));
    }

    json!({
        "text": format!("{} {}", severity_emoji(alert.severity), alert.title()),
        "blocks": [
            {
                "type": "header",
                "text": { "type": "plain_text", "text": alert.title() }
            },
            {
                "type": "section",
                "text": { "type": "mrkdwn", "text": alert.message },
                "fields": fields
            }
        ]
    })
}
