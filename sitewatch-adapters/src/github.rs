//! GitHub issues adapter using the REST API.
//!
//! Tracking issues are the durable side of an alert: one issue per fired
//! alert, closed again when a later run no longer sees the condition.
//!
//! ## Example
//!
//! ```rust,no_run
//! use sitewatch_adapters::github::GitHubClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GitHubClient::builder()
//!         .repository("octocat", "portfolio")
//!         .token(std::env::var("GITHUB_TOKEN")?)
//!         .build();
//!
//!     for issue in client.list_open_issues(&["sitewatch"]).await? {
//!         println!("#{} {}", issue.number, issue.title);
//!     }
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};

use sitewatch_types::Alert;

use crate::AdapterError;

const DEFAULT_ENDPOINT: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("sitewatch/", env!("CARGO_PKG_VERSION"));

/// A GitHub issue as returned by the REST API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub html_url: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

impl Issue {
    /// The issues endpoint also returns pull requests; this tells them apart.
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

/// Request body for creating an issue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
}

impl NewIssue {
    /// Render an alert as an issue carrying the base labels plus the
    /// alert's monitor and severity.
    pub fn from_alert(alert: &Alert, base_labels: &[String]) -> Self {
        let mut labels: Vec<String> = base_labels.to_vec();
        labels.push(alert.monitor.as_str().to_string());
        labels.push(alert.severity.as_str().to_string());

        let value = alert.value.map(|v| format!("{}", v)).unwrap_or_else(|| "-".into());
        let threshold = alert
            .threshold
            .map(|v| format!("{}", v))
            .unwrap_or_else(|| "-".into());

        let body = format!(
            "## {}\n\n{}\n\n| Field | Value |\n|---|---|\n| Subject | {} |\n| Category | {} |\n| Type | {} |\n| Severity | {} |\n| Value | {} |\n| Threshold | {} |\n| Detected | {} |\n\n_Opened by sitewatch. The issue is closed automatically once the condition clears._\n",
            alert.title(),
            alert.message,
            alert.subject_label(),
            alert.category,
            alert.alert_type.as_str(),
            alert.severity.as_str(),
            value,
            threshold,
            alert.timestamp.to_rfc3339(),
        );

        Self {
            title: alert.title(),
            body,
            labels,
        }
    }
}

/// Client for one repository's issues.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    endpoint: String,
    owner: String,
    repo: String,
    token: Option<String>,
}

impl GitHubClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> GitHubClientBuilder {
        GitHubClientBuilder::default()
    }

    /// Whether a token is available. Without one every call is refused.
    pub fn is_configured(&self) -> bool {
        self.token.is_some()
    }

    /// Whether both owner and repository name are set.
    pub fn has_repository(&self) -> bool {
        !self.owner.is_empty() && !self.repo.is_empty()
    }

    /// `owner/repo`.
    pub fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Create an issue.
    pub async fn create_issue(&self, issue: &NewIssue) -> Result<Issue, AdapterError> {
        let url = format!("{}/repos/{}/{}/issues", self.endpoint, self.owner, self.repo);
        let response = self.authorized(self.client.post(&url))?.json(issue).send().await?;
        let response = check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| AdapterError::Parse(e.to_string()))
    }

    /// List open issues carrying every one of `labels`. Pull requests are skipped.
    pub async fn list_open_issues(&self, labels: &[&str]) -> Result<Vec<Issue>, AdapterError> {
        let url = format!("{}/repos/{}/{}/issues", self.endpoint, self.owner, self.repo);
        let labels = labels.join(",");
        let request = self.client.get(&url).query(&[
            ("state", "open"),
            ("labels", labels.as_str()),
            ("per_page", "100"),
        ]);
        let response = self.authorized(request)?.send().await?;
        let response = check_status(response).await?;

        let issues: Vec<Issue> = response
            .json()
            .await
            .map_err(|e| AdapterError::Parse(e.to_string()))?;

        Ok(issues.into_iter().filter(|i| !i.is_pull_request()).collect())
    }

    /// Close an issue, leaving `comment` on it first when given.
    pub async fn close_issue(
        &self,
        number: u64,
        comment: Option<&str>,
    ) -> Result<(), AdapterError> {
        if let Some(body) = comment {
            let url = format!(
                "{}/repos/{}/{}/issues/{}/comments",
                self.endpoint, self.owner, self.repo, number
            );
            let request = self.client.post(&url).json(&serde_json::json!({ "body": body }));
            check_status(self.authorized(request)?.send().await?).await?;
        }

        let url = format!(
            "{}/repos/{}/{}/issues/{}",
            self.endpoint, self.owner, self.repo, number
        );
        let request = self
            .client
            .patch(&url)
            .json(&serde_json::json!({ "state": "closed", "state_reason": "completed" }));
        check_status(self.authorized(request)?.send().await?).await?;

        Ok(())
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, AdapterError> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| AdapterError::NotConfigured("GitHub token".to_string()))?;

        Ok(request
            .bearer_auth(token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .header("User-Agent", USER_AGENT))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, AdapterError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(AdapterError::Auth(format!("GitHub returned status {}", status)));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AdapterError::Http(format!(
            "GitHub returned status {}: {}",
            status,
            body.trim()
        )));
    }
    Ok(response)
}

/// Builder for GitHubClient.
#[derive(Debug, Default)]
pub struct GitHubClientBuilder {
    endpoint: Option<String>,
    owner: Option<String>,
    repo: Option<String>,
    token: Option<String>,
    timeout: Option<Duration>,
}

impl GitHubClientBuilder {
    /// Set the API endpoint (default: "https://api.github.com").
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the repository the issues live in.
    pub fn repository(mut self, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self.repo = Some(repo.into());
        self
    }

    /// Set the API token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the token only if present, convenient with `std::env::var(..).ok()`.
    pub fn token_opt(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client.
    pub fn build(self) -> GitHubClient {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        GitHubClient {
            client,
            endpoint: self
                .endpoint
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
                .trim_end_matches('/')
                .to_string(),
            owner: self.owner.unwrap_or_default(),
            repo: self.repo.unwrap_or_default(),
            token: self.token,
        }
    }
}
