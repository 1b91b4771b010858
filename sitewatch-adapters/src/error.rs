//! Error types for adapters.

use thiserror::Error;

/// Errors that can occur when talking to an external collaborator.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// HTTP request failed or returned a non-success status.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Failed to parse a response or report.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for a response or a child process.
    #[error("Request timed out")]
    Timeout,

    /// The collaborator is missing required configuration (token, URL).
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// Spawning or waiting on a child process failed.
    #[error("Process failed: {0}")]
    Process(String),
}

#[cfg(any(feature = "github", feature = "slack", feature = "health"))]
impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AdapterError::Timeout
        } else if err.is_connect() {
            AdapterError::Connection(err.to_string())
        } else {
            AdapterError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(err: serde_json::Error) -> Self {
        AdapterError::Parse(err.to_string())
    }
}
