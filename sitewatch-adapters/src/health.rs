//! Function health probe.
//!
//! Times a single GET against a serverless function endpoint. The probe never
//! fails as such: transport errors and non-2xx responses come back as a
//! record with `error` set so the history keeps the failure.

use std::time::{Duration, Instant};

use chrono::Utc;
use reqwest::Client;

use sitewatch_types::MeasurementRecord;

use crate::AdapterError;

/// Metric name for the measured round-trip time in milliseconds.
pub const RESPONSE_TIME: &str = "responseTime";

/// Metric name for the HTTP status code.
pub const STATUS_CODE: &str = "statusCode";

/// HTTP probe for function endpoints.
#[derive(Debug, Clone)]
pub struct FunctionProbe {
    client: Client,
}

impl FunctionProbe {
    /// Create a probe whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }

    /// Probe `url` on behalf of the function `name`.
    pub async fn check(&self, name: &str, url: &str) -> MeasurementRecord {
        let at = Utc::now();
        let started = Instant::now();

        let mut record = match self.client.get(url).send().await {
            Ok(response) => {
                let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                let status = response.status();

                let mut record = MeasurementRecord::builder(name)
                    .timestamp(at)
                    .metric(RESPONSE_TIME, (elapsed_ms * 100.0).round() / 100.0)
                    .metric(STATUS_CODE, f64::from(status.as_u16()))
                    .build();
                if !status.is_success() {
                    record.error = Some(format!("HTTP {}", status));
                }
                record
            }
            Err(e) => MeasurementRecord::failure(name, at, AdapterError::from(e).to_string()),
        };

        record.url = Some(url.to_string());
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn serve_once(response: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{}/health", addr)
    }

    #[tokio::test]
    async fn test_successful_probe_records_timing() {
        let response = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok";
        let url = serve_once(response).await;
        let probe = FunctionProbe::new(Duration::from_secs(5));

        let record = probe.check("contact", &url).await;
        assert!(record.is_success());
        assert_eq!(record.subject, "contact");
        assert_eq!(record.url.as_deref(), Some(url.as_str()));
        assert_eq!(record.metric(STATUS_CODE), Some(200.0));
        assert!(record.metric(RESPONSE_TIME).unwrap() >= 0.0);
    }

    #[tokio::test]
    async fn test_error_status_is_recorded_as_failure() {
        let url = serve_once(
            b"HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        let probe = FunctionProbe::new(Duration::from_secs(5));

        let record = probe.check("newsletter", &url).await;
        assert!(!record.is_success());
        assert!(record.error.as_deref().unwrap().contains("503"));
        assert_eq!(record.metric(STATUS_CODE), Some(503.0));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        // Bind and drop to get a port nothing listens on.
        let addr = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();
        let probe = FunctionProbe::new(Duration::from_secs(2));

        let record = probe.check("contact", &format!("http://{}/", addr)).await;
        assert!(!record.is_success());
        assert!(record.metrics.is_empty());
    }
}
