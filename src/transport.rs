// transport.rs
// Purpose: Wire format and delivery seam for the remote batched destination

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{LogshipError, LogshipResult};
use crate::record::LogRecord;

/// JSON body of a batch POST. Any 2xx response counts as delivered;
/// everything else enters the retry path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPayload {
    pub logs: Vec<LogRecord>,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "userAgent", skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl BatchPayload {
    pub fn new(logs: Vec<LogRecord>) -> Self {
        // Batch-level ambient fields mirror the newest record in the batch.
        let user_agent = logs.iter().rev().find_map(|r| r.client_agent.clone());
        let url = logs.iter().rev().find_map(|r| r.location.clone());
        BatchPayload {
            logs,
            timestamp: Utc::now(),
            user_agent,
            url,
        }
    }
}

/// Delivery capability used by the remote destination.
///
/// `send_batch` is the observed, retryable path and may block; it is always
/// driven from a blocking-allowed thread. `send_unobserved` is the teardown
/// fire-and-forget path; returns false when the transport has no such
/// primitive.
pub trait LogTransport: Send + Sync {
    fn send_batch(&self, payload: &BatchPayload) -> LogshipResult<()>;

    fn send_unobserved(&self, payload: &BatchPayload) -> bool {
        let _ = payload;
        false
    }
}

/// HTTP transport over a blocking reqwest client.
///
/// The client is built lazily on the first send: observed sends always run
/// on a blocking-allowed thread, which is where a blocking client belongs.
pub struct HttpTransport {
    endpoint: String,
    headers: Vec<(String, String)>,
    timeout: Duration,
    client: std::sync::OnceLock<reqwest::blocking::Client>,
}

impl HttpTransport {
    pub fn new(
        endpoint: impl Into<String>,
        headers: Vec<(String, String)>,
        timeout: Duration,
    ) -> Self {
        HttpTransport {
            endpoint: endpoint.into(),
            headers,
            timeout,
            client: std::sync::OnceLock::new(),
        }
    }

    fn client(&self) -> LogshipResult<&reqwest::blocking::Client> {
        if self.client.get().is_none() {
            let built = reqwest::blocking::Client::builder()
                .timeout(self.timeout)
                .build()
                .map_err(|e| LogshipError::network("build http client", e))?;
            let _ = self.client.set(built);
        }
        self.client
            .get()
            .ok_or_else(|| LogshipError::internal("http client initialization"))
    }

    fn post(&self, payload: &BatchPayload) -> LogshipResult<()> {
        let mut request = self.client()?.post(&self.endpoint).json(payload);
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .map_err(|e| LogshipError::network("send log batch", e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(LogshipError::RemoteStatus {
                status: response.status().as_u16(),
            })
        }
    }
}

impl LogTransport for HttpTransport {
    fn send_batch(&self, payload: &BatchPayload) -> LogshipResult<()> {
        self.post(payload)
    }

    /// Detached last-gasp send used at teardown; outcome deliberately
    /// dropped. Runs on its own thread so it is safe from any context.
    fn send_unobserved(&self, payload: &BatchPayload) -> bool {
        let endpoint = self.endpoint.clone();
        let headers = self.headers.clone();
        let Ok(body) = serde_json::to_vec(payload) else {
            return false;
        };

        std::thread::spawn(move || {
            let Ok(client) = reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(3))
                .build()
            else {
                return;
            };
            let mut request = client
                .post(&endpoint)
                .header("Content-Type", "application/json")
                .body(body);
            for (name, value) in &headers {
                request = request.header(name.as_str(), value.as_str());
            }
            let _ = request.send();
        });
        true
    }
}
