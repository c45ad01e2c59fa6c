//! Delivery of envelope batches to the remote collector.
//!
//! One HTTP POST per invocation: the batch is serialized as a JSON array and
//! sent with an `Authorization: ApiKey <key>` header. Delivery is attempted
//! synchronously within the invocation's report phase — nothing is queued
//! across invocations — but every failure mode is contained here: transport
//! errors, non-success statuses and serialization failures are logged and the
//! invocation's own outcome is never affected.
//!
//! The reporter owns only its HTTP client; it retains nothing about a batch
//! after the send attempt.

use crate::config::MonitorConfig;
use crate::constants::data_model;
use crate::envelope::Envelope;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use thiserror::Error;

/// Failure modes of one delivery attempt. Never escalated past [`Reporter::send`].
#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("failed to serialize batch: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to deliver batch: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("collector returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid authorization credential")]
    Credential,
}

/// Posts envelope batches to the configured collector endpoint.
pub struct Reporter {
    client: Client,
    endpoint: String,
    debug: bool,
}

impl Reporter {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.collector_endpoint.clone(),
            debug: config.debug,
        }
    }

    /// Attempts to deliver the batch, containing every failure.
    ///
    /// A reporting failure must never mask or replace the invocation's own
    /// outcome, so this method has no failure mode of its own: errors are
    /// logged on the diagnostic channel and dropped.
    pub async fn send(&self, batch: &[Envelope]) {
        if batch.is_empty() {
            tracing::debug!("empty batch, nothing to report");
            return;
        }
        if self.endpoint.is_empty() {
            tracing::debug!("no collector endpoint configured, dropping batch");
            return;
        }

        match self.try_send(batch).await {
            Ok(()) => {
                tracing::debug!(envelopes = batch.len(), "batch delivered");
            }
            Err(error) => {
                tracing::warn!(
                    endpoint = %self.endpoint,
                    envelopes = batch.len(),
                    error = %error,
                    "failed to report batch"
                );
            }
        }
    }

    async fn try_send(&self, batch: &[Envelope]) -> Result<(), ReporterError> {
        let payload = serde_json::to_vec(batch)?;

        if self.debug {
            tracing::debug!(
                body = %String::from_utf8_lossy(&payload),
                "sending monitoring batch"
            );
        }

        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.headers(batch)?)
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "could not read response body".to_string());
            return Err(ReporterError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }

    fn headers(&self, batch: &[Envelope]) -> Result<HeaderMap, ReporterError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        // The credential travels on the envelopes themselves; any stamped
        // envelope in the batch carries the invocation's key.
        if let Some(api_key) = batch.iter().map(|e| &e.api_key).find(|k| !k.is_empty()) {
            let value = format!("{} {}", data_model::AUTH_SCHEME, api_key);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&value).map_err(|_| ReporterError::Credential)?,
            );
        }

        Ok(headers)
    }
}
