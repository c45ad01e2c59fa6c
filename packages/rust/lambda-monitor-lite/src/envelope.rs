//! The monitoring data envelope: the tagged wire record that lets structurally
//! different telemetry (spans, gauges, log records) travel through one
//! reporting channel.
//!
//! An [`Envelope`] pairs an opaque payload with the discriminator a downstream
//! consumer needs to decode it, plus the auth/version metadata required for
//! transport:
//!
//! ```json
//! {
//!   "type": "Metric",
//!   "apiKey": "...",
//!   "dataModelVersion": "2.0",
//!   "data": { ... }
//! }
//! ```
//!
//! Envelopes are created by plugins via [`Envelope::wrap`] and stamped with
//! the invocation's API key by the pipeline before they reach the reporter.
//! Once created an envelope is never mutated in place; stamping consumes and
//! re-yields the value.

use crate::constants::data_model;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered sequence of envelopes produced for one invocation outcome,
/// sent to the collector as one reporting unit.
pub type Batch = Vec<Envelope>;

/// A typed wrapper pairing a telemetry payload with its discriminator and
/// auth/version metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Discriminator identifying the payload shape ("Span", "Metric", "Log").
    #[serde(rename = "type")]
    pub kind: String,
    /// Credential associated with the reporting destination.
    pub api_key: String,
    /// Schema version string for forward compatibility.
    pub data_model_version: String,
    /// Opaque payload matching `kind`.
    pub data: Value,
}

impl Envelope {
    /// Wraps a telemetry payload with its type discriminator.
    ///
    /// Pure and total: any payload/type pairing yields a well-formed envelope.
    /// The API key is left empty here; the pipeline stamps it before the
    /// envelope leaves the process.
    pub fn wrap(data: Value, kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            api_key: String::new(),
            data_model_version: data_model::VERSION.to_string(),
            data,
        }
    }

    /// Returns the envelope stamped with the given API key.
    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = api_key.to_string();
        self
    }
}
