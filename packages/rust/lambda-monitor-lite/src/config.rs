//! Monitoring configuration, resolved once at agent initialization.
//!
//! Configuration is built programmatically through the builder and then
//! overridden by the environment: a variable that is set always wins over the
//! builder value, so deployed functions can be reconfigured without a code
//! change while tests inject values directly.
//!
//! Boolean flags parse `true`/`1` and `false`/`0` (case-insensitive). A
//! malformed value resolves to `false` and logs a warning; it never fails
//! initialization.
//!
//! # Example
//!
//! ```no_run
//! use lambda_monitor_lite::MonitorConfig;
//!
//! let config = MonitorConfig::builder()
//!     .api_key("my-key".to_string())
//!     .collector_endpoint("https://collector.example.com/v2/monitoring".to_string())
//!     .hide_request(true)
//!     .build();
//! ```

use crate::constants::{defaults, env_vars};
use crate::plugins::log::LogLevel;
use bon::Builder;
use std::env;

/// Parses a boolean environment flag.
///
/// Returns `None` when the variable is unset or empty, `Some(false)` with a
/// logged warning when the value is malformed.
pub(crate) fn env_flag(name: &str) -> Option<bool> {
    match env::var(name) {
        Ok(value) => match value.trim().to_lowercase().as_str() {
            "" => None,
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            other => {
                tracing::warn!(
                    variable = name,
                    value = other,
                    "invalid boolean flag, defaulting to false"
                );
                Some(false)
            }
        },
        Err(_) => None,
    }
}

fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Per-category disable toggles for the metric plugin.
///
/// Each toggle suppresses only its own gauge envelope.
#[derive(Debug, Clone, Default)]
pub struct MetricToggles {
    pub disable_cpu: bool,
    pub disable_memory: bool,
    pub disable_disk: bool,
    pub disable_network: bool,
    pub disable_threads: bool,
    pub disable_load: bool,
}

impl MetricToggles {
    fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_flag(env_vars::DISABLE_CPU_METRICS) {
            self.disable_cpu = v;
        }
        if let Some(v) = env_flag(env_vars::DISABLE_MEMORY_METRICS) {
            self.disable_memory = v;
        }
        if let Some(v) = env_flag(env_vars::DISABLE_DISK_METRICS) {
            self.disable_disk = v;
        }
        if let Some(v) = env_flag(env_vars::DISABLE_NETWORK_METRICS) {
            self.disable_network = v;
        }
        if let Some(v) = env_flag(env_vars::DISABLE_THREAD_METRICS) {
            self.disable_threads = v;
        }
        if let Some(v) = env_flag(env_vars::DISABLE_LOAD_METRICS) {
            self.disable_load = v;
        }
        self
    }
}

/// Configuration for the monitoring agent.
///
/// Use [`MonitorConfig::default`] for environment-driven configuration, or
/// the builder to set values programmatically. Environment variables take
/// precedence over builder values when both are present.
#[derive(Builder, Debug, Clone)]
pub struct MonitorConfig {
    /// Credential stamped on every envelope and sent to the collector.
    #[builder(default)]
    pub api_key: String,

    /// Collector endpoint batches are posted to. When empty, batches are
    /// dropped with a debug log instead of being sent.
    #[builder(default)]
    pub collector_endpoint: String,

    /// Replace the captured request payload with the redaction marker.
    #[builder(default = false)]
    pub hide_request: bool,

    /// Replace the captured response payload with the redaction marker.
    #[builder(default = false)]
    pub hide_response: bool,

    /// Per-category metric disable toggles.
    #[builder(default)]
    pub metric_toggles: MetricToggles,

    /// Margin under which remaining time to the deadline counts as a timeout.
    #[builder(default = defaults::TIMEOUT_MARGIN_MS)]
    pub timeout_margin_ms: u64,

    /// Log the serialized batch before posting it.
    #[builder(default = false)]
    pub debug: bool,

    /// Minimum level captured by the monitored logger.
    #[builder(default = LogLevel::Info)]
    pub log_level: LogLevel,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl MonitorConfig {
    /// Applies environment overrides on top of the builder values.
    ///
    /// Called once by `init_monitoring`; the resolved configuration is shared
    /// read-only for the lifetime of the process.
    pub(crate) fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_string(env_vars::API_KEY) {
            self.api_key = v;
        }
        if let Some(v) = env_string(env_vars::COLLECTOR_ENDPOINT) {
            self.collector_endpoint = v;
        }
        if let Some(v) = env_flag(env_vars::HIDE_REQUEST) {
            self.hide_request = v;
        }
        if let Some(v) = env_flag(env_vars::HIDE_RESPONSE) {
            self.hide_response = v;
        }
        if let Some(v) = env_flag(env_vars::DEBUG) {
            self.debug = v;
        }
        if let Some(v) = env_string(env_vars::TIMEOUT_MARGIN_MS) {
            match v.parse() {
                Ok(ms) => self.timeout_margin_ms = ms,
                Err(_) => tracing::warn!(
                    variable = env_vars::TIMEOUT_MARGIN_MS,
                    value = %v,
                    "invalid timeout margin, keeping configured value"
                ),
            }
        }
        if let Some(v) = env_string(env_vars::LOG_LEVEL) {
            self.log_level = LogLevel::resolve(&v);
        }
        self.metric_toggles = self.metric_toggles.with_env_overrides();
        self
    }
}
