//! Constants for the lambda-monitor-lite package.
//!
//! This file centralizes all constants to ensure consistency across the codebase
//! and provide a single source of truth for configuration parameters.

/// Environment variable names for configuration.
pub mod env_vars {
    /// API key attached to every envelope and used for collector authentication.
    pub const API_KEY: &str = "LAMBDA_MONITOR_API_KEY";

    /// Collector endpoint the reporter posts batches to.
    pub const COLLECTOR_ENDPOINT: &str = "LAMBDA_MONITOR_COLLECTOR_ENDPOINT";

    /// Replace the captured request payload with a redaction marker.
    pub const HIDE_REQUEST: &str = "LAMBDA_MONITOR_HIDE_REQUEST";

    /// Replace the captured response payload with a redaction marker.
    pub const HIDE_RESPONSE: &str = "LAMBDA_MONITOR_HIDE_RESPONSE";

    /// Suppress the CPU gauge envelope.
    pub const DISABLE_CPU_METRICS: &str = "LAMBDA_MONITOR_DISABLE_CPU_METRICS";

    /// Suppress the memory gauge envelope.
    pub const DISABLE_MEMORY_METRICS: &str = "LAMBDA_MONITOR_DISABLE_MEMORY_METRICS";

    /// Suppress the disk I/O gauge envelope.
    pub const DISABLE_DISK_METRICS: &str = "LAMBDA_MONITOR_DISABLE_DISK_METRICS";

    /// Suppress the network I/O gauge envelope.
    pub const DISABLE_NETWORK_METRICS: &str = "LAMBDA_MONITOR_DISABLE_NETWORK_METRICS";

    /// Suppress the thread-count gauge envelope.
    pub const DISABLE_THREAD_METRICS: &str = "LAMBDA_MONITOR_DISABLE_THREAD_METRICS";

    /// Suppress the load-average gauge envelope.
    pub const DISABLE_LOAD_METRICS: &str = "LAMBDA_MONITOR_DISABLE_LOAD_METRICS";

    /// Margin, in milliseconds, under which the remaining time to the platform
    /// deadline is reported as a timeout.
    pub const TIMEOUT_MARGIN_MS: &str = "LAMBDA_MONITOR_TIMEOUT_MARGIN_MS";

    /// Log the serialized batch before posting it.
    pub const DEBUG: &str = "LAMBDA_MONITOR_DEBUG";

    /// Minimum level captured by the monitored logger (error, warn, info, debug).
    pub const LOG_LEVEL: &str = "LAMBDA_MONITOR_LOG_LEVEL";

    /// AWS Lambda function name (used as the reported function name).
    pub const AWS_LAMBDA_FUNCTION_NAME: &str = "AWS_LAMBDA_FUNCTION_NAME";
}

/// Default values for configuration parameters.
pub mod defaults {
    /// Default timeout margin in milliseconds.
    pub const TIMEOUT_MARGIN_MS: u64 = 200;

    /// Default minimum captured log level.
    pub const LOG_LEVEL: &str = "info";
}

/// Wire-format constants for the monitoring data model.
pub mod data_model {
    /// Schema version stamped on every envelope.
    pub const VERSION: &str = "2.0";

    /// Envelope type for invocation spans.
    pub const SPAN_TYPE: &str = "Span";

    /// Envelope type for process/runtime gauges.
    pub const METRIC_TYPE: &str = "Metric";

    /// Envelope type for captured log records.
    pub const LOG_TYPE: &str = "Log";

    /// Placeholder substituted for hidden request/response payloads.
    pub const REDACTION_MARKER: &str = "<redacted>";

    /// Authorization scheme expected by the collector.
    pub const AUTH_SCHEME: &str = "ApiKey";
}
