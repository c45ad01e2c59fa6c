//! Invocation monitoring for AWS Lambda functions.
//!
//! This crate wraps a Lambda handler with a monitoring lifecycle: a set of
//! independent plugins runs around each invocation, produces heterogeneous
//! telemetry (one span per invocation, process/runtime gauges, captured log
//! records), and the collected batch is shipped to a remote collector over an
//! authenticated HTTP channel. Monitoring is strictly observational — a
//! broken collector or a misbehaving plugin can never change the outcome of
//! the wrapped function.
//!
//! # Architecture
//!
//! The crate is organized into several modules, each handling one aspect of
//! the pipeline:
//!
//! - [`agent`]: initialization and the shared [`MonitoringAgent`] handle
//! - [`handler`]: the invocation coordinator wrapping the user handler
//! - [`pipeline`]: the plugin registry and hook runner
//! - [`plugin`]: the plugin capability (three lifecycle hooks)
//! - [`plugins`]: the built-in trace, metric and log plugins
//! - [`envelope`]: the tagged wire record all telemetry travels in
//! - [`reporter`]: authenticated delivery to the collector
//!
//! # Quick Start
//!
//! ```no_run
//! use lambda_monitor_lite::{init_monitoring, monitored_handler, MonitorConfig};
//! use lambda_runtime::{service_fn, Error, LambdaEvent};
//! use serde_json::Value;
//!
//! async fn handler(event: LambdaEvent<Value>) -> Result<Value, Error> {
//!     Ok(event.payload)
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let agent = init_monitoring(MonitorConfig::default())?;
//!
//!     lambda_runtime::run(service_fn(|event: LambdaEvent<Value>| {
//!         monitored_handler(agent.clone(), event, handler)
//!     }))
//!     .await
//! }
//! ```
//!
//! # Lifecycle
//!
//! Each invocation moves through a fixed sequence: the before hooks of all
//! plugins run concurrently and are joined before the handler starts; the
//! handler runs with panic interception; exactly one of the after/panic hook
//! phases runs, sequentially in plugin registration order so the batch is
//! deterministic; the batch is reported before control returns. A handler
//! panic is re-raised to the runtime unchanged after its telemetry has been
//! shipped.
//!
//! # Configuration
//!
//! Configuration is resolved once at [`init_monitoring`]: builder values
//! first, then environment variables, which take precedence:
//!
//! - `LAMBDA_MONITOR_API_KEY`: collector credential
//! - `LAMBDA_MONITOR_COLLECTOR_ENDPOINT`: where batches are posted
//! - `LAMBDA_MONITOR_HIDE_REQUEST` / `LAMBDA_MONITOR_HIDE_RESPONSE`:
//!   redact captured payloads
//! - `LAMBDA_MONITOR_DISABLE_<CATEGORY>_METRICS`: suppress individual gauges
//!   (CPU, MEMORY, DISK, NETWORK, THREAD, LOAD)
//! - `LAMBDA_MONITOR_TIMEOUT_MARGIN_MS`: deadline margin reported as timeout
//! - `LAMBDA_MONITOR_LOG_LEVEL`: minimum captured log level
//! - `LAMBDA_MONITOR_DEBUG`: log batches before posting
//!
//! See the [`config`] module for details.

pub mod agent;
pub mod config;
pub mod constants;
pub mod context;
pub mod envelope;
pub mod handler;
pub mod pipeline;
pub mod plugin;
pub mod plugins;
pub mod proc;
pub mod reporter;

pub use agent::{init_monitoring, init_monitoring_with_plugins, MonitoringAgent};
pub use config::{MetricToggles, MonitorConfig};
pub use context::InvocationContext;
pub use envelope::{Batch, Envelope};
pub use handler::monitored_handler;
pub use pipeline::PluginPipeline;
pub use plugin::{HandlerError, PanicInfo, Plugin};
pub use plugins::log::{LogLevel, LogPlugin, MonitoredLogger};
pub use plugins::metric::MetricPlugin;
pub use plugins::trace::TracePlugin;
pub use reporter::{Reporter, ReporterError};
