//! Agent initialization and the process-wide [`MonitoringAgent`] handle.
//!
//! [`init_monitoring`] is the main entry point: it resolves the configuration
//! (builder values overridden by the environment), registers the default
//! plugin set (trace, metric, log) and builds the reporter. The returned
//! agent is cheaply clonable and shared across invocations; clone it into the
//! runtime's service closure.
//!
//! # Example
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

use crate::config::MonitorConfig;
use crate::pipeline::PluginPipeline;
use crate::plugin::Plugin;
use crate::plugins::log::{LogPlugin, MonitoredLogger};
use crate::plugins::metric::MetricPlugin;
use crate::plugins::trace::TracePlugin;
use crate::reporter::Reporter;
use lambda_runtime::Error;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared handle to the monitoring machinery: resolved configuration, plugin
/// pipeline and reporter.
///
/// The pipeline sits behind a mutex held for the duration of each
/// invocation, which is what guarantees that no plugin is ever invoked for
/// two overlapping invocations.
#[derive(Clone)]
pub struct MonitoringAgent {
    config: Arc<MonitorConfig>,
    pipeline: Arc<Mutex<PluginPipeline>>,
    reporter: Arc<Reporter>,
    logger: MonitoredLogger,
}

impl MonitoringAgent {
    /// The resolved configuration.
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Handle for emitting log records captured by the log plugin.
    pub fn logger(&self) -> MonitoredLogger {
        self.logger.clone()
    }

    pub(crate) fn pipeline(&self) -> &Mutex<PluginPipeline> {
        &self.pipeline
    }

    pub(crate) fn reporter(&self) -> &Reporter {
        &self.reporter
    }
}

/// Initializes monitoring with the default plugin set (trace, metric, log).
///
/// The configuration is resolved once here: environment variables override
/// builder values, and the result is shared read-only for the lifetime of
/// the process.
pub fn init_monitoring(config: MonitorConfig) -> Result<MonitoringAgent, Error> {
    let config = Arc::new(config.with_env_overrides());
    let (log_plugin, logger) = LogPlugin::new(config.log_level);

    let mut pipeline = PluginPipeline::new(config.clone());
    pipeline.register(Box::new(TracePlugin::new(config.clone())));
    pipeline.register(Box::new(MetricPlugin::new(config.clone())));
    pipeline.register(Box::new(log_plugin));

    Ok(assemble(config, pipeline, logger))
}

/// Initializes monitoring with a caller-supplied plugin set.
///
/// No default plugins are registered; registration order determines batch
/// order. The agent's [`MonitoringAgent::logger`] handle is only drained
/// when the caller registers a [`LogPlugin`] and uses that plugin's own
/// handle instead.
pub fn init_monitoring_with_plugins(
    config: MonitorConfig,
    plugins: Vec<Box<dyn Plugin>>,
) -> Result<MonitoringAgent, Error> {
    let config = Arc::new(config.with_env_overrides());
    let (_, logger) = LogPlugin::new(config.log_level);

    let mut pipeline = PluginPipeline::new(config.clone());
    for plugin in plugins {
        pipeline.register(plugin);
    }

    Ok(assemble(config, pipeline, logger))
}

fn assemble(
    config: Arc<MonitorConfig>,
    pipeline: PluginPipeline,
    logger: MonitoredLogger,
) -> MonitoringAgent {
    let reporter = Arc::new(Reporter::new(&config));
    MonitoringAgent {
        config,
        pipeline: Arc::new(Mutex::new(pipeline)),
        reporter,
        logger,
    }
}
