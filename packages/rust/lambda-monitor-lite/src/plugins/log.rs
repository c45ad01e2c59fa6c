//! Log capture plugin and the [`MonitoredLogger`] handle.
//!
//! Handler code writes structured records through a clonable
//! [`MonitoredLogger`]; the plugin buffers them for the duration of the
//! invocation and flushes one `"Log"` envelope per record at the after/panic
//! hooks, then clears its buffer. The buffer is also cleared at
//! `before_execution`, so records can never leak across invocations.
//!
//! # Example
//!
//! ```no_run
//! use lambda_monitor_lite::{init_monitoring, MonitorConfig};
//!
//! # fn main() -> Result<(), lambda_runtime::Error> {
//! let agent = init_monitoring(MonitorConfig::default())?;
//! let logger = agent.logger();
//! logger.info("starting work");
//! logger.warn(format!("retrying step {}", 2));
//! # Ok(())
//! # }
//! ```

use crate::constants::{data_model, defaults};
use crate::context::{now_ms, InvocationContext};
use crate::envelope::Envelope;
use crate::plugin::{HandlerError, PanicInfo, Plugin};
use async_trait::async_trait;
use lambda_runtime::Error;
use serde_json::{json, Value};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Severity of a captured log record.
///
/// Ordered so that a minimum-level filter can use a plain comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl LogLevel {
    /// Resolves a level from its string form.
    ///
    /// An unrecognized value resolves to the default level with a logged
    /// warning.
    pub fn resolve(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" => LogLevel::Warn,
            "error" => LogLevel::Error,
            other => {
                tracing::warn!(value = other, "invalid log level, using default");
                LogLevel::resolve(defaults::LOG_LEVEL)
            }
        }
    }
}

/// One structured record captured during an invocation.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub timestamp_ms: u64,
}

type LogBuffer = Arc<Mutex<Vec<LogEntry>>>;

/// Clonable handle through which handler code emits log records into the
/// log plugin's buffer.
///
/// Records below the configured minimum level are discarded at the call
/// site. The handle is cheap to clone and safe to use from spawned tasks
/// within the same invocation.
#[derive(Clone)]
pub struct MonitoredLogger {
    buffer: LogBuffer,
    min_level: LogLevel,
}

impl MonitoredLogger {
    fn push(&self, level: LogLevel, message: String) {
        if level < self.min_level {
            return;
        }
        if let Ok(mut buffer) = self.buffer.lock() {
            buffer.push(LogEntry {
                level,
                message,
                timestamp_ms: now_ms(),
            });
        }
    }

    /// Records a debug message.
    pub fn debug(&self, message: impl Into<String>) {
        self.push(LogLevel::Debug, message.into());
    }

    /// Records an info message.
    pub fn info(&self, message: impl Into<String>) {
        self.push(LogLevel::Info, message.into());
    }

    /// Records a warning.
    pub fn warn(&self, message: impl Into<String>) {
        self.push(LogLevel::Warn, message.into());
    }

    /// Records an error.
    pub fn error(&self, message: impl Into<String>) {
        self.push(LogLevel::Error, message.into());
    }
}

/// Buffers records written through the [`MonitoredLogger`] and flushes them
/// as one envelope per record.
pub struct LogPlugin {
    buffer: LogBuffer,
}

impl LogPlugin {
    /// Creates the plugin and the logger handle sharing its buffer.
    pub fn new(min_level: LogLevel) -> (Self, MonitoredLogger) {
        let buffer: LogBuffer = Arc::new(Mutex::new(Vec::new()));
        let logger = MonitoredLogger {
            buffer: buffer.clone(),
            min_level,
        };
        (Self { buffer }, logger)
    }

    fn drain(&self, ctx: &InvocationContext) -> Vec<Envelope> {
        let entries = match self.buffer.lock() {
            Ok(mut buffer) => std::mem::take(&mut *buffer),
            Err(_) => return Vec::new(),
        };

        entries
            .into_iter()
            .map(|entry| {
                Envelope::wrap(
                    json!({
                        "level": entry.level.to_string(),
                        "message": entry.message,
                        "timestampMs": entry.timestamp_ms,
                        "requestId": ctx.request_id,
                    }),
                    data_model::LOG_TYPE,
                )
            })
            .collect()
    }

    fn clear(&self) {
        if let Ok(mut buffer) = self.buffer.lock() {
            buffer.clear();
        }
    }
}

#[async_trait]
impl Plugin for LogPlugin {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn before_execution(
        &mut self,
        _ctx: &InvocationContext,
        _request: &Value,
    ) -> Result<(), Error> {
        self.clear();
        Ok(())
    }

    async fn after_execution(
        &mut self,
        ctx: &InvocationContext,
        _request: &Value,
        _response: Option<&Value>,
        _error: Option<&HandlerError>,
    ) -> Result<Vec<Envelope>, Error> {
        Ok(self.drain(ctx))
    }

    async fn on_panic(
        &mut self,
        ctx: &InvocationContext,
        _request: &Value,
        _panic: &PanicInfo,
    ) -> Result<Vec<Envelope>, Error> {
        Ok(self.drain(ctx))
    }
}
