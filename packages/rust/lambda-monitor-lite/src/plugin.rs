//! The plugin capability: three lifecycle hooks invoked by the pipeline
//! around every invocation.
//!
//! A plugin is constructed once per process and reused across invocations;
//! any invocation-scoped buffers it holds must be reset in
//! [`Plugin::before_execution`]. Hooks are never invoked concurrently for two
//! overlapping invocations — the coordinator serializes invocations through
//! the pipeline — so plugin state needs no internal locking.
//!
//! Hook failure is always contained at the pipeline boundary: a hook that
//! returns an error or panics contributes no envelopes for that phase and is
//! reported on the diagnostic channel, but never affects sibling plugins or
//! the invocation itself.

use crate::context::InvocationContext;
use crate::envelope::Envelope;
use async_trait::async_trait;
use lambda_runtime::Error;
use serde_json::Value;
use std::any::Any;

/// Failure value returned by a handler that completed without panicking.
pub type HandlerError = dyn std::error::Error + Send + Sync;

/// An intercepted handler panic, as seen by plugin hooks.
///
/// The original panic payload is held back by the coordinator for re-raising;
/// plugins only see the extracted message and the captured backtrace.
#[derive(Debug, Clone)]
pub struct PanicInfo {
    /// Message extracted from the panic payload.
    pub message: String,
    /// Backtrace captured at the interception point.
    pub stack_trace: String,
}

impl PanicInfo {
    /// Extracts a displayable message from a panic payload and pairs it with
    /// the given backtrace.
    pub fn from_payload(payload: &(dyn Any + Send), stack_trace: String) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };

        Self {
            message,
            stack_trace,
        }
    }
}

/// A monitoring plugin: one unit of telemetry collection hooked into the
/// invocation lifecycle.
#[async_trait]
pub trait Plugin: Send {
    /// Stable name, used for diagnostics and enable/disable configuration.
    fn name(&self) -> &'static str;

    /// Invoked once per invocation before the user handler runs.
    ///
    /// Must reset any invocation-scoped state. The pipeline awaits every
    /// plugin's hook before the handler starts, so work done here is
    /// guaranteed visible to the later phases.
    async fn before_execution(
        &mut self,
        ctx: &InvocationContext,
        request: &Value,
    ) -> Result<(), Error>;

    /// Invoked once after the handler returned, normally or with an error.
    ///
    /// `error` is `None` when the handler succeeded. Returns the telemetry
    /// gathered during the invocation.
    async fn after_execution(
        &mut self,
        ctx: &InvocationContext,
        request: &Value,
        response: Option<&Value>,
        error: Option<&HandlerError>,
    ) -> Result<Vec<Envelope>, Error>;

    /// Invoked instead of `after_execution` when the handler panicked.
    async fn on_panic(
        &mut self,
        ctx: &InvocationContext,
        request: &Value,
        panic: &PanicInfo,
    ) -> Result<Vec<Envelope>, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_from_str_payload() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        let info = PanicInfo::from_payload(payload.as_ref(), "trace".to_string());

        assert_eq!(info.message, "boom");
        assert_eq!(info.stack_trace, "trace");
    }

    #[test]
    fn test_panic_message_from_string_payload() {
        let payload: Box<dyn Any + Send> = Box::new("kaboom".to_string());
        let info = PanicInfo::from_payload(payload.as_ref(), String::new());

        assert_eq!(info.message, "kaboom");
    }

    #[test]
    fn test_panic_message_from_opaque_payload() {
        let payload: Box<dyn Any + Send> = Box::new(42_u32);
        let info = PanicInfo::from_payload(payload.as_ref(), String::new());

        assert_eq!(info.message, "unknown panic");
    }
}
