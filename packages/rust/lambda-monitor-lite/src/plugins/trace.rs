//! Trace plugin: emits one span-shaped envelope per invocation.
//!
//! The span captures invocation identity (request id, function ARN and
//! name), timing (start/finish timestamps, duration), the cold-start and
//! timed-out flags, the raw request/response payloads, and the failure
//! descriptor when the handler returned an error or panicked.
//!
//! When the hide-request/hide-response flags are set the corresponding field
//! carries the redaction marker instead of the payload; the field is never
//! omitted, so downstream consumers can distinguish "hidden" from "absent".

use crate::config::MonitorConfig;
use crate::constants::data_model;
use crate::context::{now_ms, InvocationContext};
use crate::envelope::Envelope;
use crate::plugin::{HandlerError, PanicInfo, Plugin};
use async_trait::async_trait;
use lambda_runtime::Error;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Per-invocation span state; reset at every `before_execution`.
pub struct TracePlugin {
    config: Arc<MonitorConfig>,
    span_id: String,
    started_at_ms: u64,
}

impl TracePlugin {
    pub fn new(config: Arc<MonitorConfig>) -> Self {
        Self {
            config,
            span_id: String::new(),
            started_at_ms: 0,
        }
    }

    fn payload_field(&self, hidden: bool, payload: Option<&Value>) -> Value {
        if hidden {
            return Value::String(data_model::REDACTION_MARKER.to_string());
        }
        payload.cloned().unwrap_or(Value::Null)
    }

    fn span_envelope(
        &self,
        ctx: &InvocationContext,
        request: &Value,
        response: Option<&Value>,
        error: Option<Value>,
    ) -> Envelope {
        let finished_at_ms = now_ms();
        let timed_out =
            ctx.close_to_timeout(Duration::from_millis(self.config.timeout_margin_ms));

        Envelope::wrap(
            json!({
                "id": self.span_id,
                "transactionId": ctx.request_id,
                "functionArn": ctx.invoked_function_arn,
                "functionName": ctx.function_name,
                "startTimestampMs": self.started_at_ms,
                "finishTimestampMs": finished_at_ms,
                "durationMs": finished_at_ms.saturating_sub(self.started_at_ms),
                "coldStart": ctx.cold_start,
                "timedOut": timed_out,
                "request": self.payload_field(self.config.hide_request, Some(request)),
                "response": self.payload_field(self.config.hide_response, response),
                "error": error.unwrap_or(Value::Null),
            }),
            data_model::SPAN_TYPE,
        )
    }
}

#[async_trait]
impl Plugin for TracePlugin {
    fn name(&self) -> &'static str {
        "trace"
    }

    async fn before_execution(
        &mut self,
        _ctx: &InvocationContext,
        _request: &Value,
    ) -> Result<(), Error> {
        self.span_id = Uuid::new_v4().to_string();
        self.started_at_ms = now_ms();
        Ok(())
    }

    async fn after_execution(
        &mut self,
        ctx: &InvocationContext,
        request: &Value,
        response: Option<&Value>,
        error: Option<&HandlerError>,
    ) -> Result<Vec<Envelope>, Error> {
        let error_field = error.map(|e| {
            json!({
                "errorType": "HandlerError",
                "errorMessage": e.to_string(),
            })
        });

        Ok(vec![self.span_envelope(ctx, request, response, error_field)])
    }

    async fn on_panic(
        &mut self,
        ctx: &InvocationContext,
        request: &Value,
        panic: &PanicInfo,
    ) -> Result<Vec<Envelope>, Error> {
        let error_field = json!({
            "errorType": "Panic",
            "errorMessage": panic.message,
            "stackTrace": panic.stack_trace,
        });

        Ok(vec![self.span_envelope(ctx, request, None, Some(error_field))])
    }
}
