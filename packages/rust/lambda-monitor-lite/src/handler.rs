//! The invocation coordinator: wraps a Lambda handler with the monitoring
//! lifecycle.
//!
//! [`monitored_handler`] drives one invocation through a fixed sequence:
//!
//! 1. Build a fresh [`InvocationContext`] (cold-start flag, request
//!    metadata, platform deadline).
//! 2. Run every plugin's `before_execution` concurrently and join.
//! 3. Invoke the user handler, intercepting panics.
//! 4. Run `after_execution` (normal return, with or without an error) or
//!    `on_panic` (intercepted panic) — exactly one of the two.
//! 5. Report the collected batch and only then return control.
//!
//! Instrumentation is observational, never corrective: a handler error is
//! returned unchanged, and an intercepted panic is re-raised to the caller
//! after its telemetry has been reported. Conversely, nothing that goes
//! wrong inside the monitoring machinery — plugin failures, an unreachable
//! collector — can alter the outcome of a successful invocation.
//!
//! # Example
//!
//! ```no_run
//! use lambda_monitor_lite::{init_monitoring, monitored_handler, MonitorConfig};
//! use lambda_runtime::{service_fn, Error, LambdaEvent};
//! use serde_json::{json, Value};
//!
//! async fn function_handler(event: LambdaEvent<Value>) -> Result<Value, Error> {
//!     Ok(json!({"statusCode": 200}))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let agent = init_monitoring(MonitorConfig::default())?;
//!
//!     lambda_runtime::run(service_fn(|event: LambdaEvent<Value>| {
//!         monitored_handler(agent.clone(), event, function_handler)
//!     }))
//!     .await
//! }
//! ```

use crate::agent::MonitoringAgent;
use crate::context::InvocationContext;
use crate::plugin::PanicInfo;
use futures::FutureExt;
use lambda_runtime::{Error, LambdaEvent};
use serde::Serialize;
use serde_json::Value;
use std::backtrace::Backtrace;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};

static IS_COLD_START: AtomicBool = AtomicBool::new(true);

#[cfg(test)]
pub(crate) fn reset_cold_start() {
    IS_COLD_START.store(true, Ordering::SeqCst);
}

/// Wraps a Lambda handler invocation with the monitoring lifecycle.
///
/// The pipeline mutex is held from the before hooks through batch
/// collection, so plugins never observe two overlapping invocations.
/// Reporting happens before control returns to the runtime, on the success
/// and failure paths alike.
///
/// # Type Parameters
///
/// * `T` - Event payload type, serialized for plugin consumption
/// * `R` - Response type
/// * `F` - The wrapped handler function
/// * `Fut` - The future returned by the handler
pub async fn monitored_handler<T, R, F, Fut>(
    agent: MonitoringAgent,
    event: LambdaEvent<T>,
    handler_fn: F,
) -> Result<R, Error>
where
    T: Serialize + Send + 'static,
    R: Serialize + Send + 'static,
    F: FnOnce(LambdaEvent<T>) -> Fut,
    Fut: Future<Output = Result<R, Error>> + Send,
{
    let is_cold = IS_COLD_START.swap(false, Ordering::Relaxed);
    let ctx = InvocationContext::new(&event.context, is_cold);
    let raw_request = serde_json::to_value(&event.payload).unwrap_or(Value::Null);

    let mut pipeline = agent.pipeline().lock().await;
    pipeline.run_before(&ctx, &raw_request).await;

    let outcome = AssertUnwindSafe(handler_fn(event)).catch_unwind().await;

    let batch = match &outcome {
        Ok(Ok(response)) => {
            let raw_response = serde_json::to_value(response).ok();
            pipeline
                .run_after(&ctx, &raw_request, raw_response.as_ref(), None)
                .await
        }
        Ok(Err(error)) => {
            pipeline
                .run_after(&ctx, &raw_request, None, Some(error.as_ref()))
                .await
        }
        Err(payload) => {
            let panic =
                PanicInfo::from_payload(payload.as_ref(), Backtrace::force_capture().to_string());
            tracing::warn!(
                request_id = %ctx.request_id,
                message = %panic.message,
                "handler panicked"
            );
            pipeline.run_on_panic(&ctx, &raw_request, &panic).await
        }
    };
    drop(pipeline);

    agent.reporter().send(&batch).await;

    match outcome {
        Ok(result) => result,
        // Instrumentation is observational: the original failure is re-raised
        // unchanged once its telemetry has been reported.
        Err(payload) => std::panic::resume_unwind(payload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{init_monitoring_with_plugins, MonitoringAgent};
    use crate::config::{MetricToggles, MonitorConfig};
    use crate::envelope::Envelope;
    use crate::plugin::{HandlerError, Plugin};
    use crate::plugins::log::{LogLevel, LogPlugin};
    use crate::plugins::metric::MetricPlugin;
    use crate::plugins::trace::TracePlugin;
    use async_trait::async_trait;
    use lambda_runtime::Context;
    use serde_json::json;
    use serial_test::serial;
    use std::sync::{Arc, Mutex};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Records lifecycle observations for assertions.
    struct RecordingPlugin {
        events: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Plugin for RecordingPlugin {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn before_execution(
            &mut self,
            ctx: &InvocationContext,
            _request: &Value,
        ) -> Result<(), Error> {
            self.events
                .lock()
                .unwrap()
                .push(format!("before cold={}", ctx.cold_start));
            Ok(())
        }

        async fn after_execution(
            &mut self,
            _ctx: &InvocationContext,
            _request: &Value,
            response: Option<&Value>,
            error: Option<&HandlerError>,
        ) -> Result<Vec<Envelope>, Error> {
            self.events.lock().unwrap().push(format!(
                "after response={} error={}",
                response.is_some(),
                error.is_some()
            ));
            Ok(Vec::new())
        }

        async fn on_panic(
            &mut self,
            _ctx: &InvocationContext,
            _request: &Value,
            panic: &PanicInfo,
        ) -> Result<Vec<Envelope>, Error> {
            self.events
                .lock()
                .unwrap()
                .push(format!("panic message={}", panic.message));
            Ok(Vec::new())
        }
    }

    fn recording_agent(endpoint: String) -> (MonitoringAgent, Arc<Mutex<Vec<String>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let agent = init_monitoring_with_plugins(
            MonitorConfig::builder()
                .api_key("test-key".to_string())
                .collector_endpoint(endpoint)
                .build(),
            vec![Box::new(RecordingPlugin {
                events: events.clone(),
            })],
        )
        .unwrap();
        (agent, events)
    }

    fn test_event(payload: Value) -> LambdaEvent<Value> {
        let mut context = Context::default();
        context.request_id = "req-1".to_string();
        LambdaEvent::new(payload, context)
    }

    #[tokio::test]
    #[serial]
    async fn test_cold_start_true_exactly_once() {
        reset_cold_start();
        let (agent, events) = recording_agent(String::new());

        for _ in 0..2 {
            monitored_handler(agent.clone(), test_event(json!({})), |_event| async {
                Ok(json!({"ok": true}))
            })
            .await
            .unwrap();
        }

        let events = events.lock().unwrap();
        assert_eq!(events[0], "before cold=true");
        assert_eq!(events[2], "before cold=false");
    }

    #[tokio::test]
    #[serial]
    async fn test_success_runs_after_hooks_only() {
        reset_cold_start();
        let (agent, events) = recording_agent(String::new());

        let result =
            monitored_handler(agent, test_event(json!({"a": 1})), |event| async move {
                Ok(json!({"echo": event.payload}))
            })
            .await
            .unwrap();

        assert_eq!(result["echo"]["a"], 1);
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[0].starts_with("before"));
        assert_eq!(events[1], "after response=true error=false");
    }

    #[tokio::test]
    #[serial]
    async fn test_handler_error_reaches_after_hooks_and_caller() {
        reset_cold_start();
        let (agent, events) = recording_agent(String::new());

        let result: Result<Value, Error> =
            monitored_handler(agent, test_event(json!({})), |_event| async {
                Err("handler failed".into())
            })
            .await;

        assert_eq!(result.unwrap_err().to_string(), "handler failed");
        let events = events.lock().unwrap();
        assert_eq!(events[1], "after response=false error=true");
    }

    #[tokio::test]
    #[serial]
    async fn test_panic_runs_panic_hooks_and_is_reraised() {
        reset_cold_start();
        let (agent, events) = recording_agent(String::new());

        let join = tokio::spawn(monitored_handler(
            agent,
            test_event(json!({})),
            |_event| async {
                if true {
                    panic!("boom");
                }
                Ok(json!({}))
            },
        ))
        .await;

        let join_error = join.unwrap_err();
        assert!(join_error.is_panic());
        let payload = join_error.into_panic();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"boom"));

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], "panic message=boom");
    }

    #[tokio::test]
    #[serial]
    async fn test_reporter_failure_does_not_affect_outcome() {
        reset_cold_start();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let (agent, _) = recording_agent(server.uri());

        let result = monitored_handler(agent, test_event(json!({})), |_event| async {
            Ok(json!({"fine": true}))
        })
        .await
        .unwrap();

        assert_eq!(result["fine"], true);
    }

    #[tokio::test]
    #[serial]
    async fn test_end_to_end_metric_then_log_batch() {
        reset_cold_start();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let config = MonitorConfig::builder()
            .api_key("shared-key".to_string())
            .collector_endpoint(server.uri())
            .metric_toggles(MetricToggles {
                disable_cpu: true,
                disable_disk: true,
                disable_network: true,
                disable_load: true,
                ..MetricToggles::default()
            })
            .build();
        let (log_plugin, logger) = LogPlugin::new(LogLevel::Debug);
        let metric_plugin = MetricPlugin::new(Arc::new(config.clone()));
        let agent = init_monitoring_with_plugins(
            config,
            vec![Box::new(metric_plugin), Box::new(log_plugin)],
        )
        .unwrap();

        let handler_logger = logger.clone();
        let result = monitored_handler(agent, test_event(json!({"a": 1})), move |_event| {
            let logger = handler_logger;
            async move {
                logger.info("processing");
                Ok(json!({"b": 2}))
            }
        })
        .await
        .unwrap();
        assert_eq!(result["b"], 2);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let batch: Vec<Envelope> = serde_json::from_slice(&requests[0].body).unwrap();

        // All metric envelopes precede all log envelopes, all share the key.
        assert!(!batch.is_empty());
        let first_log = batch.iter().position(|e| e.kind == "Log");
        if let Some(first_log) = first_log {
            assert!(batch[..first_log].iter().all(|e| e.kind == "Metric"));
            assert!(batch[first_log..].iter().all(|e| e.kind == "Log"));
        }
        assert!(batch.iter().all(|e| e.api_key == "shared-key"));
        assert!(batch
            .iter()
            .filter(|e| e.kind == "Log")
            .all(|e| e.data["message"] == "processing"));
    }

    #[tokio::test]
    #[serial]
    async fn test_end_to_end_panic_telemetry() {
        reset_cold_start();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let config = MonitorConfig::builder()
            .api_key("k".to_string())
            .collector_endpoint(server.uri())
            .build();
        let trace_plugin = TracePlugin::new(Arc::new(config.clone()));
        let agent =
            init_monitoring_with_plugins(config, vec![Box::new(trace_plugin)]).unwrap();

        let join = tokio::spawn(monitored_handler(
            agent,
            test_event(json!({})),
            |_event| async {
                if true {
                    panic!("boom");
                }
                Ok(json!({}))
            },
        ))
        .await;
        assert!(join.unwrap_err().is_panic());

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let batch: Vec<Envelope> = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].kind, "Span");
        assert_eq!(batch[0].data["error"]["errorType"], "Panic");
        assert_eq!(batch[0].data["error"]["errorMessage"], "boom");
    }
}
