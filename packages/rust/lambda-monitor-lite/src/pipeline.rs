//! Plugin registry and pipeline runner.
//!
//! The pipeline holds the ordered set of enabled plugins and drives their
//! hooks at each lifecycle point:
//!
//! - [`PluginPipeline::run_before`] fans out to every plugin concurrently and
//!   joins on all of them before returning, so the latency added before the
//!   handler is bounded by the slowest single plugin rather than the sum.
//!   This is the only point of concurrency in the core.
//! - [`PluginPipeline::run_after`] and [`PluginPipeline::run_on_panic`] run
//!   sequentially in registration order and concatenate the envelopes each
//!   plugin returns, so batch order is stable and deterministic for a fixed
//!   plugin set.
//!
//! Every collected envelope is stamped with the configured API key before it
//! leaves the pipeline.
//!
//! # Failure containment
//!
//! Each hook runs inside `catch_unwind`: a plugin that returns an error or
//! panics contributes no envelopes for that phase and is reported with a
//! warning on the diagnostic channel. It never aborts sibling plugins or the
//! invocation.

use crate::config::MonitorConfig;
use crate::context::InvocationContext;
use crate::envelope::Batch;
use crate::plugin::{HandlerError, PanicInfo, Plugin};
use futures::future::join_all;
use futures::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Ordered registry of enabled plugins, shared across invocations.
pub struct PluginPipeline {
    config: Arc<MonitorConfig>,
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginPipeline {
    /// Creates an empty pipeline stamping envelopes with the given config's
    /// API key.
    pub fn new(config: Arc<MonitorConfig>) -> Self {
        Self {
            config,
            plugins: Vec::new(),
        }
    }

    /// Appends a plugin; registration order determines batch order.
    pub fn register(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    /// Number of registered plugins.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// True when no plugins are registered.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Runs `before_execution` on every plugin concurrently.
    ///
    /// Returns only after every hook has completed (join barrier), so no
    /// later phase can observe pre-reset plugin state.
    pub async fn run_before(&mut self, ctx: &InvocationContext, request: &Value) {
        let hooks = self.plugins.iter_mut().map(|plugin| async move {
            let name = plugin.name();
            match AssertUnwindSafe(plugin.before_execution(ctx, request))
                .catch_unwind()
                .await
            {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    tracing::warn!(plugin = name, error = %error, "before hook failed");
                }
                Err(_) => {
                    tracing::warn!(plugin = name, "before hook panicked");
                }
            }
        });

        join_all(hooks).await;
    }

    /// Runs `after_execution` on every plugin in registration order and
    /// returns the concatenated, key-stamped batch.
    pub async fn run_after(
        &mut self,
        ctx: &InvocationContext,
        request: &Value,
        response: Option<&Value>,
        error: Option<&HandlerError>,
    ) -> Batch {
        let api_key = self.config.api_key.clone();
        let mut batch = Batch::new();

        for plugin in self.plugins.iter_mut() {
            let name = plugin.name();
            match AssertUnwindSafe(plugin.after_execution(ctx, request, response, error))
                .catch_unwind()
                .await
            {
                Ok(Ok(envelopes)) => {
                    batch.extend(envelopes.into_iter().map(|e| e.with_api_key(&api_key)));
                }
                Ok(Err(error)) => {
                    tracing::warn!(plugin = name, error = %error, "after hook failed");
                }
                Err(_) => {
                    tracing::warn!(plugin = name, "after hook panicked");
                }
            }
        }

        batch
    }

    /// Runs `on_panic` on every plugin in registration order and returns the
    /// concatenated, key-stamped batch.
    pub async fn run_on_panic(
        &mut self,
        ctx: &InvocationContext,
        request: &Value,
        panic: &PanicInfo,
    ) -> Batch {
        let api_key = self.config.api_key.clone();
        let mut batch = Batch::new();

        for plugin in self.plugins.iter_mut() {
            let name = plugin.name();
            match AssertUnwindSafe(plugin.on_panic(ctx, request, panic))
                .catch_unwind()
                .await
            {
                Ok(Ok(envelopes)) => {
                    batch.extend(envelopes.into_iter().map(|e| e.with_api_key(&api_key)));
                }
                Ok(Err(error)) => {
                    tracing::warn!(plugin = name, error = %error, "panic hook failed");
                }
                Err(_) => {
                    tracing::warn!(plugin = name, "panic hook panicked");
                }
            }
        }

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::data_model;
    use crate::envelope::Envelope;
    use async_trait::async_trait;
    use lambda_runtime::{Context, Error};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn test_context() -> InvocationContext {
        InvocationContext::new(&Context::default(), false)
    }

    fn test_config(api_key: &str) -> Arc<MonitorConfig> {
        Arc::new(
            MonitorConfig::builder()
                .api_key(api_key.to_string())
                .build(),
        )
    }

    /// Probe plugin with controllable behavior for pipeline tests.
    struct ProbePlugin {
        name: &'static str,
        delay: Duration,
        fail_before: bool,
        panic_after: bool,
        fail_after: bool,
        before_done: Arc<AtomicUsize>,
        envelopes_per_hook: usize,
    }

    impl ProbePlugin {
        fn new(name: &'static str, before_done: Arc<AtomicUsize>) -> Self {
            Self {
                name,
                delay: Duration::ZERO,
                fail_before: false,
                panic_after: false,
                fail_after: false,
                before_done,
                envelopes_per_hook: 1,
            }
        }
    }

    #[async_trait]
    impl Plugin for ProbePlugin {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn before_execution(
            &mut self,
            _ctx: &InvocationContext,
            _request: &Value,
        ) -> Result<(), Error> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail_before {
                return Err("before failed".into());
            }
            self.before_done.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn after_execution(
            &mut self,
            _ctx: &InvocationContext,
            _request: &Value,
            _response: Option<&Value>,
            _error: Option<&HandlerError>,
        ) -> Result<Vec<Envelope>, Error> {
            if self.panic_after {
                panic!("plugin exploded");
            }
            if self.fail_after {
                return Err("after failed".into());
            }
            Ok((0..self.envelopes_per_hook)
                .map(|i| {
                    Envelope::wrap(json!({"plugin": self.name, "seq": i}), data_model::METRIC_TYPE)
                })
                .collect())
        }

        async fn on_panic(
            &mut self,
            _ctx: &InvocationContext,
            _request: &Value,
            panic: &PanicInfo,
        ) -> Result<Vec<Envelope>, Error> {
            Ok(vec![Envelope::wrap(
                json!({"plugin": self.name, "panicMessage": panic.message}),
                data_model::SPAN_TYPE,
            )])
        }
    }

    #[tokio::test]
    async fn test_run_before_waits_for_every_plugin() {
        let done = Arc::new(AtomicUsize::new(0));
        let config = test_config("k");
        let mut pipeline = PluginPipeline::new(config);

        let mut slow = ProbePlugin::new("slow", done.clone());
        slow.delay = Duration::from_millis(100);
        pipeline.register(Box::new(slow));
        pipeline.register(Box::new(ProbePlugin::new("fast", done.clone())));
        pipeline.register(Box::new(ProbePlugin::new("faster", done.clone())));

        let ctx = test_context();
        pipeline.run_before(&ctx, &json!({})).await;

        // The join barrier must have observed all three completions.
        assert_eq!(done.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_batch_order_matches_registration_order() {
        let done = Arc::new(AtomicUsize::new(0));
        let mut pipeline = PluginPipeline::new(test_config("k"));
        let mut first = ProbePlugin::new("first", done.clone());
        first.envelopes_per_hook = 2;
        pipeline.register(Box::new(first));
        pipeline.register(Box::new(ProbePlugin::new("second", done.clone())));

        let ctx = test_context();
        for _ in 0..3 {
            let batch = pipeline.run_after(&ctx, &json!({}), None, None).await;
            let owners: Vec<_> = batch
                .iter()
                .map(|e| e.data["plugin"].as_str().unwrap().to_string())
                .collect();
            assert_eq!(owners, ["first", "first", "second"]);
        }
    }

    #[tokio::test]
    async fn test_failing_before_hook_does_not_block_siblings() {
        let done = Arc::new(AtomicUsize::new(0));
        let mut pipeline = PluginPipeline::new(test_config("k"));
        let mut failing = ProbePlugin::new("failing", done.clone());
        failing.fail_before = true;
        pipeline.register(Box::new(failing));
        pipeline.register(Box::new(ProbePlugin::new("healthy", done.clone())));

        let ctx = test_context();
        pipeline.run_before(&ctx, &json!({})).await;

        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_plugin_contributes_nothing() {
        let done = Arc::new(AtomicUsize::new(0));
        let mut pipeline = PluginPipeline::new(test_config("k"));
        let mut panicking = ProbePlugin::new("panicking", done.clone());
        panicking.panic_after = true;
        pipeline.register(Box::new(panicking));
        pipeline.register(Box::new(ProbePlugin::new("healthy", done.clone())));

        let ctx = test_context();
        let batch = pipeline.run_after(&ctx, &json!({}), None, None).await;

        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].data["plugin"], "healthy");
    }

    #[tokio::test]
    async fn test_erroring_plugin_contributes_nothing() {
        let done = Arc::new(AtomicUsize::new(0));
        let mut pipeline = PluginPipeline::new(test_config("k"));
        let mut erroring = ProbePlugin::new("erroring", done.clone());
        erroring.fail_after = true;
        pipeline.register(Box::new(erroring));
        pipeline.register(Box::new(ProbePlugin::new("healthy", done.clone())));

        let ctx = test_context();
        let batch = pipeline.run_after(&ctx, &json!({}), None, None).await;

        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].data["plugin"], "healthy");
    }

    #[tokio::test]
    async fn test_envelopes_are_stamped_with_api_key() {
        let done = Arc::new(AtomicUsize::new(0));
        let mut pipeline = PluginPipeline::new(test_config("stamped-key"));
        pipeline.register(Box::new(ProbePlugin::new("one", done.clone())));
        pipeline.register(Box::new(ProbePlugin::new("two", done.clone())));

        let ctx = test_context();
        let batch = pipeline.run_after(&ctx, &json!({}), None, None).await;

        assert!(!batch.is_empty());
        assert!(batch.iter().all(|e| e.api_key == "stamped-key"));
    }

    #[tokio::test]
    async fn test_on_panic_collects_in_order() {
        let done = Arc::new(AtomicUsize::new(0));
        let mut pipeline = PluginPipeline::new(test_config("k"));
        pipeline.register(Box::new(ProbePlugin::new("one", done.clone())));
        pipeline.register(Box::new(ProbePlugin::new("two", done.clone())));

        let ctx = test_context();
        let panic = PanicInfo {
            message: "boom".to_string(),
            stack_trace: String::new(),
        };
        let batch = pipeline.run_on_panic(&ctx, &json!({}), &panic).await;

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].data["plugin"], "one");
        assert_eq!(batch[1].data["plugin"], "two");
        assert!(batch.iter().all(|e| e.data["panicMessage"] == "boom"));
    }
}
