//! Metric plugin: process/runtime gauges, one envelope per category.
//!
//! Six gauge categories are emitted: cpu, memory, disk, network, threads and
//! load. Each category can be disabled independently through
//! [`crate::MetricToggles`]; a disabled toggle suppresses only its own
//! envelope. Cumulative counters (cpu ticks, disk and network bytes) are
//! reported as deltas against a baseline sampled at `before_execution`, so a
//! gauge reflects the work done by the invocation rather than the lifetime of
//! the process.
//!
//! Sampling is best-effort: a gauge whose procfs source is unavailable is
//! skipped for the invocation with a debug log, never an error.

use crate::config::MonitorConfig;
use crate::constants::data_model;
use crate::context::{now_ms, InvocationContext};
use crate::envelope::Envelope;
use crate::plugin::{HandlerError, PanicInfo, Plugin};
use crate::proc::{self, ProcSample};
use async_trait::async_trait;
use lambda_runtime::Error;
use serde_json::{json, Value};
use std::sync::Arc;

/// Samples gauges around the handler and emits them as envelopes.
pub struct MetricPlugin {
    config: Arc<MonitorConfig>,
    baseline: ProcSample,
}

impl MetricPlugin {
    pub fn new(config: Arc<MonitorConfig>) -> Self {
        Self {
            config,
            baseline: ProcSample::default(),
        }
    }

    fn gauge(&self, ctx: &InvocationContext, name: &str, fields: Value) -> Envelope {
        let mut data = json!({
            "name": name,
            "pid": proc::pid(),
            "requestId": ctx.request_id,
            "sampledAtMs": now_ms(),
        });
        if let (Some(data), Some(fields)) = (data.as_object_mut(), fields.as_object()) {
            for (key, value) in fields {
                data.insert(key.clone(), value.clone());
            }
        }
        Envelope::wrap(data, data_model::METRIC_TYPE)
    }

    fn collect(&self, ctx: &InvocationContext) -> Vec<Envelope> {
        let toggles = &self.config.metric_toggles;
        let sample = proc::sample();
        let mut envelopes = Vec::new();

        if !toggles.disable_cpu {
            match (sample.cpu, self.baseline.cpu) {
                (Some(now), Some(base)) => envelopes.push(self.gauge(
                    ctx,
                    "cpu",
                    json!({
                        "userTicksDelta": now.user_ticks.saturating_sub(base.user_ticks),
                        "systemTicksDelta": now.system_ticks.saturating_sub(base.system_ticks),
                    }),
                )),
                _ => tracing::debug!(gauge = "cpu", "sample unavailable, skipping"),
            }
        }

        if !toggles.disable_memory {
            match sample.memory {
                Some(memory) => envelopes.push(self.gauge(
                    ctx,
                    "memory",
                    json!({
                        "rssKb": memory.rss_kb,
                        "vmKb": memory.vm_kb,
                    }),
                )),
                None => tracing::debug!(gauge = "memory", "sample unavailable, skipping"),
            }
        }

        if !toggles.disable_disk {
            match (sample.io, self.baseline.io) {
                (Some(now), Some(base)) => envelopes.push(self.gauge(
                    ctx,
                    "disk",
                    json!({
                        "readBytesDelta": now.read_bytes.saturating_sub(base.read_bytes),
                        "writeBytesDelta": now.write_bytes.saturating_sub(base.write_bytes),
                    }),
                )),
                _ => tracing::debug!(gauge = "disk", "sample unavailable, skipping"),
            }
        }

        if !toggles.disable_network {
            match (sample.net, self.baseline.net) {
                (Some(now), Some(base)) => envelopes.push(self.gauge(
                    ctx,
                    "network",
                    json!({
                        "rxBytesDelta": now.rx_bytes.saturating_sub(base.rx_bytes),
                        "txBytesDelta": now.tx_bytes.saturating_sub(base.tx_bytes),
                    }),
                )),
                _ => tracing::debug!(gauge = "network", "sample unavailable, skipping"),
            }
        }

        if !toggles.disable_threads {
            match sample.threads {
                Some(count) => {
                    envelopes.push(self.gauge(ctx, "threads", json!({"count": count})))
                }
                None => tracing::debug!(gauge = "threads", "sample unavailable, skipping"),
            }
        }

        if !toggles.disable_load {
            match sample.load {
                Some(load) => envelopes.push(self.gauge(
                    ctx,
                    "load",
                    json!({
                        "one": load.one,
                        "five": load.five,
                        "fifteen": load.fifteen,
                    }),
                )),
                None => tracing::debug!(gauge = "load", "sample unavailable, skipping"),
            }
        }

        envelopes
    }
}

#[async_trait]
impl Plugin for MetricPlugin {
    fn name(&self) -> &'static str {
        "metric"
    }

    async fn before_execution(
        &mut self,
        _ctx: &InvocationContext,
        _request: &Value,
    ) -> Result<(), Error> {
        self.baseline = proc::sample();
        Ok(())
    }

    async fn after_execution(
        &mut self,
        ctx: &InvocationContext,
        _request: &Value,
        _response: Option<&Value>,
        _error: Option<&HandlerError>,
    ) -> Result<Vec<Envelope>, Error> {
        Ok(self.collect(ctx))
    }

    async fn on_panic(
        &mut self,
        ctx: &InvocationContext,
        _request: &Value,
        _panic: &PanicInfo,
    ) -> Result<Vec<Envelope>, Error> {
        Ok(self.collect(ctx))
    }
}
