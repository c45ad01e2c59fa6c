//! Built-in monitoring plugins.
//!
//! Each plugin implements the [`crate::Plugin`] capability and produces
//! envelopes of a single type:
//!
//! - [`trace::TracePlugin`] — one `"Span"` envelope per invocation
//! - [`metric::MetricPlugin`] — one `"Metric"` envelope per enabled gauge
//! - [`log::LogPlugin`] — one `"Log"` envelope per captured record

pub mod log;
pub mod metric;
pub mod trace;
