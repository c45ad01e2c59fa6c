//! Invocation-scoped metadata shared with every plugin hook.
//!
//! An [`InvocationContext`] is built by the coordinator at the start of each
//! invocation from the Lambda runtime context, read by plugins during their
//! hooks, and discarded once the batch has been reported. The platform
//! timeout is observed passively: [`InvocationContext::close_to_timeout`]
//! reports whether the deadline was approached, it never enforces
//! cancellation.

use chrono::Utc;
use lambda_runtime::Context;
use std::time::{Duration, Instant};

/// Current wall-clock time as milliseconds since the Unix epoch.
pub(crate) fn now_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// Metadata describing one invocation, visible to all plugin hooks.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    /// Request id assigned by the platform.
    pub request_id: String,
    /// True only for the first invocation served by this process.
    pub cold_start: bool,
    /// Full ARN of the invoked function.
    pub invoked_function_arn: String,
    /// Function name, from the platform environment.
    pub function_name: String,
    /// Platform deadline as milliseconds since the Unix epoch (0 if unknown).
    pub deadline_ms: u64,
    /// Time budget granted to the invocation at its start.
    pub timeout_duration: Duration,
    /// Invocation start as milliseconds since the Unix epoch.
    pub started_at_ms: u64,
    start: Instant,
}

impl InvocationContext {
    /// Builds the context for one invocation from the runtime context.
    pub fn new(context: &Context, cold_start: bool) -> Self {
        let started_at_ms = now_ms();
        let timeout_duration =
            Duration::from_millis(context.deadline.saturating_sub(started_at_ms));

        Self {
            request_id: context.request_id.clone(),
            cold_start,
            invoked_function_arn: context.invoked_function_arn.clone(),
            function_name: std::env::var(crate::constants::env_vars::AWS_LAMBDA_FUNCTION_NAME)
                .unwrap_or_default(),
            deadline_ms: context.deadline,
            timeout_duration,
            started_at_ms,
            start: Instant::now(),
        }
    }

    /// Time elapsed since the invocation started.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Whether the platform deadline is within `margin` of the current time.
    ///
    /// Always false when the runtime supplied no deadline.
    pub fn close_to_timeout(&self, margin: Duration) -> bool {
        if self.deadline_ms == 0 {
            return false;
        }
        let remaining = self.deadline_ms.saturating_sub(now_ms());
        remaining <= margin.as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_with_deadline(deadline_ms: u64) -> Context {
        let mut context = Context::default();
        context.request_id = "req-1".to_string();
        context.invoked_function_arn =
            "arn:aws:lambda:us-east-1:123456789012:function:demo".to_string();
        context.deadline = deadline_ms;
        context
    }

    #[test]
    fn test_timeout_duration_from_deadline() {
        let deadline = now_ms() + 30_000;
        let ctx = InvocationContext::new(&context_with_deadline(deadline), true);

        assert!(ctx.timeout_duration >= Duration::from_millis(29_000));
        assert!(ctx.timeout_duration <= Duration::from_millis(30_000));
        assert_eq!(ctx.request_id, "req-1");
        assert!(ctx.cold_start);
    }

    #[test]
    fn test_close_to_timeout() {
        let near = InvocationContext::new(&context_with_deadline(now_ms() + 50), false);
        assert!(near.close_to_timeout(Duration::from_millis(200)));

        let far = InvocationContext::new(&context_with_deadline(now_ms() + 60_000), false);
        assert!(!far.close_to_timeout(Duration::from_millis(200)));
    }

    #[test]
    fn test_no_deadline_never_times_out() {
        let ctx = InvocationContext::new(&context_with_deadline(0), false);
        assert!(!ctx.close_to_timeout(Duration::from_secs(3600)));
    }
}
