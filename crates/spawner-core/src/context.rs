use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use tokio_util::sync::CancellationToken;

use crate::metrics::{MetricsHandle, noop_metrics};

/// Per-request context: trace id, cancellation and deadline of the inbound call.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    trace_id: Option<String>,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_canceled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Process-wide service state handed to the facade and the adapters.
///
/// Built once by the entry point; cloning shares the operation counter.
#[derive(Clone)]
pub struct ServiceContext {
    env: String,
    metrics: MetricsHandle,
    operations: Arc<AtomicU64>,
}

impl ServiceContext {
    pub fn new(env: impl Into<String>, metrics: MetricsHandle) -> Self {
        Self {
            env: env.into(),
            metrics,
            operations: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Environment name, e.g. `dev`, `prod` or `local`.
    pub fn env(&self) -> &str {
        &self.env
    }

    /// Returns `true` when the local credential chain is in effect.
    pub fn is_local(&self) -> bool {
        self.env.eq_ignore_ascii_case("local")
    }

    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }

    /// Bump the operation counter; returns the new value.
    pub fn next_operation(&self) -> u64 {
        self.operations.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn operations(&self) -> u64 {
        self.operations.load(Ordering::Relaxed)
    }

    /// Replace the metrics backend and return updated context.
    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }
}

impl Default for ServiceContext {
    fn default() -> Self {
        Self::new("dev", noop_metrics())
    }
}

impl fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceContext")
            .field("env", &self.env)
            .field("operations", &self.operations())
            .field("metrics", &"<handle>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_counter_is_shared_between_clones() {
        let svc = ServiceContext::default();
        let other = svc.clone();

        assert_eq!(svc.next_operation(), 1);
        assert_eq!(other.next_operation(), 2);
        assert_eq!(svc.operations(), 2);
    }

    #[test]
    fn local_env_is_case_insensitive() {
        assert!(ServiceContext::new("LOCAL", noop_metrics()).is_local());
        assert!(!ServiceContext::new("prod", noop_metrics()).is_local());
    }

    #[test]
    fn request_context_carries_cancel_and_deadline() {
        let token = CancellationToken::new();
        let ctx = RequestContext::new()
            .with_trace_id("abc")
            .with_cancel(token.clone())
            .with_timeout(Duration::from_secs(5));

        assert_eq!(ctx.trace_id(), Some("abc"));
        assert!(ctx.deadline().is_some());
        assert!(!ctx.is_canceled());
        token.cancel();
        assert!(ctx.is_canceled());
    }
}
