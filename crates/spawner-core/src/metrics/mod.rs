//! Per-operation counters and latencies recorded by the instrumentation layer.
//!
//! The server injects `spawner-prometheus`; tests and tools use [`noop_metrics`].
mod backend;
pub use backend::{MetricsBackend, MetricsHandle, OperationOutcome};

mod noop;
pub use noop::NoOpMetrics;

use std::sync::Arc;

/// Create a no-op metrics handle.
#[inline]
pub fn noop_metrics() -> MetricsHandle {
    Arc::new(NoOpMetrics)
}
