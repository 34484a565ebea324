use std::sync::Arc;

use crate::error::ErrorKind;

/// Operation outcome for metrics classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationOutcome {
    /// Operation returned a response.
    Success,
    /// Operation failed with the given error kind.
    Failure(ErrorKind),
}

impl OperationOutcome {
    /// Return label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            OperationOutcome::Success => "success",
            OperationOutcome::Failure(kind) => kind.as_label(),
        }
    }
}

/// Backend metrics collection interface.
///
/// Implementations are injected through [`crate::ServiceContext`] and used by the
/// instrumentation layer of the facade.
pub trait MetricsBackend: Send + Sync + 'static {
    /// Record a finished operation.
    ///
    /// # Arguments
    /// - `operation`: RPC method name
    /// - `provider`: provider key, `"none"` for provider-independent operations
    /// - `outcome`: how the operation ended
    /// - `duration_ms`: wall time in milliseconds
    fn record_operation(
        &self,
        operation: &str,
        provider: &str,
        outcome: OperationOutcome,
        duration_ms: u64,
    );
}

/// Shared handle to metrics backend.
pub type MetricsHandle = Arc<dyn MetricsBackend>;
