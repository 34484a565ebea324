use crate::metrics::backend::{MetricsBackend, OperationOutcome};

/// No-op metrics backend that compiles to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl MetricsBackend for NoOpMetrics {
    #[inline(always)]
    fn record_operation(&self, _: &str, _: &str, _: OperationOutcome, _: u64) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn noop_metrics_is_zero_size() {
        assert_eq!(std::mem::size_of::<NoOpMetrics>(), 0);
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(OperationOutcome::Success.as_label(), "success");
        assert_eq!(
            OperationOutcome::Failure(ErrorKind::NotFound).as_label(),
            "not_found"
        );
        NoOpMetrics.record_operation("Echo", "none", OperationOutcome::Success, 1);
    }
}
