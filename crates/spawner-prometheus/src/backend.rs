use std::sync::Arc;

use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry, proto::MetricFamily};

use spawner_core::{MetricsBackend, OperationOutcome};

/// Prometheus metrics backend.
///
/// ## Label cardinality
/// All labels are bounded:
/// - `operation`: RPC method names
/// - `provider`: registered provider keys plus `none`
/// - `outcome`: `success` or an error kind label
#[derive(Clone)]
pub struct PrometheusMetrics {
    operations: CounterVec,
    duration: HistogramVec,
    registry: Arc<Registry>,
}

impl PrometheusMetrics {
    /// Create a new prometheus metrics backend with custom registry.
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let operations = CounterVec::new(
            Opts::new("operations_total", "Total number of facade operations").namespace("spawner"),
            &["operation", "provider", "outcome"],
        )?;
        registry.register(Box::new(operations.clone()))?;

        // Cluster and node pool operations poll for minutes.
        let duration = HistogramVec::new(
            HistogramOpts::new(
                "operation_duration_seconds",
                "Facade operation duration in seconds",
            )
            .namespace("spawner")
            .buckets(vec![
                0.05, 0.1, 0.5, 1.0, 5.0, 30.0, 60.0, 300.0, 900.0, 1800.0,
            ]),
            &["operation", "provider"],
        )?;
        registry.register(Box::new(duration.clone()))?;

        Ok(Self {
            operations,
            duration,
            registry,
        })
    }

    /// Create a new prometheus metrics backend with default registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    /// Gather all metrics for exposition.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Get reference to underlying prometheus registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_operation(
        &self,
        operation: &str,
        provider: &str,
        outcome: OperationOutcome,
        duration_ms: u64,
    ) {
        self.operations
            .with_label_values(&[operation, provider, outcome.as_label()])
            .inc();

        let duration_seconds = duration_ms as f64 / 1000.0;
        self.duration
            .with_label_values(&[operation, provider])
            .observe(duration_seconds);
    }
}
