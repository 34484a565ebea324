//! Prometheus metrics backend for the spawner facade.
//!
//! [`PrometheusMetrics`] implements [`spawner_core::MetricsBackend`]. Inject it into the
//! [`spawner_core::ServiceContext`] and expose [`PrometheusMetrics::gather`] on an HTTP endpoint.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use spawner_core::ServiceContext;
//! use spawner_prometheus::PrometheusMetrics;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = PrometheusMetrics::new()?;
//! let service = ServiceContext::new("dev", Arc::new(metrics.clone()));
//! # let _ = service;
//! # Ok(())
//! # }
//! ```
//!
//! ## Metrics
//! - `spawner_operations_total{operation, provider, outcome}` - Counter
//! - `spawner_operation_duration_seconds{operation, provider}` - Histogram

mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
