use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
};
use prometheus::{Encoder, TEXT_FORMAT, TextEncoder};
use serde::Serialize;
use spawner_core::ServiceContext;
use spawner_prometheus::PrometheusMetrics;
use tracing::warn;

use crate::error::ApiError;

/// HTTP side port: health and metrics.
pub struct HttpApi {
    service: ServiceContext,
    metrics: Option<PrometheusMetrics>,
}

struct HttpState {
    service: ServiceContext,
    metrics: Option<PrometheusMetrics>,
}

impl HttpApi {
    pub fn new(service: ServiceContext) -> Self {
        Self {
            service,
            metrics: None,
        }
    }

    /// Expose `metrics` on `/metrics`.
    pub fn with_metrics(mut self, metrics: PrometheusMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build axum router with mounted endpoints.
    ///
    /// Routes:
    /// - GET /healthz - Liveness plus the operation counter
    /// - GET /metrics - Prometheus text exposition
    pub fn router(self) -> Router {
        let state = Arc::new(HttpState {
            service: self.service,
            metrics: self.metrics,
        });
        Router::new()
            .route("/healthz", get(healthz))
            .route("/metrics", get(metrics))
            .with_state(state)
    }
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    env: String,
    operations: u64,
}

/// GET /healthz
async fn healthz(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        env: state.service.env().to_string(),
        operations: state.service.operations(),
    })
}

/// GET /metrics
async fn metrics(State(state): State<Arc<HttpState>>) -> Result<impl IntoResponse, ApiError> {
    let families = match &state.metrics {
        Some(m) => m.gather(),
        None => Vec::new(),
    };

    let mut body = Vec::new();
    TextEncoder::new().encode(&families, &mut body).map_err(|e| {
        warn!(error = %e, "metrics encoding failed");
        ApiError::Internal(e.to_string())
    })?;

    Ok(([(header::CONTENT_TYPE, TEXT_FORMAT)], body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use spawner_core::{MetricsBackend, OperationOutcome, noop_metrics};
    use tower::ServiceExt;

    async fn get_body(router: Router, uri: &str) -> (StatusCode, String) {
        let resp = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn healthz_reports_env_and_operations() {
        let service = ServiceContext::new("dev", noop_metrics());
        service.next_operation();

        let (status, body) = get_body(HttpApi::new(service).router(), "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["env"], "dev");
        assert_eq!(json["operations"], 1);
    }

    #[tokio::test]
    async fn metrics_exposes_operation_counters() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_operation("CreateCluster", "aws", OperationOutcome::Success, 12);
        let service = ServiceContext::new("dev", Arc::new(metrics.clone()));

        let router = HttpApi::new(service).with_metrics(metrics).router();
        let (status, body) = get_body(router, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("spawner_operations_total"));
        assert!(body.contains(r#"operation="CreateCluster""#));
    }
}
