//! Decorators around a [`Handler`]: structured logging and instrumentation.
//!
//! The facade stack is `LoggingLayer(InstrumentLayer(Dispatcher))`. Each layer
//! runs exactly once per call and never changes the result. A call whose future
//! is dropped before completion (client disconnect, gRPC deadline) still gets
//! its end record, as `canceled`.
use std::time::Instant;

use async_trait::async_trait;
use spawner_model::{Operation, Request, Response};
use tracing::{Instrument, Span, info, info_span, warn};

use crate::{
    context::{RequestContext, ServiceContext},
    dispatch::{Dispatcher, Handler},
    error::{CoreResult, ErrorKind},
    metrics::OperationOutcome,
};

/// Provider label used for operations without a provider.
const NO_PROVIDER: &str = "none";

/// Logs start and end of every call with identifying fields.
pub struct LoggingLayer<H> {
    inner: H,
}

impl<H: Handler> LoggingLayer<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<H: Handler> Handler for LoggingLayer<H> {
    async fn handle(&self, ctx: &RequestContext, request: Request) -> CoreResult<Response> {
        let operation = request.operation();
        let (provider, region, account) = match request.identity() {
            Some(id) => (id.provider_key(), id.region.clone(), id.account.clone()),
            None => (NO_PROVIDER.to_string(), String::new(), String::new()),
        };
        let subject = request.subject().unwrap_or_default().to_string();

        let span = info_span!(
            "operation",
            operation = %operation,
            provider = %provider,
            region = %region,
            account = %account,
            subject = %subject,
            trace_id = ctx.trace_id().unwrap_or_default(),
        );

        let end = EndLog {
            span: span.clone(),
            started: Instant::now(),
            done: false,
        };
        async move {
            info!("operation started");
            let result = self.inner.handle(ctx, request).await;
            end.finish(&result);
            result
        }
        .instrument(span)
        .await
    }
}

/// Writes the end-of-call record exactly once.
struct EndLog {
    span: Span,
    started: Instant,
    done: bool,
}

impl EndLog {
    fn finish<T>(mut self, result: &CoreResult<T>) {
        self.done = true;
        let elapsed_ms = elapsed_ms(self.started);
        match result {
            Ok(_) => info!(elapsed_ms, "operation finished"),
            Err(e) => warn!(elapsed_ms, kind = %e.kind(), error = %e, "operation failed"),
        }
    }
}

impl Drop for EndLog {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let _entered = self.span.enter();
        warn!(
            elapsed_ms = elapsed_ms(self.started),
            kind = %ErrorKind::Canceled,
            "operation canceled"
        );
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Bumps the operation counter and records metrics for every call.
pub struct InstrumentLayer<H> {
    inner: H,
    service: ServiceContext,
}

impl<H: Handler> InstrumentLayer<H> {
    pub fn new(inner: H, service: ServiceContext) -> Self {
        Self { inner, service }
    }
}

#[async_trait]
impl<H: Handler> Handler for InstrumentLayer<H> {
    async fn handle(&self, ctx: &RequestContext, request: Request) -> CoreResult<Response> {
        let operation = request.operation();
        let provider = request
            .identity()
            .map(|id| id.provider_key())
            .unwrap_or_else(|| NO_PROVIDER.to_string());

        self.service.next_operation();
        let mut record = MetricRecord {
            service: &self.service,
            operation,
            provider,
            started: Instant::now(),
            outcome: None,
        };
        let result = self.inner.handle(ctx, request).await;

        record.outcome = Some(match &result {
            Ok(_) => OperationOutcome::Success,
            Err(e) => OperationOutcome::Failure(e.kind()),
        });
        result
    }
}

/// Records the call on drop; no outcome means the call was abandoned.
struct MetricRecord<'a> {
    service: &'a ServiceContext,
    operation: Operation,
    provider: String,
    started: Instant,
    outcome: Option<OperationOutcome>,
}

impl Drop for MetricRecord<'_> {
    fn drop(&mut self) {
        let outcome = self
            .outcome
            .unwrap_or(OperationOutcome::Failure(ErrorKind::Canceled));
        self.service.metrics().record_operation(
            self.operation.as_str(),
            &self.provider,
            outcome,
            elapsed_ms(self.started),
        );
    }
}

/// Fully decorated facade.
pub type Facade = LoggingLayer<InstrumentLayer<Dispatcher>>;

/// Wrap a dispatcher into the standard decorator stack.
pub fn facade(dispatcher: Dispatcher, service: ServiceContext) -> Facade {
    LoggingLayer::new(InstrumentLayer::new(dispatcher, service))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{CoreError, ErrorKind},
        metrics::MetricsBackend,
    };
    use spawner_model::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingMetrics {
        calls: Mutex<Vec<(String, String, OperationOutcome)>>,
    }

    impl MetricsBackend for RecordingMetrics {
        fn record_operation(
            &self,
            operation: &str,
            provider: &str,
            outcome: OperationOutcome,
            _duration_ms: u64,
        ) {
            self.calls
                .lock()
                .unwrap()
                .push((operation.to_string(), provider.to_string(), outcome));
        }
    }

    /// Succeeds for Echo, fails for everything else.
    struct Scripted;

    #[async_trait]
    impl Handler for Scripted {
        async fn handle(&self, _ctx: &RequestContext, request: Request) -> CoreResult<Response> {
            match request {
                Request::Echo(r) => Ok(EchoResponse { msg: r.msg }.into()),
                _ => Err(CoreError::Provider("boom".into())),
            }
        }
    }

    fn stack(metrics: Arc<RecordingMetrics>) -> (LoggingLayer<InstrumentLayer<Scripted>>, ServiceContext) {
        let service = ServiceContext::new("test", metrics);
        let layer = LoggingLayer::new(InstrumentLayer::new(Scripted, service.clone()));
        (layer, service)
    }

    #[tokio::test]
    async fn instrumentation_runs_once_on_success() {
        let metrics = Arc::new(RecordingMetrics::default());
        let (layer, service) = stack(metrics.clone());

        let resp = layer
            .handle(&RequestContext::new(), EchoRequest { msg: "x".into() }.into())
            .await
            .unwrap();
        assert_eq!(EchoResponse::try_from(resp).unwrap().msg, "x");

        assert_eq!(service.operations(), 1);
        let calls = metrics.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], ("Echo".into(), "none".into(), OperationOutcome::Success));
    }

    #[tokio::test]
    async fn instrumentation_runs_once_on_failure_and_keeps_error() {
        let metrics = Arc::new(RecordingMetrics::default());
        let (layer, service) = stack(metrics.clone());

        let req = GetClustersRequest {
            identity: ProviderIdentity::new("AWS", "us-west-2", "team"),
        };
        let err = layer.handle(&RequestContext::new(), req.into()).await.unwrap_err();
        assert_eq!(err, CoreError::Provider("boom".into()));

        assert_eq!(service.operations(), 1);
        let calls = metrics.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            (
                "GetClusters".into(),
                "aws".into(),
                OperationOutcome::Failure(ErrorKind::Provider)
            )
        );
    }

    /// Never completes.
    struct Hanging;

    #[async_trait]
    impl Handler for Hanging {
        async fn handle(&self, _ctx: &RequestContext, _request: Request) -> CoreResult<Response> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn dropped_call_is_recorded_as_canceled() {
        let metrics = Arc::new(RecordingMetrics::default());
        let service = ServiceContext::new("test", metrics.clone());
        let layer = LoggingLayer::new(InstrumentLayer::new(Hanging, service.clone()));

        let req = GetClustersRequest {
            identity: ProviderIdentity::new("gcp", "us-central1", "team"),
        };
        let ctx = RequestContext::new();
        let timed_out = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            layer.handle(&ctx, req.into()),
        )
        .await;
        assert!(timed_out.is_err());

        assert_eq!(service.operations(), 1);
        let calls = metrics.calls.lock().unwrap();
        assert_eq!(
            *calls,
            [(
                "GetClusters".to_string(),
                "gcp".to_string(),
                OperationOutcome::Failure(ErrorKind::Canceled)
            )]
        );
    }

    #[tokio::test]
    async fn counter_is_monotonic_across_calls() {
        let metrics = Arc::new(RecordingMetrics::default());
        let (layer, service) = stack(metrics);
        let ctx = RequestContext::new();

        for _ in 0..3 {
            let _ = layer.handle(&ctx, HealthCheckRequest {}.into()).await;
        }
        assert_eq!(service.operations(), 3);
    }
}
