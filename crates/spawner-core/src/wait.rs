//! Completion polling for long-running provider operations.
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant as TokioInstant, sleep, sleep_until};
use tracing::{debug, trace};

use crate::{
    context::RequestContext,
    error::{CoreError, CoreResult},
};

/// Default interval between two polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Polling settings injected into adapters.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval: Duration,
}

impl PollConfig {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// State reported by one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Pending,
    /// Finished successfully; some providers report an HTTP status with completion.
    Done { http_status: Option<u16> },
}

impl OperationStatus {
    pub fn done() -> Self {
        OperationStatus::Done { http_status: None }
    }
}

/// Handle of a provider operation that completes asynchronously.
#[async_trait]
pub trait LongRunningOperation: Send + Sync {
    /// Name used in logs and error context.
    fn name(&self) -> &str;

    /// Query the provider once. Provider-reported failures are returned as errors.
    async fn poll(&self) -> CoreResult<OperationStatus>;
}

/// Result of a completed wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub polls: u32,
    pub http_status: Option<u16>,
}

/// Poll `op` until it completes, fails, or the request is canceled or runs out of time.
///
/// The first poll happens immediately; later polls are `cfg.interval` apart.
pub async fn wait_for_completion(
    op: &dyn LongRunningOperation,
    cfg: &PollConfig,
    ctx: &RequestContext,
) -> CoreResult<Completion> {
    let deadline = ctx.deadline().map(TokioInstant::from_std);
    let mut polls = 0u32;

    loop {
        check_interrupted(op, ctx, deadline)?;

        polls += 1;
        let status = tokio::select! {
            biased;
            _ = ctx.cancel_token().cancelled() => return Err(canceled(op)),
            _ = until(deadline) => return Err(expired(op)),
            status = op.poll() => status.map_err(|e| e.context(op.name()))?,
        };
        trace!(operation = op.name(), polls, ?status, "polled");

        if let OperationStatus::Done { http_status } = status {
            debug!(operation = op.name(), polls, "operation completed");
            return Ok(Completion { polls, http_status });
        }

        tokio::select! {
            biased;
            _ = ctx.cancel_token().cancelled() => return Err(canceled(op)),
            _ = until(deadline) => return Err(expired(op)),
            _ = sleep(cfg.interval) => {}
        }
    }
}

fn check_interrupted(
    op: &dyn LongRunningOperation,
    ctx: &RequestContext,
    deadline: Option<TokioInstant>,
) -> CoreResult<()> {
    if ctx.is_canceled() {
        return Err(canceled(op));
    }
    if deadline.is_some_and(|d| d <= TokioInstant::now()) {
        return Err(expired(op));
    }
    Ok(())
}

async fn until(deadline: Option<TokioInstant>) {
    match deadline {
        Some(d) => sleep_until(d).await,
        None => std::future::pending().await,
    }
}

fn canceled(op: &dyn LongRunningOperation) -> CoreError {
    CoreError::Canceled(format!("{}: request canceled while waiting", op.name()))
}

fn expired(op: &dyn LongRunningOperation) -> CoreError {
    CoreError::DeadlineExceeded(format!("{}: deadline passed while waiting", op.name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio_util::sync::CancellationToken;

    /// Completes on poll `finish_on`; never completes when `None`.
    struct FakeOperation {
        polls: AtomicU32,
        finish_on: Option<u32>,
        fail_on: Option<u32>,
    }

    impl FakeOperation {
        fn finishing_on(n: u32) -> Self {
            Self {
                polls: AtomicU32::new(0),
                finish_on: Some(n),
                fail_on: None,
            }
        }

        fn never() -> Self {
            Self {
                polls: AtomicU32::new(0),
                finish_on: None,
                fail_on: None,
            }
        }
    }

    #[async_trait]
    impl LongRunningOperation for FakeOperation {
        fn name(&self) -> &str {
            "fake"
        }

        async fn poll(&self) -> CoreResult<OperationStatus> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on == Some(n) {
                return Err(CoreError::Provider("quota exceeded".into()));
            }
            if self.finish_on == Some(n) {
                return Ok(OperationStatus::Done {
                    http_status: Some(200),
                });
            }
            Ok(OperationStatus::Pending)
        }
    }

    fn fast() -> PollConfig {
        PollConfig::new(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn completes_after_exactly_n_polls() {
        let op = FakeOperation::finishing_on(4);
        let done = wait_for_completion(&op, &fast(), &RequestContext::new())
            .await
            .unwrap();

        assert_eq!(done.polls, 4);
        assert_eq!(done.http_status, Some(200));
        assert_eq!(op.polls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn provider_failure_is_returned_with_context() {
        let op = FakeOperation {
            fail_on: Some(2),
            ..FakeOperation::never()
        };
        let err = wait_for_completion(&op, &fast(), &RequestContext::new())
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Provider(_)));
        assert_eq!(err.message(), "fake: quota exceeded");
    }

    #[tokio::test]
    async fn stops_when_token_fires() {
        let op = FakeOperation::never();
        let token = CancellationToken::new();
        let ctx = RequestContext::new().with_cancel(token.clone());

        let cancel = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let err = wait_for_completion(&op, &fast(), &ctx).await.unwrap_err();
        cancel.await.unwrap();

        assert!(matches!(err, CoreError::Canceled(_)));
        assert!(op.polls.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn already_canceled_never_polls() {
        let op = FakeOperation::finishing_on(1);
        let token = CancellationToken::new();
        token.cancel();
        let ctx = RequestContext::new().with_cancel(token);

        let err = wait_for_completion(&op, &fast(), &ctx).await.unwrap_err();
        assert!(matches!(err, CoreError::Canceled(_)));
        assert_eq!(op.polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stops_when_deadline_passes() {
        let op = FakeOperation::never();
        let ctx = RequestContext::new().with_timeout(Duration::from_millis(30));

        let err = wait_for_completion(&op, &PollConfig::new(Duration::from_millis(5)), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::DeadlineExceeded(_)));
    }
}
