use std::fmt;

use spawner_model::ModelError;
use thiserror::Error;

/// Error taxonomy shared by the facade and every provider adapter.
///
/// The variant is the error kind; the message accumulates operation context
/// on the way up the stack (see [`ResultExt::context`]).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("credential error: {0}")]
    Credential(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("empty result: {0}")]
    TransientEmptyResult(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("canceled: {0}")]
    Canceled(String),

    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(String),
}

/// Kind of a [`CoreError`], without its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    Credential,
    NotFound,
    Provider,
    TransientEmptyResult,
    Unsupported,
    Canceled,
    DeadlineExceeded,
}

impl ErrorKind {
    /// Label value for logs and metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Credential => "credential",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Provider => "provider",
            ErrorKind::TransientEmptyResult => "transient_empty_result",
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::Canceled => "canceled",
            ErrorKind::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvalidInput(_) => ErrorKind::InvalidInput,
            CoreError::Credential(_) => ErrorKind::Credential,
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::Provider(_) => ErrorKind::Provider,
            CoreError::TransientEmptyResult(_) => ErrorKind::TransientEmptyResult,
            CoreError::Unsupported(_) => ErrorKind::Unsupported,
            CoreError::Canceled(_) => ErrorKind::Canceled,
            CoreError::DeadlineExceeded(_) => ErrorKind::DeadlineExceeded,
        }
    }

    /// Message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            CoreError::InvalidInput(m)
            | CoreError::Credential(m)
            | CoreError::NotFound(m)
            | CoreError::Provider(m)
            | CoreError::TransientEmptyResult(m)
            | CoreError::Unsupported(m)
            | CoreError::Canceled(m)
            | CoreError::DeadlineExceeded(m) => m,
        }
    }

    /// Build an error of the given kind.
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        match kind {
            ErrorKind::InvalidInput => CoreError::InvalidInput(msg),
            ErrorKind::Credential => CoreError::Credential(msg),
            ErrorKind::NotFound => CoreError::NotFound(msg),
            ErrorKind::Provider => CoreError::Provider(msg),
            ErrorKind::TransientEmptyResult => CoreError::TransientEmptyResult(msg),
            ErrorKind::Unsupported => CoreError::Unsupported(msg),
            ErrorKind::Canceled => CoreError::Canceled(msg),
            ErrorKind::DeadlineExceeded => CoreError::DeadlineExceeded(msg),
        }
    }

    /// Prefix the message with `op`, keeping the kind.
    pub fn context(self, op: impl fmt::Display) -> Self {
        let kind = self.kind();
        CoreError::new(kind, format!("{op}: {}", self.message()))
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        CoreError::InvalidInput(msg.into())
    }

    pub fn unsupported(provider: &str, op: impl fmt::Display) -> Self {
        CoreError::Unsupported(format!("{op} is not supported by provider '{provider}'"))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound(_))
    }
}

impl From<ModelError> for CoreError {
    fn from(e: ModelError) -> Self {
        CoreError::InvalidInput(e.to_string())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Annotate errors with the operation that produced them.
pub trait ResultExt<T> {
    fn context(self, op: impl fmt::Display) -> CoreResult<T>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<CoreError>,
{
    fn context(self, op: impl fmt::Display) -> CoreResult<T> {
        self.map_err(|e| e.into().context(op))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_keeps_kind() {
        let err: CoreResult<()> = Err(CoreError::NotFound("cluster c1".into()));
        let err = err.context("DeleteCluster").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.message(), "DeleteCluster: cluster c1");
        assert_eq!(err.to_string(), "not found: DeleteCluster: cluster c1");
    }

    #[test]
    fn context_nests_outside_in() {
        let err = CoreError::Provider("throttled".into())
            .context("create nodegroup")
            .context("AddNode");
        assert_eq!(err.message(), "AddNode: create nodegroup: throttled");
        assert_eq!(err.kind(), ErrorKind::Provider);
    }

    #[test]
    fn model_errors_are_invalid_input() {
        let err = CoreError::from(ModelError::UnknownCapacity("reserved".into()));
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
