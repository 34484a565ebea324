use spawner_core::{CoreError, ErrorKind};
use spawner_model::ModelError;
use thiserror::Error;

/// Errors surfaced by the API layer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The wire message could not be turned into a neutral request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The handler failed; the kind decides the status code.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ModelError> for ApiError {
    fn from(e: ModelError) -> Self {
        ApiError::InvalidRequest(e.to_string())
    }
}

impl ApiError {
    /// Error kind as seen by a caller of the service.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::InvalidRequest(_) => ErrorKind::InvalidInput,
            ApiError::Core(e) => e.kind(),
            ApiError::Internal(_) => ErrorKind::Provider,
        }
    }
}

#[cfg(feature = "grpc")]
mod grpc {
    use tonic::{Code, Status};

    use super::*;

    /// gRPC status code for an error kind.
    pub fn code_for(kind: ErrorKind) -> Code {
        match kind {
            ErrorKind::InvalidInput => Code::InvalidArgument,
            ErrorKind::Credential => Code::Unauthenticated,
            ErrorKind::NotFound => Code::NotFound,
            ErrorKind::Provider => Code::Unavailable,
            ErrorKind::TransientEmptyResult => Code::FailedPrecondition,
            ErrorKind::Unsupported => Code::Unimplemented,
            ErrorKind::Canceled => Code::Cancelled,
            ErrorKind::DeadlineExceeded => Code::DeadlineExceeded,
        }
    }

    impl From<ApiError> for Status {
        fn from(e: ApiError) -> Self {
            match e {
                ApiError::InvalidRequest(msg) => Status::invalid_argument(msg),
                ApiError::Core(e) => Status::new(code_for(e.kind()), e.message()),
                ApiError::Internal(msg) => Status::internal(msg),
            }
        }
    }

    /// Rebuild the neutral error a remote service reported.
    ///
    /// Codes outside the mapping (transport failures, `INTERNAL`, ...) become
    /// provider errors carrying the status message.
    pub fn from_status(status: &Status) -> CoreError {
        let kind = match status.code() {
            Code::InvalidArgument => ErrorKind::InvalidInput,
            Code::Unauthenticated => ErrorKind::Credential,
            Code::NotFound => ErrorKind::NotFound,
            Code::FailedPrecondition => ErrorKind::TransientEmptyResult,
            Code::Unimplemented => ErrorKind::Unsupported,
            Code::Cancelled => ErrorKind::Canceled,
            Code::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            _ => ErrorKind::Provider,
        };
        CoreError::new(kind, status.message())
    }
}

#[cfg(feature = "grpc")]
pub use grpc::{code_for, from_status};

#[cfg(feature = "http")]
mod http {
    use axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    };
    use serde_json::json;

    use super::*;

    impl IntoResponse for ApiError {
        fn into_response(self) -> Response {
            let status = match self.kind() {
                ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
                ErrorKind::Credential => StatusCode::UNAUTHORIZED,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Unsupported => StatusCode::NOT_IMPLEMENTED,
                ErrorKind::TransientEmptyResult => StatusCode::CONFLICT,
                ErrorKind::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(json!({ "error": self.to_string() }))).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "grpc")]
    #[test]
    fn every_kind_maps_to_its_status_code() {
        use tonic::{Code, Status};

        let cases = [
            (ErrorKind::InvalidInput, Code::InvalidArgument),
            (ErrorKind::Credential, Code::Unauthenticated),
            (ErrorKind::NotFound, Code::NotFound),
            (ErrorKind::Provider, Code::Unavailable),
            (ErrorKind::TransientEmptyResult, Code::FailedPrecondition),
            (ErrorKind::Unsupported, Code::Unimplemented),
            (ErrorKind::Canceled, Code::Cancelled),
            (ErrorKind::DeadlineExceeded, Code::DeadlineExceeded),
        ];
        for (kind, code) in cases {
            let status = Status::from(ApiError::Core(CoreError::new(kind, "DeleteCluster: c1")));
            assert_eq!(status.code(), code, "{kind}");
            assert_eq!(status.message(), "DeleteCluster: c1");
            assert_eq!(from_status(&status).kind(), kind);
        }
    }

    #[cfg(feature = "grpc")]
    #[test]
    fn unknown_codes_come_back_as_provider_errors() {
        let err = from_status(&tonic::Status::internal("boom"));
        assert_eq!(err.kind(), ErrorKind::Provider);
        assert_eq!(err.message(), "boom");
    }

    #[test]
    fn model_errors_are_invalid_requests() {
        let err = ApiError::from(ModelError::UnknownGranularity("HOURLY".into()));
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
