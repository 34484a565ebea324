use spawner_core::CoreError;
use thiserror::Error;

/// Error reported by a provider-native API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiFault {
    /// The addressed resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Any other failure, with the provider's error code and message.
    #[error("{code}: {message}")]
    Api { code: String, message: String },
}

impl ApiFault {
    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiFault::NotFound(msg.into())
    }

    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        ApiFault::Api {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<ApiFault> for CoreError {
    fn from(fault: ApiFault) -> Self {
        match fault {
            ApiFault::NotFound(msg) => CoreError::NotFound(msg),
            other => CoreError::Provider(other.to_string()),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiFault>;

#[cfg(test)]
mod tests {
    use super::*;
    use spawner_core::{ErrorKind, ResultExt};

    #[test]
    fn faults_map_to_core_kinds() {
        let nf: Result<(), ApiFault> = Err(ApiFault::not_found("cluster c1"));
        let err = nf.context("describe cluster").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.message(), "describe cluster: cluster c1");

        let api = CoreError::from(ApiFault::api("ThrottlingException", "rate exceeded"));
        assert_eq!(api, CoreError::Provider("ThrottlingException: rate exceeded".into()));
    }
}
