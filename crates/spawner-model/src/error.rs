use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown capacity type: {0}")]
    UnknownCapacity(String),

    #[error("unknown gpu partition profile: {0}")]
    UnknownMigProfile(String),

    #[error("unknown credential type: {0}")]
    UnknownCredentialType(String),

    #[error("unknown cost granularity: {0}")]
    UnknownGranularity(String),

    #[error("unexpected response: expected {expected}, got {actual}")]
    UnexpectedResponse {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("invalid model: {0}")]
    Invalid(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
