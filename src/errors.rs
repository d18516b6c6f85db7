//! Error taxonomy shared by the token lifecycle, the token store and the batch
//! orchestrator. Per-item lookup failures are not errors; they are
//! [`FailureReason`](crate::orders::outcome::FailureReason)s inside a result.

use thiserror::Error;

/// Login failed. `Clone` so one single-flight attempt can hand the same
/// result to every caller waiting on it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("credentials rejected: {0}")]
    InvalidCredentials(String),

    #[error("authentication request failed: {0}")]
    Network(String),

    #[error("malformed authentication response: {0}")]
    MalformedResponse(String),
}

impl AuthError {
    /// Metric label
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials(_) => "invalid_credentials",
            AuthError::Network(_) => "network",
            AuthError::MalformedResponse(_) => "malformed_response",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("token store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("token store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Batch-level failure: nothing was fetched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("no order identifiers found in input")]
    Validation,

    #[error("no valid token could be obtained: {0}")]
    Auth(#[from] AuthError),
}

impl BatchError {
    pub fn reason(&self) -> &'static str {
        match self {
            BatchError::Validation => "validation_error",
            BatchError::Auth(_) => "auth_error",
        }
    }
}
