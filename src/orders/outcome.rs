use serde::{Deserialize, Serialize};

use crate::orders::record::OrderRecord;

/// Why a single lookup failed. Only `AuthFailure` is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// HTTP 401: token rejected
    AuthFailure,
    /// remote answered but has no record
    NotFound,
    /// transport failure, timeout or unexpected shape
    NetworkError,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::AuthFailure => "auth_failure",
            FailureReason::NotFound => "not_found",
            FailureReason::NetworkError => "network_error",
        }
    }
}

/// Result of one per-identifier lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchOutcome {
    Success { record: OrderRecord },
    Failure { reason: FailureReason, detail: String },
}

impl FetchOutcome {
    pub fn success(record: OrderRecord) -> Self {
        FetchOutcome::Success { record }
    }

    pub fn failure(reason: FailureReason, detail: impl Into<String>) -> Self {
        FetchOutcome::Failure {
            reason,
            detail: detail.into(),
        }
    }

    pub fn auth_failure(detail: impl Into<String>) -> Self {
        Self::failure(FailureReason::AuthFailure, detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::failure(FailureReason::NotFound, detail)
    }

    pub fn network_error(detail: impl Into<String>) -> Self {
        Self::failure(FailureReason::NetworkError, detail)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            FetchOutcome::Success { .. } => None,
            FetchOutcome::Failure { reason, .. } => Some(*reason),
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        self.failure_reason() == Some(FailureReason::AuthFailure)
    }

    pub fn record(&self) -> Option<&OrderRecord> {
        match self {
            FetchOutcome::Success { record } => Some(record),
            FetchOutcome::Failure { .. } => None,
        }
    }

    /// Metric label
    pub fn label(&self) -> &'static str {
        self.failure_reason().map(|r| r.as_str()).unwrap_or("success")
    }
}
