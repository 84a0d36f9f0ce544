//! Gateway error handling.
//!
//! A policy denial is not an error; handlers answer it directly with a
//! 403 rejection carrying the reason and matched policy. These variants
//! cover the faults around the decision: storage, evaluation plumbing,
//! and the upstream hop. Each maps to a distinct response category so an
//! upstream outage can never masquerade as a policy denial.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::upstream::UpstreamError;

/// Gateway result type.
pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// A decision that cannot be durably recorded fails the request; it is
    /// never treated as approved.
    #[error("ledger storage failure: {0}")]
    Storage(#[from] spendgate_ledger::LedgerError),

    #[error("policy evaluation failed: {0}")]
    Evaluation(#[from] spendgate_policy::PolicyError),

    #[error("upstream facilitator error: {0}")]
    Upstream(#[from] UpstreamError),
}

impl GatewayError {
    /// The HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Storage(_) | Self::Evaluation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Stable machine-readable error kind for response bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Storage(_) => "storage_error",
            Self::Evaluation(_) => "evaluation_error",
            Self::Upstream(_) => "upstream_error",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match &self {
            Self::Upstream(e) => tracing::warn!(error = %e, "upstream forward failed"),
            other => tracing::error!(error = %other, "request failed"),
        }

        let body = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_faults_are_internal_errors() {
        let err = GatewayError::Storage(spendgate_ledger::LedgerError::Corrupt {
            id: 7,
            message: "unknown decision".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.kind(), "storage_error");
    }

    #[test]
    fn evaluation_faults_are_internal_errors() {
        let err = GatewayError::Evaluation(spendgate_policy::PolicyError::SpendQuery(
            "database error".to_string(),
        ));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.kind(), "evaluation_error");
    }
}
