//! Error taxonomy.
//!
//! Provider failures are absorbed inside the fan-out (logged, retried once if
//! transient, never fatal to the job). Only faults in the orchestration
//! itself transition a job to `failed`. Client mistakes are returned
//! synchronously as [`ApiError`] without touching job state.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use uuid::Uuid;

/// A single adapter's failure. Absorbed by the executor.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("provider rejected the request: {0}")]
    Rejected(String),
    #[error("unexpected response payload: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Transient failures get exactly one retry; rejections never do.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Timeout(_) | ProviderError::Network(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ProviderError::InvalidResponse(e.to_string())
        } else if let Some(status) = e.status() {
            if status.is_client_error() {
                ProviderError::Rejected(format!("HTTP {status}"))
            } else {
                ProviderError::Network(format!("HTTP {status}"))
            }
        } else {
            ProviderError::Network(e.to_string())
        }
    }
}

/// Map a non-success HTTP status to the right provider error class.
pub fn status_to_provider_error(status: reqwest::StatusCode) -> ProviderError {
    if status.is_client_error() {
        ProviderError::Rejected(format!("HTTP {status}"))
    } else {
        ProviderError::Network(format!("HTTP {status}"))
    }
}

/// Errors surfaced to HTTP callers. Never driven by provider failures.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("job {0} not found")]
    JobNotFound(Uuid),
    #[error("job {id} is not finished yet (status: {status})")]
    JobNotFinished { id: Uuid, status: String },
    #[error("report {0} not found")]
    ReportNotFound(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::JobNotFound(_) | ApiError::ReportNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::JobNotFinished { .. } => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "internal error serving request");
        }
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(ProviderError::Timeout(Duration::from_secs(10)).is_transient());
        assert!(ProviderError::Network("connection reset".into()).is_transient());
        assert!(!ProviderError::Rejected("HTTP 400".into()).is_transient());
        assert!(!ProviderError::InvalidResponse("bad json".into()).is_transient());
    }

    #[test]
    fn http_status_classification() {
        assert!(matches!(
            status_to_provider_error(reqwest::StatusCode::BAD_REQUEST),
            ProviderError::Rejected(_)
        ));
        assert!(matches!(
            status_to_provider_error(reqwest::StatusCode::BAD_GATEWAY),
            ProviderError::Network(_)
        ));
    }

    #[test]
    fn api_error_status_codes() {
        assert_eq!(
            ApiError::InvalidRequest("too short".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::JobNotFound(Uuid::new_v4()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::JobNotFinished {
                id: Uuid::new_v4(),
                status: "running".into()
            }
            .status_code(),
            StatusCode::CONFLICT
        );
    }
}
