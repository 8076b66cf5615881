use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use tss::DkgError;

/// Operator-facing failures. Messages carry party ids at most; key material
/// and peer endpoints never reach a response body.
#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthenticated transport message: {0}")]
    Unauthenticated(String),
    #[error("node is unhealthy: {0}")]
    Unhealthy(String),
    #[error("a key generation ceremony is already running")]
    DkgAlreadyRunning,
    #[error("key generation failed: {0}")]
    DkgFailed(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DkgError> for ValidatorError {
    fn from(err: DkgError) -> Self {
        match err {
            DkgError::AlreadyRunning => ValidatorError::DkgAlreadyRunning,
            other => ValidatorError::DkgFailed(other.to_string()),
        }
    }
}

impl IntoResponse for ValidatorError {
    fn into_response(self) -> Response {
        let status = match &self {
            ValidatorError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ValidatorError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ValidatorError::Unhealthy(_) => StatusCode::SERVICE_UNAVAILABLE,
            ValidatorError::DkgAlreadyRunning => StatusCode::CONFLICT,
            ValidatorError::DkgFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ValidatorError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
