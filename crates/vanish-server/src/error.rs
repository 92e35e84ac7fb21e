//! Server error types.
//!
//! [`ServerError`] covers process-level failures (startup, socket, reclaimer
//! shutdown). [`ApiError`] is what a single HTTP request fails with; it always
//! renders as a JSON `{"detail": ...}` body.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use vanish_core::{ReclaimerError, RelayError};

use crate::wire::ErrorBody;

/// Errors that can occur in the server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration error (limits that cannot work together, zero interval).
    ///
    /// Fatal, prevents startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Socket error (bind address in use, accept failure).
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The expiry reclaimer did not stop cleanly.
    #[error("reclaimer error: {0}")]
    Reclaimer(#[from] ReclaimerError),
}

/// Detail returned for lookups of unregistered users.
pub const NOT_FOUND_DETAIL: &str = "Public key not found";

/// A failed HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    /// An error response with any status.
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self { status, detail: detail.into() }
    }

    /// A 400 with the given detail.
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    /// HTTP status of the response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Human-readable reason sent to the client.
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::NotFound(_) => {
                Self { status: StatusCode::NOT_FOUND, detail: NOT_FOUND_DETAIL.to_string() }
            },
            RelayError::InvalidRequest(detail) => Self::bad_request(detail),
            RelayError::Store(e) => {
                tracing::error!(error = %e, "mailbox store refused operation");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    detail: "mailbox store unavailable".to_string(),
                }
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        // Oversized bodies keep their 413; every other malformed body is a 400.
        let status = match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        };
        Self { status, detail: rejection.body_text() }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self { status: rejection.status(), detail: rejection.body_text() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use vanish_core::StoreError;

    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err = ApiError::from(RelayError::NotFound("bob".to_string()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.detail(), NOT_FOUND_DETAIL);
    }

    #[test]
    fn invalid_request_keeps_detail() {
        let err = ApiError::from(RelayError::InvalidRequest("sender must not be empty".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.detail(), "sender must not be empty");
    }

    #[test]
    fn store_failure_hides_cause() {
        let err = ApiError::from(RelayError::Store(StoreError::Unavailable("disk".into())));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.detail().contains("disk"));
    }

    #[test]
    fn server_error_display() {
        let err = ServerError::Config("reclaim interval must be positive".to_string());
        assert_eq!(err.to_string(), "configuration error: reclaim interval must be positive");
    }
}
