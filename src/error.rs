//! Error taxonomy shared by the store and the HTTP layer
//!
//! Every variant maps to one stable status/code pair so callers can
//! distinguish failure classes without parsing messages.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed required field (400)
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Session/marker/post id does not exist (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Token absent, invalid, or wrong role (403)
    ///
    /// Carries no detail: "wrong role" and "no such token" must be
    /// indistinguishable to the caller.
    #[error("Invalid token")]
    Authorization,

    /// Slug collision or overlapping marker range (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Attachment storage failure; the owning create is aborted (500)
    #[error("Attachment storage failed: {0}")]
    Attachment(String),

    /// Video metadata lookup failure; session creation is aborted (400)
    #[error("Invalid video URL: {0}")]
    Dependency(String),

    /// Internal invariant violation (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Database error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Authorization => (StatusCode::FORBIDDEN, "AUTHORIZATION_ERROR"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT_ERROR"),
            ApiError::Attachment(_) => (StatusCode::INTERNAL_SERVER_ERROR, "ATTACHMENT_ERROR"),
            ApiError::Dependency(_) => (StatusCode::BAD_REQUEST, "DEPENDENCY_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        };

        if status.is_server_error() {
            error!("{}", self);
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for store operations and API handlers
pub type ApiResult<T> = Result<T, ApiError>;
