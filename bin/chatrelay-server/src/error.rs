//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors are converted to a JSON body of
//! the form `{"error": "<code>"}`.  Codes are stable and machine-readable.
//!
//! Database errors are logged with full detail but only `internal_error`
//! reaches the caller.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// All errors that can occur in the chatrelay-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Malformed body, empty message, empty title.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// No identity was supplied by the fronting auth layer.
    #[error("authentication required")]
    Unauthenticated,

    /// The target is absent or owned by someone else; both look the same.
    #[error("not found: {0}")]
    NotFound(&'static str),

    /// A required upstream setting is missing.
    #[error("not configured: {0}")]
    NotConfigured(&'static str),

    /// Propagated from the SQLite store.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServerError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Code placed in the `error` field of the response body.
    pub fn code(&self) -> &'static str {
        match self {
            ServerError::InvalidInput(code)
            | ServerError::NotFound(code)
            | ServerError::NotConfigured(code) => code,
            ServerError::Unauthenticated => "auth_required",
            ServerError::Database(_) => "internal_error",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        if let ServerError::Database(e) = &self {
            error!(error = %e, "database error");
        }
        (self.status(), Json(json!({ "error": self.code() }))).into_response()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
