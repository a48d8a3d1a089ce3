//! Error types with HTTP status code mapping.

use std::path::PathBuf;

use bytes::Bytes;
use http_body_util::Full;
use hyper::StatusCode;

use crate::response::{self, HttpResponse};

/// Error type for registry administration and request conversion.
///
/// Failures of an invocation itself are never reported through this type;
/// they come back as [`Fault`](crate::invoke::Fault) values.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Registry errors
    #[error("Duplicate function path: {0}")]
    DuplicatePath(String),

    #[error("Function not registered: {0}")]
    NotRegistered(String),

    // Request errors
    #[error("Bad request: {0}")]
    BadRequest(String),

    // Loader errors
    #[error("Manifest error in {}: {message}", .path.display())]
    Manifest { path: PathBuf, message: String },

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    // System errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Map error to HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::NotRegistered(_) => StatusCode::NOT_FOUND,
            Error::DuplicatePath(_) => StatusCode::CONFLICT,

            Error::Manifest { .. } | Error::Config(_) | Error::Io(_) | Error::Json(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Convert error into HTTP response.
    pub fn into_response(self) -> HttpResponse {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!("Internal error: {self}");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        let body = serde_json::json!({ "error": message });
        response::raw(status, Full::new(Bytes::from(body.to_string())))
    }
}

/// Result type alias using funcset's Error.
pub type Result<T> = std::result::Result<T, Error>;
