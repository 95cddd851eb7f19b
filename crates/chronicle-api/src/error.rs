//! Chronicle API — error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chronicle_core::error::RepositoryError;
use chronicle_core::event::EventTime;
use chronicle_core::storage::StorageError;
use serde::Serialize;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Storage setup error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer error that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A repository operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// A request parameter was malformed.
    #[error("validation error: {0}")]
    Validation(String),

    /// No event is stored under the requested token.
    #[error("event not found: {0}")]
    EventNotFound(EventTime),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) | Self::Repository(RepositoryError::InvalidName(_)) => {
                (StatusCode::BAD_REQUEST, "validation_error")
            }
            Self::EventNotFound(_) => (StatusCode::NOT_FOUND, "event_not_found"),
            Self::Repository(RepositoryError::PersistenceFailed { .. }) => {
                (StatusCode::SERVICE_UNAVAILABLE, "persistence_failed")
            }
            Self::Repository(RepositoryError::QueryFailed { .. }) => {
                (StatusCode::BAD_GATEWAY, "query_failed")
            }
            Self::Repository(RepositoryError::PartialFanInFailure { .. }) => {
                (StatusCode::BAD_GATEWAY, "partial_fan_in_failure")
            }
            Self::Repository(RepositoryError::MalformedDocument(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "malformed_document")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = ErrorBody {
            error: error_code,
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
