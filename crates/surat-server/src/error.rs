//! HTTP error types for the Surat server.
//!
//! Maps service errors from `surat-core` into HTTP responses. Every variant
//! produces a JSON body with a machine-readable `error` field and a
//! human-readable `message`. Infrastructure failures are logged in full and
//! answered with a fixed message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use surat_core::error::{TemplateError, UserError};

/// Application-level error returned from HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Client sent missing or invalid input.
    BadRequest(String),
    /// The resource already exists.
    Conflict(String),
    /// Requested resource not found.
    NotFound(String),
    /// The request body exceeds the configured limit.
    PayloadTooLarge(String),
    /// The uploaded file is not a usable DOCX package.
    CorruptArchive(String),
    /// The template could not be rendered.
    RenderFailed(String),
    /// Template bytes could not be stored.
    StorageWriteFailed(String),
    /// The template record could not be saved.
    MetadataWriteFailed(String),
    /// A stored template could not be read or processed.
    ProcessingFailed(String),
    /// Internal server error.
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            Self::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", msg),
            Self::CorruptArchive(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "corrupt_archive", msg)
            }
            Self::RenderFailed(msg) => {
                tracing::warn!(error = %msg, "render failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "render_failed", msg)
            }
            Self::StorageWriteFailed(detail) => {
                tracing::error!(error = %detail, "template storage write failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage_write_failed",
                    "error uploading template file".to_owned(),
                )
            }
            Self::MetadataWriteFailed(detail) => {
                tracing::error!(error = %detail, "template record write failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "metadata_write_failed",
                    "error saving template information".to_owned(),
                )
            }
            Self::ProcessingFailed(detail) => {
                tracing::error!(error = %detail, "template processing failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "processing_failed",
                    "error processing template file".to_owned(),
                )
            }
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error".to_owned(),
                )
            }
        };

        let body = ErrorBody {
            error: error_type,
            message,
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<TemplateError> for AppError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::InputMissing { .. } | TemplateError::InvalidName { .. } => {
                Self::BadRequest(err.to_string())
            }
            TemplateError::Conflict { .. } => Self::Conflict(err.to_string()),
            TemplateError::NotFound { .. } => Self::NotFound(err.to_string()),
            TemplateError::CorruptArchive(_) => Self::CorruptArchive(err.to_string()),
            TemplateError::Render(_) => Self::RenderFailed(err.to_string()),
            TemplateError::StorageWrite { .. } => Self::StorageWriteFailed(err.to_string()),
            TemplateError::MetadataWrite { .. } => Self::MetadataWriteFailed(err.to_string()),
            TemplateError::MetadataRead { .. } | TemplateError::Processing { .. } => {
                Self::ProcessingFailed(err.to_string())
            }
        }
    }
}

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::InputMissing { .. } | UserError::Invalid { .. } => {
                Self::BadRequest(err.to_string())
            }
            UserError::Conflict { .. } => Self::Conflict(err.to_string()),
            UserError::NotFound { .. } => Self::NotFound(err.to_string()),
            UserError::Upstream { .. } => Self::Internal(err.to_string()),
        }
    }
}
