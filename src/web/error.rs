//! API error handling for the imgdrop web layer.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::upload::{UploadError, UploadErrorKind};

/// API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// No file under the expected field (400).
    NoFileProvided,
    /// More than one file (400).
    TooManyFiles,
    /// File exceeds the size limit (413).
    FileTooLarge,
    /// MIME type or extension not allowed (415).
    UnsupportedFileType,
    /// Broken multipart body (400).
    MalformedRequest,
    /// Upload storage failure (503).
    StorageUnavailable,
    /// Unsafe storage path (500).
    PathRejected,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::NoFileProvided => StatusCode::BAD_REQUEST,
            ErrorCode::TooManyFiles => StatusCode::BAD_REQUEST,
            ErrorCode::FileTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::UnsupportedFileType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ErrorCode::MalformedRequest => StatusCode::BAD_REQUEST,
            ErrorCode::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::PathRejected => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<UploadErrorKind> for ErrorCode {
    fn from(kind: UploadErrorKind) -> Self {
        match kind {
            UploadErrorKind::NoFileProvided => ErrorCode::NoFileProvided,
            UploadErrorKind::TooManyFiles => ErrorCode::TooManyFiles,
            UploadErrorKind::FileTooLarge => ErrorCode::FileTooLarge,
            UploadErrorKind::UnsupportedFileType => ErrorCode::UnsupportedFileType,
            UploadErrorKind::MalformedRequest => ErrorCode::MalformedRequest,
            UploadErrorKind::StorageUnavailable => ErrorCode::StorageUnavailable,
            UploadErrorKind::PathRejected => ErrorCode::PathRejected,
        }
    }
}

/// Failure response body: `{"success": false, "error": "...", "code": "..."}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Always `false`.
    pub success: bool,
    /// Human-readable message.
    pub error: String,
    /// Machine-readable error code.
    pub code: ErrorCode,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let body = ErrorBody {
            success: false,
            error: self.message,
            code: self.code,
        };
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        let code = ErrorCode::from(err.kind());
        if err.kind().is_client_error() {
            ApiError::new(code, err.detail())
        } else {
            // Storage details stay in the log.
            tracing::error!(kind = ?err.kind(), "Upload failed: {}", err);
            ApiError::new(code, "The upload could not be stored. Please try again later.")
        }
    }
}
