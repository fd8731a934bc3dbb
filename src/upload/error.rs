//! Upload error classification.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Classification of an upload failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UploadErrorKind {
    /// No file under the expected field.
    NoFileProvided,
    /// More files than the policy allows.
    TooManyFiles,
    /// Running byte count exceeded the size limit.
    FileTooLarge,
    /// MIME type or extension is not allow-listed.
    UnsupportedFileType,
    /// Broken multipart framing or an aborted body stream.
    MalformedRequest,
    /// Storage directory or write failure.
    StorageUnavailable,
    /// A resolved name contained unsafe path components.
    PathRejected,
}

impl UploadErrorKind {
    /// Whether the failure was caused by the client's input.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            UploadErrorKind::StorageUnavailable | UploadErrorKind::PathRejected
        )
    }
}

/// An upload failure: a kind plus a human-readable detail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{detail}")]
pub struct UploadError {
    kind: UploadErrorKind,
    detail: String,
}

impl UploadError {
    /// Create a new upload error.
    pub fn new(kind: UploadErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn no_file(field_name: &str) -> Self {
        Self::new(
            UploadErrorKind::NoFileProvided,
            format!("No file uploaded (expected field \"{field_name}\")"),
        )
    }

    pub fn too_many_files(max_files: usize) -> Self {
        Self::new(
            UploadErrorKind::TooManyFiles,
            format!("Too many files (max {max_files})"),
        )
    }

    pub fn file_too_large(max_size_bytes: u64) -> Self {
        Self::new(
            UploadErrorKind::FileTooLarge,
            format!("File too large (max {})", format_size(max_size_bytes)),
        )
    }

    pub fn unsupported_type(detail: impl Into<String>) -> Self {
        Self::new(UploadErrorKind::UnsupportedFileType, detail)
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::new(UploadErrorKind::MalformedRequest, detail)
    }

    pub fn storage(detail: impl Into<String>) -> Self {
        Self::new(UploadErrorKind::StorageUnavailable, detail)
    }

    pub fn path_rejected(name: &str) -> Self {
        Self::new(
            UploadErrorKind::PathRejected,
            format!("Refusing unsafe storage name: {name:?}"),
        )
    }

    /// The failure classification.
    pub fn kind(&self) -> UploadErrorKind {
        self.kind
    }

    /// The human-readable detail.
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

/// Render a byte limit the way users configure it.
fn format_size(bytes: u64) -> String {
    const MB: u64 = 1024 * 1024;
    const KB: u64 = 1024;

    if bytes >= MB && bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else if bytes >= KB && bytes % KB == 0 {
        format!("{}KB", bytes / KB)
    } else {
        format!("{bytes} bytes")
    }
}

/// Errors raised while pulling bytes from an upload body.
pub trait BodyReadError: std::fmt::Display {
    /// Whether the transport stopped reading because the body hit its size cap.
    fn is_length_limit(&self) -> bool {
        false
    }
}

impl BodyReadError for MultipartError {
    fn is_length_limit(&self) -> bool {
        self.status() == StatusCode::PAYLOAD_TOO_LARGE
    }
}

impl BodyReadError for std::io::Error {}
