//! Error types for imgdrop.

use thiserror::Error;

/// Common error type for process-level operations (config, logging, startup).
///
/// Per-request upload failures use [`crate::upload::UploadError`] instead.
#[derive(Error, Debug)]
pub enum ImgdropError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation error for configuration values.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Upload storage could not be prepared.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<validator::ValidationErrors> for ImgdropError {
    fn from(e: validator::ValidationErrors) -> Self {
        ImgdropError::Validation(e.to_string())
    }
}

/// Result type alias for imgdrop operations.
pub type Result<T> = std::result::Result<T, ImgdropError>;
