//! Image upload ingestion for imgdrop.
//!
//! This module provides the upload pipeline:
//! - Validation policy (size limit, MIME and extension allow-lists)
//! - Collision-resistant name generation
//! - Storage root management and traversal-safe path resolution
//! - Streaming multipart ingestion with partial-file cleanup

mod error;
mod naming;
mod pipeline;
mod policy;
mod storage;

use std::path::PathBuf;

use chrono::{DateTime, Utc};

pub use error::{BodyReadError, UploadError, UploadErrorKind};
pub use naming::{generate_name, in_progress_name, NAME_ENTROPY_BYTES};
pub use pipeline::UploadPipeline;
pub use policy::{extension_of, ValidationPolicy};
pub use storage::StorageRoot;

/// Default maximum upload size (10MB).
pub const DEFAULT_MAX_UPLOAD_SIZE_MB: u64 = 10;

/// Default multipart field carrying the image.
pub const DEFAULT_FIELD_NAME: &str = "image";

/// Default accepted MIME types.
pub const DEFAULT_ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/bmp",
];

/// Default accepted file extensions.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];

/// Number of files a single upload request may carry.
pub const MAX_FILES_PER_REQUEST: usize = 1;

/// A file part as received from the client, before validation.
///
/// Everything except the byte count of `stream` is client-supplied and untrusted.
pub struct IncomingFile<S> {
    /// Filename sent by the client. Only used to derive the extension.
    pub original_name: String,
    /// MIME type sent by the client.
    pub declared_mime_type: String,
    /// Size hint sent by the client, if any.
    pub declared_size: Option<u64>,
    /// File content. Consumed exactly once.
    pub stream: S,
}

impl<S> IncomingFile<S> {
    /// Create an incoming file from its parts.
    pub fn new(
        original_name: impl Into<String>,
        declared_mime_type: impl Into<String>,
        stream: S,
    ) -> Self {
        Self {
            original_name: original_name.into(),
            declared_mime_type: declared_mime_type.into(),
            declared_size: None,
            stream,
        }
    }

    /// Attach a client-declared size hint.
    pub fn with_declared_size(mut self, size: u64) -> Self {
        self.declared_size = Some(size);
        self
    }
}

/// A successfully stored upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Generated filename (`<32 hex chars>.<ext>`).
    pub generated_name: String,
    /// Absolute path of the stored file.
    pub absolute_path: PathBuf,
    /// Number of bytes actually written.
    pub size_bytes: u64,
    /// When the file was committed.
    pub created_at: DateTime<Utc>,
}
