//! Response DTOs for the web layer.

use serde::Serialize;
use utoipa::ToSchema;

use crate::upload::StoredFile;

/// Successful upload response.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    /// Always `true`.
    pub success: bool,
    /// Public URL of the stored image.
    pub url: String,
    /// Generated filename.
    pub filename: String,
    /// Stored size in bytes.
    pub size: u64,
    /// Human-readable confirmation.
    pub message: String,
}

impl UploadResponse {
    /// Build a response for a stored file reachable at `url`.
    pub fn new(stored: &StoredFile, url: String) -> Self {
        Self {
            success: true,
            url,
            filename: stored.generated_name.clone(),
            size: stored.size_bytes,
            message: "Image uploaded successfully".to_string(),
        }
    }
}
