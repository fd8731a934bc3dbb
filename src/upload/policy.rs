//! Upload validation policy.

use std::collections::HashSet;

use super::{UploadError, DEFAULT_FIELD_NAME, MAX_FILES_PER_REQUEST};

/// Immutable upload policy: size limit, allow-lists and the expected field.
///
/// Allow-list entries are normalized on construction: MIME types and
/// extensions are lowercased, extensions lose any leading dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPolicy {
    max_size_bytes: u64,
    allowed_mime_types: HashSet<String>,
    allowed_extensions: HashSet<String>,
    field_name: String,
}

impl ValidationPolicy {
    /// Create a policy. `max_size_bytes` is clamped to at least 1.
    pub fn new<'a>(
        max_size_bytes: u64,
        allowed_mime_types: impl IntoIterator<Item = &'a str>,
        allowed_extensions: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            max_size_bytes: max_size_bytes.max(1),
            allowed_mime_types: allowed_mime_types
                .into_iter()
                .map(normalize_mime)
                .filter(|m| !m.is_empty())
                .collect(),
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|e| e.trim().trim_start_matches('.').to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
            field_name: DEFAULT_FIELD_NAME.to_string(),
        }
    }

    /// Set the multipart field expected to carry the file.
    pub fn with_field_name(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = field_name.into();
        self
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn max_files(&self) -> usize {
        MAX_FILES_PER_REQUEST
    }

    /// Check a declared MIME type. Parameters such as `; charset=` are ignored.
    pub fn allows_mime_type(&self, mime: &str) -> bool {
        self.allowed_mime_types.contains(&normalize_mime(mime))
    }

    /// Check an extension (case-insensitive, without the dot).
    pub fn allows_extension(&self, extension: &str) -> bool {
        self.allowed_extensions.contains(&extension.to_lowercase())
    }

    /// Validate the client's filename and declared MIME type.
    ///
    /// Both must pass independently. Returns the lowercased extension to use
    /// for the stored name.
    pub fn check_type(
        &self,
        original_name: &str,
        declared_mime: &str,
    ) -> Result<String, UploadError> {
        let extension = extension_of(original_name).ok_or_else(|| {
            UploadError::unsupported_type(format!(
                "Unsupported file type: {original_name:?} has no extension"
            ))
        })?;

        if !self.allows_extension(&extension) {
            return Err(UploadError::unsupported_type(format!(
                "Unsupported file type: .{extension} files are not allowed"
            )));
        }

        if !self.allows_mime_type(declared_mime) {
            return Err(UploadError::unsupported_type(format!(
                "Unsupported file type: {declared_mime:?} is not an allowed content type"
            )));
        }

        Ok(extension)
    }
}

/// Lowercased substring after the last `.` of a filename.
///
/// Returns `None` when there is no dot or nothing follows it.
pub fn extension_of(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_lowercase())
    }
}

fn normalize_mime(mime: &str) -> String {
    mime.split(';').next().unwrap_or("").trim().to_lowercase()
}
