//! Streaming upload pipeline.
//!
//! One call to [`UploadPipeline::ingest`] handles one request:
//! `Parsing -> Validating -> Naming -> Writing -> Completed | Failed`.
//! Bytes are written to an in-progress sibling file and renamed into place
//! only once the whole stream has been accepted.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::multipart::Field;
use axum::extract::Multipart;
use axum::http::header::CONTENT_LENGTH;
use chrono::Utc;
use futures::{Stream, StreamExt};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use super::naming::{generate_name, in_progress_name};
use super::{
    BodyReadError, IncomingFile, StorageRoot, StoredFile, UploadError, ValidationPolicy,
};

#[derive(Debug, Clone, Copy)]
enum Stage {
    Parsing,
    Validating,
    Naming,
    Writing,
    Completed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Parsing => "parsing",
            Stage::Validating => "validating",
            Stage::Naming => "naming",
            Stage::Writing => "writing",
            Stage::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Upload pipeline bound to a storage root and a validation policy.
///
/// Cheap to share: holds no per-request state.
#[derive(Debug, Clone)]
pub struct UploadPipeline {
    storage: StorageRoot,
    policy: Arc<ValidationPolicy>,
}

impl UploadPipeline {
    pub fn new(storage: StorageRoot, policy: ValidationPolicy) -> Self {
        Self {
            storage,
            policy: Arc::new(policy),
        }
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    pub fn storage(&self) -> &StorageRoot {
        &self.storage
    }

    /// Ingest one multipart request.
    ///
    /// Exactly one file must arrive under the policy's field name; other
    /// fields are skipped. The file only gets its final name once the whole
    /// body has been read, so an error or a dropped request leaves nothing
    /// behind.
    #[tracing::instrument(skip_all, fields(field = %self.policy.field_name()))]
    pub async fn ingest(&self, mut multipart: Multipart) -> Result<StoredFile, UploadError> {
        tracing::debug!(stage = %Stage::Parsing, "Reading multipart body");

        let mut pending: Option<WrittenFile> = None;
        let mut file_count = 0usize;

        loop {
            let field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(e) => {
                    let err = self.read_error(e);
                    self.discard_pending(pending.take()).await;
                    return Err(err);
                }
            };

            if !self.is_expected_file(&field) {
                tracing::debug!(name = ?field.name(), "Skipping multipart field");
                continue;
            }

            file_count += 1;
            if file_count > self.policy.max_files() {
                self.discard_pending(pending.take()).await;
                tracing::warn!(file_count, "Rejected upload with too many files");
                return Err(UploadError::too_many_files(self.policy.max_files()));
            }

            pending = Some(self.write(incoming_from_field(field)).await?);
        }

        match pending {
            Some(written) => self.commit(written).await,
            None => {
                tracing::warn!("Rejected upload without a file");
                Err(UploadError::no_file(self.policy.field_name()))
            }
        }
    }

    /// Validate, name and write a single file, then move it into place.
    pub async fn store<S, E>(&self, file: IncomingFile<S>) -> Result<StoredFile, UploadError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: BodyReadError,
    {
        let written = self.write(file).await?;
        self.commit(written).await
    }

    /// Validate, name and write a file under its in-progress name.
    async fn write<S, E>(&self, file: IncomingFile<S>) -> Result<WrittenFile, UploadError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: BodyReadError,
    {
        tracing::debug!(
            stage = %Stage::Validating,
            original_name = %file.original_name,
            declared_mime = %file.declared_mime_type,
            "Validating upload"
        );

        let extension = self
            .policy
            .check_type(&file.original_name, &file.declared_mime_type)
            .inspect_err(|e| tracing::warn!(reason = %e, "Rejected upload"))?;

        if let Some(declared) = file.declared_size {
            if declared > self.policy.max_size_bytes() {
                tracing::warn!(declared, "Rejected upload by declared size");
                return Err(UploadError::file_too_large(self.policy.max_size_bytes()));
            }
        }

        tracing::debug!(stage = %Stage::Naming, "Generating stored name");
        let generated_name = generate_name(&extension);
        let final_path = self.storage.resolve(&generated_name)?;
        let part_path = self.storage.resolve(&in_progress_name(&generated_name))?;

        tracing::debug!(stage = %Stage::Writing, name = %generated_name, "Writing upload");
        self.storage.ensure_root().await?;
        let mut partial = PartialFile::create(part_path).await?;

        let size_bytes = match self.copy_stream(&mut partial, file.stream).await {
            Ok(n) => n,
            Err(e) => {
                partial.discard(&self.storage).await;
                return Err(e);
            }
        };

        Ok(WrittenFile {
            partial,
            generated_name,
            final_path,
            size_bytes,
        })
    }

    async fn commit(&self, written: WrittenFile) -> Result<StoredFile, UploadError> {
        let WrittenFile {
            partial,
            generated_name,
            final_path,
            size_bytes,
        } = written;

        if let Err(e) = partial.commit(&final_path).await {
            tracing::error!(name = %generated_name, error = %e, "Failed to commit upload");
            return Err(UploadError::storage(format!("Failed to save file: {e}")));
        }

        tracing::info!(
            stage = %Stage::Completed,
            name = %generated_name,
            size_bytes,
            "Upload stored"
        );

        Ok(StoredFile {
            generated_name,
            absolute_path: final_path,
            size_bytes,
            created_at: Utc::now(),
        })
    }

    /// Copy the stream into `partial`, counting bytes and enforcing the limit.
    async fn copy_stream<S, E>(
        &self,
        partial: &mut PartialFile,
        stream: S,
    ) -> Result<u64, UploadError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: BodyReadError,
    {
        let max = self.policy.max_size_bytes();
        let mut stream = std::pin::pin!(stream);
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| self.read_error(e))?;

            written += chunk.len() as u64;
            if written > max {
                tracing::warn!(max, received = written, "Upload exceeded size limit");
                return Err(UploadError::file_too_large(max));
            }

            partial.write_all(&chunk).await.map_err(|e| {
                tracing::error!(path = %partial.path().display(), error = %e, "Write failed");
                UploadError::storage(format!("Failed to save file: {e}"))
            })?;
        }

        Ok(written)
    }

    fn is_expected_file(&self, field: &Field<'_>) -> bool {
        field.name() == Some(self.policy.field_name())
            && field.file_name().is_some_and(|name| !name.is_empty())
    }

    fn read_error<E: BodyReadError>(&self, e: E) -> UploadError {
        if e.is_length_limit() {
            tracing::warn!("Request body exceeded transport limit");
            UploadError::file_too_large(self.policy.max_size_bytes())
        } else {
            tracing::warn!(error = %e, "Upload stream aborted");
            UploadError::malformed(format!("Failed to read upload: {e}"))
        }
    }

    async fn discard_pending(&self, pending: Option<WrittenFile>) {
        if let Some(written) = pending {
            written.partial.discard(&self.storage).await;
        }
    }
}

fn incoming_from_field(field: Field<'_>) -> IncomingFile<Field<'_>> {
    let original_name = field.file_name().unwrap_or_default().to_string();
    let declared_mime_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let declared_size = field
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    IncomingFile {
        original_name,
        declared_mime_type,
        declared_size,
        stream: field,
    }
}

/// A fully written upload that has not been moved into place yet.
struct WrittenFile {
    partial: PartialFile,
    generated_name: String,
    final_path: PathBuf,
    size_bytes: u64,
}

/// An in-progress upload file.
///
/// Removed on drop unless committed, so a cancelled request (dropped future)
/// leaves nothing behind.
struct PartialFile {
    path: PathBuf,
    file: Option<File>,
}

impl PartialFile {
    async fn create(path: PathBuf) -> Result<Self, UploadError> {
        let file = File::create(&path).await.map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Failed to create upload file");
            UploadError::storage(format!("Failed to save file: {e}"))
        })?;

        Ok(Self {
            path,
            file: Some(file),
        })
    }

    fn path(&self) -> &Path {
        &self.path
    }

    async fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.write_all(buf).await,
            None => Err(std::io::Error::other("upload file already closed")),
        }
    }

    /// Flush, sync and rename into place.
    async fn commit(mut self, final_path: &Path) -> std::io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }

        tokio::fs::rename(&self.path, final_path).await
    }

    async fn discard(mut self, storage: &StorageRoot) {
        drop(self.file.take());
        storage.discard(&self.path).await;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        drop(self.file.take());
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed abandoned upload"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to remove abandoned upload"
                )
            }
        }
    }
}
