//! Upload storage root.
//!
//! All accepted uploads live directly under a single directory:
//! ```text
//! {root}/
//! ├── 3f2a9c0e5b7d41e8a6c2f09d1b3e7a54.jpg
//! ├── 9b1e0c7d2a4f48b3915e6d0c8a7f2b13.png
//! └── .5c8d...e1.webp.part   (upload still in progress)
//! ```

use std::io;
use std::path::{Component, Path, PathBuf};

use super::naming::{generate_name, in_progress_name};
use super::UploadError;

/// The directory that receives uploads.
#[derive(Debug, Clone)]
pub struct StorageRoot {
    root: PathBuf,
}

impl StorageRoot {
    /// Create a storage root for `path`.
    ///
    /// Relative paths are made absolute against the current directory. The
    /// directory itself is not touched until [`StorageRoot::ensure_root`].
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self {
            root: std::path::absolute(path.as_ref())?,
        })
    }

    /// Absolute path of the storage directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Make sure the storage directory exists and accepts new files.
    ///
    /// Creation is "create if absent", so concurrent callers never race each
    /// other into an error.
    pub async fn ensure_root(&self) -> Result<PathBuf, UploadError> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            tracing::error!(
                root = %self.root.display(),
                error = %e,
                "Failed to create upload directory"
            );
            UploadError::storage(format!("Upload directory could not be created: {e}"))
        })?;

        let metadata = tokio::fs::metadata(&self.root).await.map_err(|e| {
            UploadError::storage(format!("Upload directory is not accessible: {e}"))
        })?;

        if !metadata.is_dir() {
            return Err(UploadError::storage(format!(
                "Upload path {} is not a directory",
                self.root.display()
            )));
        }

        // Mode bits miss ownership and read-only mounts; try a real write.
        let write_check = self.root.join(in_progress_name(&generate_name("check")));
        if let Err(e) = tokio::fs::File::create(&write_check).await {
            tracing::error!(
                root = %self.root.display(),
                error = %e,
                "Upload directory not writable"
            );
            return Err(UploadError::storage(format!("Upload directory is not writable: {e}")));
        }
        self.discard(&write_check).await;

        Ok(self.root.clone())
    }

    /// Join a stored name onto the root.
    ///
    /// The name must be a single plain path component: no separators, no
    /// `.`/`..`, no NUL. No existence check is made.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, UploadError> {
        if name.is_empty() || name.contains(['/', '\\', '\0']) {
            return Err(UploadError::path_rejected(name));
        }

        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) if part == name => Ok(self.root.join(name)),
            _ => Err(UploadError::path_rejected(name)),
        }
    }

    /// Remove a file, logging instead of failing.
    ///
    /// Returns `true` if a file was removed.
    pub async fn discard(&self, path: &Path) -> bool {
        match tokio::fs::remove_file(path).await {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove upload file");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::UploadErrorKind;
    use tempfile::TempDir;

    fn setup_root() -> (TempDir, StorageRoot) {
        let temp_dir = TempDir::new().unwrap();
        let root = StorageRoot::new(temp_dir.path().join("uploads")).unwrap();
        (temp_dir, root)
    }

    #[test]
    fn test_new_does_not_create_directory() {
        let (_temp_dir, root) = setup_root();
        assert!(root.root().is_absolute());
        assert!(!root.root().exists());
    }

    #[test]
    fn test_new_makes_relative_path_absolute() {
        let root = StorageRoot::new("uploads").unwrap();
        assert!(root.root().is_absolute());
        assert!(root.root().ends_with("uploads"));
    }

    #[tokio::test]
    async fn test_ensure_root_creates_directory() {
        let (_temp_dir, root) = setup_root();

        let path = root.ensure_root().await.unwrap();

        assert_eq!(path, root.root());
        assert!(path.is_dir());
        // The write check leaves nothing behind
        assert_eq!(std::fs::read_dir(&path).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_ensure_root_is_idempotent() {
        let (_temp_dir, root) = setup_root();

        root.ensure_root().await.unwrap();
        root.ensure_root().await.unwrap();

        assert!(root.root().is_dir());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_ensure_root_concurrent() {
        let temp_dir = TempDir::new().unwrap();
        let root = StorageRoot::new(temp_dir.path().join("a").join("b").join("uploads")).unwrap();

        let handles: Vec<_> = (0..64)
            .map(|_| {
                let root = root.clone();
                tokio::spawn(async move { root.ensure_root().await })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        let entries: Vec<_> = std::fs::read_dir(temp_dir.path().join("a").join("b"))
            .unwrap()
            .collect();
        assert_eq!(entries.len(), 1);
        assert!(root.root().is_dir());
    }

    #[tokio::test]
    async fn test_ensure_root_fails_when_path_is_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("not_a_dir");
        std::fs::write(&file_path, b"x").unwrap();

        let root = StorageRoot::new(&file_path).unwrap();
        let err = root.ensure_root().await.unwrap_err();

        assert_eq!(err.kind(), UploadErrorKind::StorageUnavailable);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ensure_root_fails_when_not_writable() {
        use std::os::unix::fs::PermissionsExt;

        let (_temp_dir, root) = setup_root();
        std::fs::create_dir(root.root()).unwrap();
        std::fs::set_permissions(root.root(), std::fs::Permissions::from_mode(0o555)).unwrap();

        // Privileged users write regardless of mode bits
        let can_write = std::fs::write(root.root().join("x"), b"x").is_ok();

        let result = root.ensure_root().await;

        std::fs::set_permissions(root.root(), std::fs::Permissions::from_mode(0o755)).unwrap();
        if can_write {
            assert!(result.is_ok());
        } else {
            assert_eq!(result.unwrap_err().kind(), UploadErrorKind::StorageUnavailable);
        }
    }

    #[test]
    fn test_resolve_plain_name() {
        let (_temp_dir, root) = setup_root();

        let path = root
            .resolve("3f2a9c0e5b7d41e8a6c2f09d1b3e7a54.jpg")
            .unwrap();

        assert_eq!(
            path,
            root.root().join("3f2a9c0e5b7d41e8a6c2f09d1b3e7a54.jpg")
        );
    }

    #[test]
    fn test_resolve_in_progress_name() {
        let (_temp_dir, root) = setup_root();
        assert!(root.resolve(".abc.jpg.part").is_ok());
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let (_temp_dir, root) = setup_root();

        for name in [
            "",
            ".",
            "..",
            "../etc/passwd",
            "a/b.jpg",
            "a\\b.jpg",
            "/abs.jpg",
            "nul\0.jpg",
        ] {
            let err = root.resolve(name).unwrap_err();
            assert_eq!(err.kind(), UploadErrorKind::PathRejected, "name: {name:?}");
        }
    }

    #[tokio::test]
    async fn test_discard() {
        let (_temp_dir, root) = setup_root();
        root.ensure_root().await.unwrap();

        let path = root.resolve("gone.png").unwrap();
        std::fs::write(&path, b"data").unwrap();

        assert!(root.discard(&path).await);
        assert!(!path.exists());
        assert!(!root.discard(&path).await);
    }
}
