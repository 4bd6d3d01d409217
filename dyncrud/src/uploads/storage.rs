//! File storage backends
//!
//! [`LocalFileStorage`] writes uploads under a root directory with generated
//! names, so client-supplied file names never touch the filesystem. The
//! public prefix is what gets persisted into the database column and served
//! back to browsers.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{UploadError, UploadedFile};

/// Result of storing an upload
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Generated file name
    pub name: String,
    /// Absolute path on disk
    pub path: PathBuf,
    /// Value to persist and serve (public prefix + name)
    pub public_path: String,
    /// Stored size in bytes
    pub size: u64,
}

/// Storage backend for uploaded files
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Persist an upload, returning where it landed
    async fn store(&self, file: &UploadedFile) -> Result<StoredFile, UploadError>;

    /// Delete a previously stored file by its generated name;
    /// `true` if something was removed
    async fn delete(&self, name: &str) -> Result<bool, UploadError>;
}

/// Filesystem storage under a single root directory
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
    public_prefix: String,
}

impl LocalFileStorage {
    /// Storage rooted at `root`, serving under `/uploads`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            public_prefix: "/uploads".into(),
        }
    }

    /// Override the public prefix used in persisted values
    #[must_use]
    pub fn with_public_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.public_prefix = prefix.into();
        self
    }

    /// Root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Generated name: uuid + timestamp, keeping a sanitized extension
    fn unique_name(extension: Option<&str>) -> String {
        let stem = format!(
            "{}_{}",
            uuid::Uuid::new_v4().simple(),
            chrono::Utc::now().timestamp()
        );
        match extension {
            Some(ext) => {
                let ext: String = ext
                    .chars()
                    .filter(char::is_ascii_alphanumeric)
                    .take(10)
                    .collect::<String>()
                    .to_ascii_lowercase();
                if ext.is_empty() {
                    stem
                } else {
                    format!("{stem}.{ext}")
                }
            }
            None => stem,
        }
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn store(&self, file: &UploadedFile) -> Result<StoredFile, UploadError> {
        tokio::fs::create_dir_all(&self.root).await?;

        let name = Self::unique_name(file.extension().as_deref());
        let path = self.root.join(&name);
        tokio::fs::write(&path, &file.data).await?;

        tracing::debug!(field = %file.field_name, name = %name, size = file.size(), "stored upload");

        Ok(StoredFile {
            public_path: format!("{}/{name}", self.public_prefix),
            name,
            path,
            size: file.size(),
        })
    }

    async fn delete(&self, name: &str) -> Result<bool, UploadError> {
        // Only bare generated names are accepted; no path traversal.
        let file_name = Path::new(name)
            .file_name()
            .map(|n| n.to_string_lossy().to_string());
        let Some(file_name) = file_name else {
            return Ok(false);
        };
        let path = self.root.join(file_name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn upload(name: &str) -> UploadedFile {
        UploadedFile {
            field_name: "doc".into(),
            filename: name.into(),
            content_type: Some("text/plain".into()),
            data: Bytes::from_static(b"hello"),
        }
    }

    #[tokio::test]
    async fn test_store_and_delete_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());

        let stored = storage.store(&upload("report.txt")).await.unwrap();
        assert!(stored.path.exists());
        assert!(stored.name.ends_with(".txt"));
        assert!(stored.public_path.starts_with("/uploads/"));
        assert_eq!(stored.size, 5);

        assert!(storage.delete(&stored.name).await.unwrap());
        assert!(!stored.path.exists());
        assert!(!storage.delete(&stored.name).await.unwrap());
    }

    #[tokio::test]
    async fn test_client_filename_never_used() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());
        let stored = storage.store(&upload("../../etc/passwd")).await.unwrap();
        assert!(stored.path.starts_with(dir.path()));
        assert!(!stored.name.contains(".."));
    }

    #[tokio::test]
    async fn test_delete_ignores_path_components() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());
        let stored = storage.store(&upload("a.txt")).await.unwrap();
        // A prefixed path resolves to the same bare name.
        assert!(storage.delete(&format!("../{}", stored.name)).await.unwrap());
    }

    #[test]
    fn test_unique_name_sanitizes_extension() {
        let name = LocalFileStorage::unique_name(Some("p;h$p"));
        assert!(name.ends_with(".php"));
        let name = LocalFileStorage::unique_name(Some(";;"));
        assert!(!name.contains('.'));
    }
}
