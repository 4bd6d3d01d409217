//! File uploads: in-memory upload values, constraints, storage
//!
//! Columns whose metadata declares `"type": "file"` persist a storage path
//! instead of the raw submission value. The save pipeline stores the upload
//! through a [`FileStorage`] backend after checking it against the column's
//! [`UploadPolicy`].

pub mod storage;

pub use storage::{FileStorage, LocalFileStorage, StoredFile};

use bytes::Bytes;
use thiserror::Error;

use crate::schema::ColumnMeta;

/// Default maximum upload size (5 MiB)
pub const DEFAULT_MAX_SIZE: u64 = 5 * 1024 * 1024;

/// Default maximum files per multi-upload field
pub const DEFAULT_MAX_FILES: u32 = 10;

/// Upload failure
#[derive(Debug, Error)]
pub enum UploadError {
    /// File exceeds the size limit
    #[error("File of {actual} bytes exceeds the {max} byte limit")]
    TooLarge {
        /// Uploaded size
        actual: u64,
        /// Allowed maximum
        max: u64,
    },

    /// Detected content type is not allowed
    #[error("File type `{found}` is not allowed (allowed: {})", allowed.join(", "))]
    DisallowedType {
        /// Detected MIME type
        found: String,
        /// Allowed MIME types
        allowed: Vec<String>,
    },

    /// More files than the field permits
    #[error("{actual} files uploaded, maximum is {max}")]
    TooManyFiles {
        /// Uploaded count
        actual: usize,
        /// Allowed maximum
        max: u32,
    },

    /// Filesystem failure while storing or deleting
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An uploaded file held in memory before storage
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Form field the file was submitted under
    pub field_name: String,
    /// Client-supplied file name
    pub filename: String,
    /// Client-declared content type
    pub content_type: Option<String>,
    /// File contents
    pub data: Bytes,
}

impl UploadedFile {
    /// Size in bytes
    #[must_use]
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Lowercased extension from the client file name
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.filename)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
    }

    /// Effective MIME type: content sniffing first, declared type second
    ///
    /// Sniffing means a renamed executable does not pass as an image.
    #[must_use]
    pub fn mime_type(&self) -> String {
        infer::get(&self.data)
            .map(|kind| kind.mime_type().to_string())
            .or_else(|| self.content_type.clone())
            .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string())
    }
}

/// Per-field upload constraints, from column metadata
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    /// Allowed MIME types; empty allows anything
    pub allowed_mimes: Vec<String>,
    /// Maximum size in bytes
    pub max_size: u64,
    /// Maximum number of files for multi-upload fields
    pub max_files: u32,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            allowed_mimes: Vec::new(),
            max_size: DEFAULT_MAX_SIZE,
            max_files: DEFAULT_MAX_FILES,
        }
    }
}

impl UploadPolicy {
    /// Build a policy from column metadata, filling gaps with defaults
    #[must_use]
    pub fn from_meta(meta: Option<&ColumnMeta>) -> Self {
        let defaults = Self::default();
        match meta {
            Some(meta) => Self {
                allowed_mimes: meta.allowed_mimes.clone().unwrap_or(defaults.allowed_mimes),
                max_size: meta.max_size.unwrap_or(defaults.max_size),
                max_files: meta.max_files.unwrap_or(defaults.max_files),
            },
            None => defaults,
        }
    }

    /// Check one file against this policy
    pub fn check(&self, file: &UploadedFile) -> Result<(), UploadError> {
        if file.size() > self.max_size {
            return Err(UploadError::TooLarge {
                actual: file.size(),
                max: self.max_size,
            });
        }
        if !self.allowed_mimes.is_empty() {
            let found = file.mime_type();
            if !self.allowed_mimes.iter().any(|m| m == &found) {
                return Err(UploadError::DisallowedType {
                    found,
                    allowed: self.allowed_mimes.clone(),
                });
            }
        }
        Ok(())
    }

    /// Check a batch size against this policy
    pub fn check_count(&self, count: usize) -> Result<(), UploadError> {
        if count > self.max_files as usize {
            return Err(UploadError::TooManyFiles {
                actual: count,
                max: self.max_files,
            });
        }
        Ok(())
    }
}
