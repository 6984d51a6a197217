//! Object store for template files.
//!
//! Template bytes live under `blobs/<bucket>/<filename>` in the storage
//! backend. The filename is the object name; uploads never overwrite, so a
//! name maps to exactly one stored file for its whole life.

use std::sync::Arc;

use surat_storage::StorageBackend;

use crate::error::BlobError;

const PREFIX: &str = "blobs/";

/// A named bucket of blobs.
#[derive(Clone)]
pub struct BlobStore {
    backend: Arc<dyn StorageBackend>,
    bucket: String,
}

impl BlobStore {
    /// Create a store for `bucket` on `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn StorageBackend>, bucket: impl Into<String>) -> Self {
        Self {
            backend,
            bucket: bucket.into(),
        }
    }

    fn key(&self, name: &str) -> Result<String, BlobError> {
        validate_name(name)?;
        Ok(format!("{PREFIX}{}/{name}", self.bucket))
    }

    /// Public reference to object `name`, as recorded in template records.
    pub fn location(&self, name: &str) -> String {
        format!("store://{}/{name}", self.bucket)
    }

    /// Whether an object named `name` exists.
    ///
    /// # Errors
    ///
    /// [`BlobError::InvalidName`] for unusable names, [`BlobError::Storage`]
    /// if the backend fails.
    pub async fn exists(&self, name: &str) -> Result<bool, BlobError> {
        Ok(self.backend.exists(&self.key(name)?).await?)
    }

    /// Store `data` as object `name`.
    ///
    /// # Errors
    ///
    /// [`BlobError::InvalidName`] for unusable names, [`BlobError::Storage`]
    /// if the backend fails.
    pub async fn put(&self, name: &str, data: &[u8]) -> Result<(), BlobError> {
        self.backend.put(&self.key(name)?, data).await?;
        Ok(())
    }

    /// Remove object `name`. Removing a missing object is not an error.
    ///
    /// # Errors
    ///
    /// [`BlobError::InvalidName`] for unusable names, [`BlobError::Storage`]
    /// if the backend fails.
    pub async fn delete(&self, name: &str) -> Result<(), BlobError> {
        self.backend.delete(&self.key(name)?).await?;
        Ok(())
    }

    /// Fetch object `name`, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// [`BlobError::InvalidName`] for unusable names, [`BlobError::Storage`]
    /// if the backend fails.
    pub async fn get(&self, name: &str) -> Result<Option<Vec<u8>>, BlobError> {
        Ok(self.backend.get(&self.key(name)?).await?)
    }
}

impl std::fmt::Debug for BlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStore")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

/// Check that `name` is usable as a single path segment.
///
/// # Errors
///
/// [`BlobError::InvalidName`] if the name is empty or contains a path
/// separator, a `..` sequence, or a NUL byte.
pub fn validate_name(name: &str) -> Result<(), BlobError> {
    let reason = if name.trim().is_empty() {
        "name is empty"
    } else if name.contains(['/', '\\']) {
        "name contains a path separator"
    } else if name.contains("..") {
        "name contains '..'"
    } else if name.contains('\0') {
        "name contains a NUL byte"
    } else {
        return Ok(());
    };
    Err(BlobError::InvalidName {
        name: name.to_owned(),
        reason: reason.to_owned(),
    })
}
