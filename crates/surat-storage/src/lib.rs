//! Storage backend abstraction for Surat.
//!
//! [`StorageBackend`] is a flat, ordered key-value store with no knowledge
//! of templates or users. `surat-core` splits the key space by prefix:
//! template files live under `blobs/`, JSON records under `docs/` and login
//! identities under `auth/`.
//!
//! [`RedbBackend`] persists to a single file (feature `redb-backend`).
//! [`MemoryBackend`] keeps everything in process and backs the test suite.

mod error;
mod memory;
#[cfg(feature = "redb-backend")]
mod redb_backend;

pub use error::StorageError;
pub use memory::MemoryBackend;
#[cfg(feature = "redb-backend")]
pub use redb_backend::RedbBackend;

/// Byte-valued key store shared by every Surat service.
///
/// Keys are `/`-separated paths such as `blobs/surat-templates/letter.docx`
/// or `docs/templates/<uuid>`. Backends treat values as opaque and never
/// interpret the key beyond ordering it.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// The value under `key`, or `None` when nothing was stored there.
    ///
    /// # Errors
    ///
    /// [`StorageError::Read`] when the backend cannot be read.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store `value` under `key`, replacing whatever was there.
    ///
    /// # Errors
    ///
    /// [`StorageError::Write`] when the value was not persisted.
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// [`StorageError::Delete`] when the backend rejects the removal.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Every stored key beginning with `prefix`, sorted ascending.
    ///
    /// # Errors
    ///
    /// [`StorageError::List`] when the scan fails.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Whether anything is stored under `key`.
    ///
    /// # Errors
    ///
    /// Same as [`get`](StorageBackend::get), which this falls back to.
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        self.get(key).await.map(|value| value.is_some())
    }
}
