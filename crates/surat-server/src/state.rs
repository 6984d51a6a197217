//! Shared application state for the Surat server.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`. Nothing in it changes after construction.

use std::sync::Arc;

use surat_core::blob::BlobStore;
use surat_core::identity::LocalIdentityProvider;
use surat_core::metadata::DocumentStore;
use surat_core::templates::TemplateService;
use surat_core::users::UserService;
use surat_storage::StorageBackend;

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    /// Template upload, rendering and listing.
    pub templates: TemplateService,
    /// Registration and profiles.
    pub users: UserService,
}

impl AppState {
    /// Build every service on one storage backend.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>, bucket: &str) -> Self {
        let docs = DocumentStore::new(Arc::clone(&storage));
        let blobs = BlobStore::new(Arc::clone(&storage), bucket);
        let identities = Arc::new(LocalIdentityProvider::new(storage));

        Self {
            templates: TemplateService::new(blobs, &docs),
            users: UserService::new(identities, &docs),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
