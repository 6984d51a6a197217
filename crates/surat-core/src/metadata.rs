//! Metadata document store.
//!
//! JSON documents grouped into collections, stored under
//! `docs/<collection>/<id>`. This is the record store for templates and user
//! profiles.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use surat_storage::StorageBackend;

use crate::error::MetadataError;

const PREFIX: &str = "docs/";

/// Entry point to all collections on one backend.
#[derive(Clone)]
pub struct DocumentStore {
    backend: Arc<dyn StorageBackend>,
}

impl DocumentStore {
    #[must_use]
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// A typed handle on collection `name`.
    pub fn collection<T>(&self, name: &str) -> Collection<T> {
        Collection {
            backend: Arc::clone(&self.backend),
            prefix: format!("{PREFIX}{name}/"),
            name: name.to_owned(),
            _marker: PhantomData,
        }
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore").finish_non_exhaustive()
    }
}

/// A collection of JSON documents of type `T`, keyed by id.
pub struct Collection<T> {
    backend: Arc<dyn StorageBackend>,
    prefix: String,
    name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            prefix: self.prefix.clone(),
            name: self.name.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<T: Serialize + DeserializeOwned> Collection<T> {
    fn key(&self, id: &str) -> String {
        format!("{}{id}", self.prefix)
    }

    fn serialization(&self, id: &str, err: &serde_json::Error) -> MetadataError {
        MetadataError::Serialization {
            collection: self.name.clone(),
            id: id.to_owned(),
            reason: err.to_string(),
        }
    }

    /// Read document `id`.
    ///
    /// # Errors
    ///
    /// [`MetadataError::Storage`] if the backend fails,
    /// [`MetadataError::Serialization`] if the stored JSON does not decode.
    pub async fn get(&self, id: &str) -> Result<Option<T>, MetadataError> {
        let Some(data) = self.backend.get(&self.key(id)).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|e| self.serialization(id, &e))
    }

    /// Write document `id`, replacing any previous version.
    ///
    /// # Errors
    ///
    /// [`MetadataError::Serialization`] if `doc` cannot be encoded,
    /// [`MetadataError::Storage`] if the backend fails.
    pub async fn set(&self, id: &str, doc: &T) -> Result<(), MetadataError> {
        let data = serde_json::to_vec(doc).map_err(|e| self.serialization(id, &e))?;
        self.backend.put(&self.key(id), &data).await?;
        Ok(())
    }

    /// Every document in the collection, ordered by id.
    ///
    /// # Errors
    ///
    /// [`MetadataError::Storage`] if the backend fails,
    /// [`MetadataError::Serialization`] if any stored document does not decode.
    pub async fn list(&self) -> Result<Vec<T>, MetadataError> {
        let keys = self.backend.list(&self.prefix).await?;
        let mut docs = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(id) = key.strip_prefix(&self.prefix) else {
                continue;
            };
            // Deleted between list and get.
            if let Some(doc) = self.get(id).await? {
                docs.push(doc);
            }
        }
        Ok(docs)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde::Deserialize;
    use surat_storage::MemoryBackend;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        title: String,
    }

    fn note(title: &str) -> Note {
        Note {
            title: title.to_owned(),
        }
    }

    #[tokio::test]
    async fn set_get_list() {
        let backend = MemoryBackend::new();
        let store = DocumentStore::new(Arc::new(backend.clone()));
        let notes = store.collection::<Note>("notes");
        let others = store.collection::<Note>("notes-archive");

        notes.set("b", &note("second")).await.unwrap();
        notes.set("a", &note("first")).await.unwrap();
        others.set("z", &note("elsewhere")).await.unwrap();

        assert_eq!(notes.get("a").await.unwrap(), Some(note("first")));
        assert_eq!(notes.get("missing").await.unwrap(), None);
        assert_eq!(
            notes.list().await.unwrap(),
            vec![note("first"), note("second")]
        );
        assert!(backend.get("docs/notes/a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn undecodable_document_is_a_serialization_error() {
        let backend = MemoryBackend::new();
        backend.put("docs/notes/bad", b"{not json").await.unwrap();
        let notes = DocumentStore::new(Arc::new(backend)).collection::<Note>("notes");

        let err = notes.get("bad").await.unwrap_err();
        assert!(matches!(
            err,
            MetadataError::Serialization { ref collection, ref id, .. }
                if collection == "notes" && id == "bad"
        ));
    }
}
