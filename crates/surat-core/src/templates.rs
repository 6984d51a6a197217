//! Template service.
//!
//! Ties the package pipeline to the blob and metadata stores:
//!
//! - **upload**: validate, reject duplicates, open and scan the bytes, store
//!   the blob, verify the stored copy, then write the record;
//! - **render**: load the record, fetch and verify the blob, filter the
//!   caller's fields to the placeholder namespace, render;
//! - **list** / **get**: read records back.
//!
//! The record is always written last, so a failed upload never leaves a
//! record pointing at a missing blob.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::Mapping;
use crate::blob::{BlobStore, validate_name};
use crate::error::{ArchiveError, BlobError, TemplateError};
use crate::metadata::{Collection, DocumentStore};
use crate::package::Package;
use crate::{namespace, renderer, scanner};

/// Metadata collection holding template records.
pub const TEMPLATES_COLLECTION: &str = "templates";

/// A stored template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    /// Original filename; also the blob name.
    pub name: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    /// Placeholder tags found at upload.
    pub tags: BTreeSet<String>,
    /// Hex SHA-256 of the stored bytes.
    pub sha256: String,
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Upload, render and listing of templates.
#[derive(Debug)]
pub struct TemplateService {
    blobs: BlobStore,
    records: Collection<Template>,
    upload_lock: Mutex<()>,
}

impl TemplateService {
    #[must_use]
    pub fn new(blobs: BlobStore, docs: &DocumentStore) -> Self {
        Self {
            blobs,
            records: docs.collection(TEMPLATES_COLLECTION),
            upload_lock: Mutex::new(()),
        }
    }

    /// Store a new template and record its placeholder tags.
    ///
    /// # Errors
    ///
    /// - [`TemplateError::InputMissing`] for an empty filename or file
    /// - [`TemplateError::InvalidName`] if the filename cannot be stored
    /// - [`TemplateError::Conflict`] if a template with this filename exists
    /// - [`TemplateError::CorruptArchive`] if the bytes are not a DOCX package
    /// - [`TemplateError::StorageWrite`] if the blob cannot be written or
    ///   read back intact
    /// - [`TemplateError::MetadataWrite`] if the record cannot be written
    pub async fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<Template, TemplateError> {
        if filename.trim().is_empty() {
            return Err(TemplateError::InputMissing {
                what: "template file name",
            });
        }
        if bytes.is_empty() {
            return Err(TemplateError::InputMissing {
                what: "template file",
            });
        }
        validate_name(filename).map_err(|e| invalid_name(filename, e))?;

        let storage_write = |reason: String| TemplateError::StorageWrite {
            name: filename.to_owned(),
            reason,
        };

        let _guard = self.upload_lock.lock().await;
        if self
            .blobs
            .exists(filename)
            .await
            .map_err(|e| storage_write(e.to_string()))?
        {
            return Err(TemplateError::Conflict {
                name: filename.to_owned(),
            });
        }

        let (tags, bytes) = tokio::task::spawn_blocking(move || {
            let package = Package::open(&bytes)?;
            Ok::<_, ArchiveError>((scanner::scan(&package), bytes))
        })
        .await
        .map_err(|e| storage_write(format!("scan task failed: {e}")))??;
        let digest = sha256_hex(&bytes);

        self.blobs
            .put(filename, &bytes)
            .await
            .map_err(|e| storage_write(e.to_string()))?;

        // The tags were scanned from `bytes`; equal digests mean they describe
        // the stored copy.
        let verified = match self.blobs.get(filename).await {
            Ok(Some(stored)) if sha256_hex(&stored) == digest => Ok(()),
            Ok(Some(_)) => Err(storage_write("stored copy does not match upload".to_owned())),
            Ok(None) => Err(storage_write("stored copy is missing".to_owned())),
            Err(e) => Err(storage_write(e.to_string())),
        };
        if let Err(err) = verified {
            self.discard_blob(filename).await;
            return Err(err);
        }

        let template = Template {
            id: uuid::Uuid::new_v4().to_string(),
            name: filename.to_owned(),
            url: self.blobs.location(filename),
            created_at: Utc::now(),
            tags,
            sha256: digest,
        };
        if let Err(e) = self.records.set(&template.id, &template).await {
            self.discard_blob(filename).await;
            return Err(TemplateError::MetadataWrite {
                id: template.id,
                reason: e.to_string(),
            });
        }

        tracing::info!(
            id = %template.id,
            name = %template.name,
            tags = template.tags.len(),
            "template uploaded"
        );
        Ok(template)
    }

    /// Render template `template_id` with the caller's `fields`.
    ///
    /// Only fields in the placeholder namespace reach the renderer; anything
    /// else (including `templateId` itself) is dropped.
    ///
    /// # Errors
    ///
    /// - [`TemplateError::InputMissing`] for an empty id
    /// - [`TemplateError::NotFound`] if no record exists; the blob store is
    ///   not touched
    /// - [`TemplateError::MetadataRead`] if the record cannot be read
    /// - [`TemplateError::Processing`] if the stored template cannot be
    ///   fetched, verified, opened or written back out
    /// - [`TemplateError::Render`] if the template has syntax errors
    pub async fn render(&self, template_id: &str, fields: &Mapping) -> Result<Vec<u8>, TemplateError> {
        let id = template_id.trim();
        if id.is_empty() {
            return Err(TemplateError::InputMissing { what: "templateId" });
        }

        let template = self.get(id).await?;
        let processing = |reason: String| TemplateError::Processing {
            id: id.to_owned(),
            reason,
        };

        let bytes = self
            .blobs
            .get(&template.name)
            .await
            .map_err(|e| processing(e.to_string()))?
            .ok_or_else(|| processing(format!("stored file '{}' is missing", template.name)))?;
        if sha256_hex(&bytes) != template.sha256 {
            return Err(processing(format!(
                "stored file '{}' does not match its recorded digest",
                template.name
            )));
        }

        let data = namespace::filter(fields);
        let dropped = fields.len() - data.len();
        let task_id = id.to_owned();
        let output = tokio::task::spawn_blocking(move || render_bytes(&task_id, &bytes, &data))
            .await
            .map_err(|e| processing(format!("render task failed: {e}")))??;

        tracing::debug!(id, dropped, bytes = output.len(), "template rendered");
        Ok(output)
    }

    /// Best-effort removal of a blob whose upload did not complete, so the
    /// name is not left blocked.
    async fn discard_blob(&self, name: &str) {
        if let Err(e) = self.blobs.delete(name).await {
            tracing::warn!(name, error = %e, "failed to remove incomplete upload");
        }
    }

    /// Every stored template record, ordered by id.
    ///
    /// # Errors
    ///
    /// [`TemplateError::MetadataRead`] if the records cannot be read.
    pub async fn list(&self) -> Result<Vec<Template>, TemplateError> {
        self.records
            .list()
            .await
            .map_err(|e| TemplateError::MetadataRead {
                reason: e.to_string(),
            })
    }

    /// The record for template `id`.
    ///
    /// # Errors
    ///
    /// [`TemplateError::NotFound`] if there is none, and
    /// [`TemplateError::MetadataRead`] if it cannot be read.
    pub async fn get(&self, id: &str) -> Result<Template, TemplateError> {
        self.records
            .get(id)
            .await
            .map_err(|e| TemplateError::MetadataRead {
                reason: e.to_string(),
            })?
            .ok_or_else(|| TemplateError::NotFound { id: id.to_owned() })
    }
}

/// Open, render and re-serialize one template. Runs on the blocking pool.
fn render_bytes(id: &str, bytes: &[u8], data: &Mapping) -> Result<Vec<u8>, TemplateError> {
    let processing = |e: ArchiveError| TemplateError::Processing {
        id: id.to_owned(),
        reason: e.to_string(),
    };
    let package = Package::open(bytes).map_err(processing)?;
    let rendered = renderer::render(&package, data)?;
    rendered.to_bytes().map_err(processing)
}

fn invalid_name(filename: &str, err: BlobError) -> TemplateError {
    match err {
        BlobError::InvalidName { reason, .. } => TemplateError::InvalidName {
            name: filename.to_owned(),
            reason,
        },
        BlobError::Storage(e) => TemplateError::StorageWrite {
            name: filename.to_owned(),
            reason: e.to_string(),
        },
    }
}
