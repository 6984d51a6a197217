//! Error types for `surat-core`.
//!
//! Each subsystem has its own enum. The two service-level enums,
//! [`TemplateError`] and [`UserError`], are what the HTTP layer maps to
//! status codes; every variant there corresponds to exactly one caller-visible
//! outcome.

use surat_storage::StorageError;

/// Errors from reading or writing a DOCX package.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// The bytes are not a readable ZIP container.
    #[error("corrupt archive: {reason}")]
    Corrupt { reason: String },

    /// A part every WordprocessingML package must carry is absent.
    #[error("archive is missing required part '{part}'")]
    MissingPart { part: String },

    /// A templated XML part could not be parsed.
    #[error("malformed XML in '{part}': {reason}")]
    MalformedXml { part: String, reason: String },

    /// Re-serializing the container failed.
    #[error("failed to write archive: {reason}")]
    Write { reason: String },
}

/// Template syntax errors found while compiling a paragraph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxError {
    /// A `{` with no matching `}` in the same paragraph.
    #[error("unclosed tag starting at '{fragment}'")]
    UnclosedTag { fragment: String },

    /// A `}` with no preceding `{`.
    #[error("closing brace without opening tag near '{fragment}'")]
    UnopenedTag { fragment: String },

    /// `{}` or a section marker with no name.
    #[error("tag has no name")]
    EmptyTag,

    /// A section was opened but never closed.
    #[error("section '{name}' is never closed")]
    UnclosedSection { name: String },

    /// A section close with no open section.
    #[error("section '{name}' is closed but was never opened")]
    UnopenedSection { name: String },

    /// Sections closed out of order.
    #[error("section '{found}' closed while '{expected}' is still open")]
    MismatchedSection { expected: String, found: String },

    /// One block both closes a section and opens another, so neither can
    /// be repeated on its own.
    #[error("section '{opened}' opens in the block that closes '{closed}'")]
    OverlappingSections { closed: String, opened: String },
}

/// Errors from rendering a package.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The template in `part` is syntactically broken.
    #[error("template error in '{part}': {source}")]
    Syntax {
        part: String,
        #[source]
        source: SyntaxError,
    },

    /// Writing the rendered XML for `part` failed.
    #[error("failed to serialize rendered part '{part}': {reason}")]
    Serialize { part: String, reason: String },
}

/// Errors from the blob (object) store.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// The object name is unusable as a storage key.
    #[error("invalid object name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// The storage backend failed.
    #[error("blob storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors from the metadata document store.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// The storage backend failed.
    #[error("metadata storage error: {0}")]
    Storage(#[from] StorageError),

    /// A document could not be encoded or decoded.
    #[error("document '{collection}/{id}' could not be (de)serialized: {reason}")]
    Serialization {
        collection: String,
        id: String,
        reason: String,
    },
}

/// Errors from the identity provider.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The email address is not plausibly valid.
    #[error("invalid email address '{email}'")]
    InvalidEmail { email: String },

    /// The password does not meet the minimum length.
    #[error("password must be at least {min_length} characters")]
    WeakPassword { min_length: usize },

    /// An identity already exists for this email.
    #[error("an account already exists for '{email}'")]
    EmailExists { email: String },

    /// Password hashing failed.
    #[error("password hashing failed: {reason}")]
    Hash { reason: String },

    /// An identity record could not be encoded or decoded.
    #[error("identity record (de)serialization failed: {reason}")]
    Serialization { reason: String },

    /// The storage backend failed.
    #[error("identity storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors from the template upload / render / list operations.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// A required input (file, filename, template id) was not supplied.
    #[error("{what} is required")]
    InputMissing { what: &'static str },

    /// The uploaded filename cannot be stored.
    #[error("invalid template name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// A template with this filename already exists.
    #[error("a template named '{name}' already exists")]
    Conflict { name: String },

    /// No template record exists for this id.
    #[error("template '{id}' not found")]
    NotFound { id: String },

    /// The template bytes are not a readable DOCX package.
    #[error(transparent)]
    CorruptArchive(#[from] ArchiveError),

    /// The template could not be rendered.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Writing (or verifying) the template bytes in the blob store failed.
    #[error("failed to store template '{name}': {reason}")]
    StorageWrite { name: String, reason: String },

    /// Writing the template record failed after the blob was stored.
    #[error("failed to save template record '{id}': {reason}")]
    MetadataWrite { id: String, reason: String },

    /// Reading template records failed.
    #[error("failed to read template records: {reason}")]
    MetadataRead { reason: String },

    /// The stored template could not be located, fetched, or verified.
    #[error("failed to process template '{id}': {reason}")]
    Processing { id: String, reason: String },
}

/// Errors from user registration and profile lookup.
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    /// A required field was not supplied.
    #[error("{what} is required")]
    InputMissing { what: &'static str },

    /// A supplied field was rejected.
    #[error("{reason}")]
    Invalid { reason: String },

    /// The email address is already registered.
    #[error("an account already exists for '{email}'")]
    Conflict { email: String },

    /// No profile exists for this user id.
    #[error("user '{uid}' not found")]
    NotFound { uid: String },

    /// The identity provider or metadata store failed.
    #[error("user store failure: {reason}")]
    Upstream { reason: String },
}

impl From<IdentityError> for UserError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidEmail { .. } | IdentityError::WeakPassword { .. } => {
                Self::Invalid {
                    reason: err.to_string(),
                }
            }
            IdentityError::EmailExists { email } => Self::Conflict { email },
            IdentityError::Hash { .. }
            | IdentityError::Serialization { .. }
            | IdentityError::Storage(_) => Self::Upstream {
                reason: err.to_string(),
            },
        }
    }
}

impl From<MetadataError> for UserError {
    fn from(err: MetadataError) -> Self {
        Self::Upstream {
            reason: err.to_string(),
        }
    }
}
