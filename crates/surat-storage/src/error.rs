//! Failures surfaced by storage backends.

/// A backend could not complete a call.
///
/// Each variant carries the key (or prefix) it was working on and the
/// backend's own description of what went wrong.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("cannot open database {path}: {reason}")]
    Open { path: String, reason: String },

    #[error("get {key}: {reason}")]
    Read { key: String, reason: String },

    #[error("put {key}: {reason}")]
    Write { key: String, reason: String },

    #[error("delete {key}: {reason}")]
    Delete { key: String, reason: String },

    #[error("list {prefix}*: {reason}")]
    List { prefix: String, reason: String },

    /// The key table could not be opened inside a transaction.
    #[error("table {name} unavailable")]
    MissingTable { name: String },

    #[error("redb transaction: {reason}")]
    Transaction { reason: String },
}
