//! File-backed storage on redb.
//!
//! Selected with `SURAT_STORAGE=redb`; compiled only with the `redb-backend`
//! feature. Each call is its own redb transaction run on Tokio's blocking
//! pool, so a returned `put` has been committed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use redb::{Database, ReadOnlyTable, ReadableTable, Table, TableDefinition};

use crate::{StorageBackend, StorageError};

type Key = &'static str;
type Bytes = &'static [u8];

const ENTRIES_NAME: &str = "entries";

/// Every entry lives in this one table. Prefixes in the key do the namespacing.
const ENTRIES: TableDefinition<Key, Bytes> = TableDefinition::new(ENTRIES_NAME);

/// Storage in a single redb database file.
///
/// ```no_run
/// # use surat_storage::RedbBackend;
/// let store = RedbBackend::open("/var/lib/surat/surat.redb").unwrap();
/// ```
#[derive(Clone)]
pub struct RedbBackend {
    db: Arc<Database>,
    path: PathBuf,
}

impl std::fmt::Debug for RedbBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbBackend")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

fn table_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::MissingTable {
        name: format!("{ENTRIES_NAME}: {e}"),
    }
}

fn txn_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Transaction {
        reason: e.to_string(),
    }
}

impl RedbBackend {
    /// Open the database at `path`, creating the file, its parent
    /// directories and the entry table when missing.
    ///
    /// # Errors
    ///
    /// [`StorageError::Open`] when the file cannot be created or is not a
    /// redb database. [`StorageError::MissingTable`] or
    /// [`StorageError::Transaction`] when the table cannot be set up.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let cannot_open = |reason: String| StorageError::Open {
            path: path.display().to_string(),
            reason,
        };

        match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => {
                std::fs::create_dir_all(dir).map_err(|e| cannot_open(e.to_string()))?;
            }
            _ => {}
        }
        let db = Database::create(&path).map_err(|e| cannot_open(e.to_string()))?;

        let setup = db.begin_write().map_err(txn_error)?;
        drop(setup.open_table(ENTRIES).map_err(table_error)?);
        setup.commit().map_err(txn_error)?;

        tracing::debug!(path = %path.display(), "redb storage opened");
        Ok(Self {
            db: Arc::new(db),
            path,
        })
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, StorageError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(txn_error)?
    }

    /// Run `op` against the entry table in a read transaction.
    async fn read<T, F>(&self, op: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&ReadOnlyTable<Key, Bytes>) -> Result<T, StorageError> + Send + 'static,
    {
        self.blocking(move |db| {
            let txn = db.begin_read().map_err(txn_error)?;
            let table = txn.open_table(ENTRIES).map_err(table_error)?;
            op(&table)
        })
        .await
    }

    /// Run `op` against the entry table in a write transaction and commit.
    async fn write<F>(&self, op: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut Table<'_, Key, Bytes>) -> Result<(), StorageError> + Send + 'static,
    {
        self.blocking(move |db| {
            let txn = db.begin_write().map_err(txn_error)?;
            {
                let mut table = txn.open_table(ENTRIES).map_err(table_error)?;
                op(&mut table)?;
            }
            txn.commit().map_err(txn_error)
        })
        .await
    }
}

#[async_trait::async_trait]
impl StorageBackend for RedbBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let key = key.to_owned();
        self.read(move |table| match table.get(key.as_str()) {
            Ok(found) => Ok(found.map(|guard| guard.value().to_vec())),
            Err(e) => Err(StorageError::Read {
                key,
                reason: e.to_string(),
            }),
        })
        .await
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let key = key.to_owned();
        let value = value.to_owned();
        self.write(move |table| {
            if let Err(e) = table.insert(key.as_str(), value.as_slice()) {
                return Err(StorageError::Write {
                    key,
                    reason: e.to_string(),
                });
            }
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let key = key.to_owned();
        self.write(move |table| {
            if let Err(e) = table.remove(key.as_str()) {
                return Err(StorageError::Delete {
                    key,
                    reason: e.to_string(),
                });
            }
            Ok(())
        })
        .await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let prefix = prefix.to_owned();
        self.read(move |table| {
            let failed = |e: redb::StorageError| StorageError::List {
                prefix: prefix.clone(),
                reason: e.to_string(),
            };
            let mut keys = Vec::new();
            for entry in table.range(prefix.as_str()..).map_err(failed)? {
                let (key, _) = entry.map_err(failed)?;
                let key = key.value();
                if !key.starts_with(prefix.as_str()) {
                    break;
                }
                keys.push(key.to_owned());
            }
            Ok(keys)
        })
        .await
    }
}
