//! SQLite-backed relational sink.
//!
//! A [`Store`] is shared read-only by all import workers; each worker calls
//! [`Store::connect`] for its own connection and therefore its own
//! transactions. WAL journaling plus a busy timeout lets writers to distinct
//! tables overlap while SQLite serializes the actual commits.

mod index;
mod table;

pub use index::{create_indexes, table_columns};
pub use table::{DEFAULT_BATCH_SIZE, create_table, insert_batch};

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;
use tempfile::TempPath;

use crate::errors::StoreError;

/// Connection settings applied to every connection a [`Store`] hands out.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// How long a connection waits on a locked database before failing.
    pub busy_timeout: Duration,
    /// Enable write-ahead logging.
    pub wal: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self { busy_timeout: Duration::from_secs(60), wal: true }
    }
}

/// Handle to the destination database file.
pub struct Store {
    path: PathBuf,
    options: StoreOptions,
    // Deletes the temporary database on drop.
    temp: Option<TempPath>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path)
            .field("options", &self.options)
            .field("is_temp", &self.is_temp())
            .finish()
    }
}

impl Store {
    /// Open a persistent database at `path`, or a temporary one when `None`.
    ///
    /// # Errors
    /// Returns an error if the parent directory or temp file cannot be created,
    /// or the database cannot be opened.
    pub fn open(path: Option<&Path>) -> Result<Self, StoreError> {
        Self::open_with(path, StoreOptions::default())
    }

    /// Like [`Store::open`] with explicit connection settings.
    ///
    /// # Errors
    /// See [`Store::open`].
    pub fn open_with(path: Option<&Path>, options: StoreOptions) -> Result<Self, StoreError> {
        let (path, temp) = match path {
            Some(p) => {
                if let Some(parent) = p.parent()
                    && !parent.as_os_str().is_empty()
                {
                    std::fs::create_dir_all(parent)?;
                }
                (p.to_path_buf(), None)
            }
            None => {
                let temp = tempfile::Builder::new()
                    .prefix("tabulite-")
                    .suffix(".db")
                    .tempfile()
                    .map_err(|e| StoreError::TempDatabase(e.to_string()))?
                    .into_temp_path();
                (temp.to_path_buf(), Some(temp))
            }
        };
        let store = Self { path, options, temp };
        // Fail early on an unusable file and switch the journal mode once.
        store.connect()?;
        log::info!("store: opened path={}, temp={}", store.path.display(), store.is_temp());
        Ok(store)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn is_temp(&self) -> bool {
        self.temp.is_some()
    }

    /// Open a new connection configured with this store's options.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or configured.
    pub fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.options.busy_timeout)?;
        if self.options.wal {
            let mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            log::trace!("store: journal_mode={mode}");
            conn.pragma_update(None, "synchronous", "NORMAL")?;
        }
        Ok(conn)
    }

    /// Number of rows in `table`.
    ///
    /// # Errors
    /// Returns an error if the table does not exist or the query fails.
    pub fn row_count(&self, table: &str) -> Result<u64, StoreError> {
        let conn = self.connect()?;
        let sql = format!("SELECT COUNT(*) FROM {}", crate::sanitize::quote_ident(table));
        let n: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(u64::try_from(n).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_store_is_removed_on_drop() {
        let store = Store::open(None).unwrap();
        assert!(store.is_temp());
        let path = store.path().to_path_buf();
        assert!(path.exists());
        drop(store);
        assert!(!path.exists());
    }

    #[test]
    fn persistent_store_creates_nested_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("nested").join("t.db");
        let store = Store::open(Some(path.as_path())).unwrap();
        assert!(!store.is_temp());
        assert_eq!(store.path(), path.as_path());
        assert!(path.parent().unwrap().is_dir());
        drop(store);
        assert!(path.exists());
    }

    #[test]
    fn connections_use_wal() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(Some(dir.path().join("wal.db").as_path())).unwrap();
        let conn = store.connect().unwrap();
        let mode: String = conn.query_row("PRAGMA journal_mode", [], |r| r.get(0)).unwrap();
        assert_eq!(mode.to_ascii_lowercase(), "wal");
    }
}
