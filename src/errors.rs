use std::fmt;
use std::io;
use thiserror::Error;

/// Failures opening or configuring the relational store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to create temporary database: {0}")]
    TempDatabase(String),
}

/// Terminal failure of one file import (or of its index step).
#[derive(Debug, Error)]
pub enum ImportError {
    /// Missing, unreadable, or corrupt-compressed source.
    #[error("failed to open {path}: {source}")]
    StreamOpen {
        path: String,
        #[source]
        source: io::Error,
    },

    /// A record could not be tokenized mid-file.
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    /// Table drop/create failed.
    #[error("failed to create table '{table}': {reason}")]
    Schema { table: String, reason: String },

    /// Batch insert or its transaction failed; the batch was rolled back.
    #[error("failed to insert batch into '{table}': {reason}")]
    Write { table: String, reason: String },

    /// Requested index columns are absent from the table's catalog schema.
    #[error("column(s) not found in table '{table}': {}", .columns.join(", "))]
    ColumnNotFound { table: String, columns: Vec<String> },
}

impl ImportError {
    pub(crate) fn schema(table: &str, err: impl fmt::Display) -> Self {
        Self::Schema { table: table.to_string(), reason: err.to_string() }
    }

    pub(crate) fn write(table: &str, err: impl fmt::Display) -> Self {
        Self::Write { table: table.to_string(), reason: err.to_string() }
    }

    /// True for failures raised while reading the source rather than writing the sink.
    #[must_use]
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, Self::StreamOpen { .. } | Self::MalformedRecord { .. })
    }
}

/// One failed file with its path context.
#[derive(Debug, Error)]
#[error("{path}: {error}")]
pub struct FileError {
    pub path: String,
    #[source]
    pub error: ImportError,
}

/// Combined error for a run: one entry per failed file, in completion order.
#[derive(Debug, Default)]
pub struct ImportErrors {
    errors: Vec<FileError>,
}

impl ImportErrors {
    pub(crate) fn push(&mut self, err: FileError) {
        self.errors.push(err);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileError> {
        self.errors.iter()
    }

    /// Paths of every failed file.
    #[must_use]
    pub fn paths(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.path.as_str()).collect()
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<FileError> {
        self.errors
    }
}

impl fmt::Display for ImportErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ImportErrors {}

/// Failures running a query or writing its result rows.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to execute query: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),

    #[error("failed to write row: {0}")]
    Csv(#[from] csv::Error),

    #[error("unsupported output compression: {0}")]
    UnsupportedCompression(String),
}
