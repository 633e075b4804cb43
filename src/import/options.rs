use serde::Serialize;

use crate::source::detect_delimiter;
use crate::store::DEFAULT_BATCH_SIZE;

/// Rows between `parse_progress` events.
pub const DEFAULT_PROGRESS_EVERY: usize = 1_000;

/// One file to import and where it goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInput {
    pub path: String,
    pub table: String,
    pub delimiter: u8,
    pub has_header: bool,
    pub index_columns: Vec<String>,
}

impl FileInput {
    /// Input with a header row and a delimiter detected from the file suffix.
    pub fn new(path: impl Into<String>, table: impl Into<String>) -> Self {
        let path = path.into();
        let delimiter = detect_delimiter(&path);
        Self { path, table: table.into(), delimiter, has_header: true, index_columns: Vec::new() }
    }

    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    #[must_use]
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    #[must_use]
    pub fn with_index_columns(mut self, columns: Vec<String>) -> Self {
        self.index_columns = columns;
        self
    }
}

/// Streaming knobs shared by every file in a run.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Rows buffered before a transactional flush.
    pub batch_size: usize,
    /// Rows between parse progress events; `None` disables them.
    pub progress_every: Option<usize>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self { batch_size: DEFAULT_BATCH_SIZE, progress_every: Some(DEFAULT_PROGRESS_EVERY) }
    }
}

impl ImportOptions {
    pub(crate) fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }
}

/// A completed file import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    pub path: String,
    pub table_name: String,
    pub row_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_defaults_follow_suffix() {
        let tsv = FileInput::new("people.tsv.gz", "people");
        assert_eq!(tsv.delimiter, b'\t');
        assert!(tsv.has_header);
        assert!(tsv.index_columns.is_empty());
        let csv = FileInput::new("x.csv", "x").with_header(false).with_delimiter(b';');
        assert_eq!(csv.delimiter, b';');
        assert!(!csv.has_header);
    }

    #[test]
    fn zero_batch_size_is_clamped() {
        let opts = ImportOptions { batch_size: 0, ..Default::default() };
        assert_eq!(opts.effective_batch_size(), 1);
        assert_eq!(ImportOptions::default().effective_batch_size(), 10_000);
    }
}
