use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::source::{detect_delimiter, is_stdin};

/// Where query results go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

impl OutputTarget {
    /// `None`, empty, or `-` mean standard output.
    #[must_use]
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            Some(p) if !is_stdin(p) => Self::File(PathBuf::from(p)),
            _ => Self::Stdout,
        }
    }

    #[must_use]
    pub fn is_stdout(&self) -> bool {
        matches!(self, Self::Stdout)
    }
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub delimiter: u8,
    pub write_header: bool,
    pub temp_suffix: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { delimiter: b',', write_header: true, temp_suffix: ".tmp".to_string() }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub rows: u64,
    pub columns: usize,
}

/// Output delimiter for `path`, following the same suffix rules as input.
#[must_use]
pub fn detect_output_delimiter(path: &Path) -> u8 {
    detect_delimiter(&path.to_string_lossy())
}
