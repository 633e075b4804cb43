use std::path::PathBuf;
use std::time::Duration;

use crate::config::AppConfig;
use crate::import::{DEFAULT_PROGRESS_EVERY, FileInput, ImportOptions};
use crate::source::detect_delimiter;
use crate::store::{DEFAULT_BATCH_SIZE, StoreOptions};

use super::util::default_table_name;

/// One invocation: what to import, which queries to run, where results go.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub inputs: Vec<String>,
    pub tables: Vec<String>,
    pub queries: Vec<String>,
    /// Empty means every query writes to stdout.
    pub outputs: Vec<String>,
    /// `None` uses a temporary database removed at the end of the run.
    pub db_path: Option<PathBuf>,
    /// `None` detects from each file suffix.
    pub delimiter: Option<u8>,
    pub has_header: bool,
    pub index_columns: Vec<String>,
    pub show_progress: bool,
    pub batch_size: usize,
    pub progress_every: usize,
    pub busy_timeout: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            tables: Vec::new(),
            queries: Vec::new(),
            outputs: Vec::new(),
            db_path: None,
            delimiter: None,
            has_header: true,
            index_columns: Vec::new(),
            show_progress: false,
            batch_size: DEFAULT_BATCH_SIZE,
            progress_every: DEFAULT_PROGRESS_EVERY,
            busy_timeout: StoreOptions::default().busy_timeout,
        }
    }
}

impl RunConfig {
    /// Defaults overlaid with file/env settings. CLI flags are applied after.
    #[must_use]
    pub fn from_app_config(app: &AppConfig) -> Self {
        let mut cfg = Self::default();
        cfg.db_path.clone_from(&app.db_path);
        if let Some(h) = app.has_header { cfg.has_header = h; }
        if let Some(n) = app.batch_size { cfg.batch_size = n; }
        if let Some(n) = app.progress_every { cfg.progress_every = n; }
        if let Some(ms) = app.busy_timeout_ms { cfg.busy_timeout = Duration::from_millis(ms); }
        if let Some(d) = app.delimiter.as_deref()
            && let Ok(parsed) = crate::config::parse_delimiter(d)
        {
            cfg.delimiter = parsed;
        }
        cfg
    }

    /// Read standard input when queries are given without inputs.
    pub fn default_stdin_input(&mut self) {
        if self.inputs.is_empty() && !self.queries.is_empty() {
            self.inputs.push("-".to_string());
        }
    }

    /// # Errors
    /// Returns a message when there is nothing to do or outputs do not pair with queries.
    pub fn validate(&self) -> Result<(), String> {
        if self.inputs.is_empty() && self.queries.is_empty() {
            return Err("must specify at least one input file or a query".to_string());
        }
        if !self.outputs.is_empty() && self.outputs.len() != self.queries.len() {
            return Err(format!(
                "number of output files ({}) must match number of queries ({})",
                self.outputs.len(),
                self.queries.len()
            ));
        }
        Ok(())
    }

    /// One [`FileInput`] per input, with default table names where none were given.
    #[must_use]
    pub fn file_inputs(&self) -> Vec<FileInput> {
        self.inputs
            .iter()
            .enumerate()
            .map(|(i, path)| {
                let table = self.tables.get(i).cloned().unwrap_or_else(|| default_table_name(i));
                FileInput::new(path.clone(), table)
                    .with_delimiter(self.delimiter.unwrap_or_else(|| detect_delimiter(path)))
                    .with_header(self.has_header)
                    .with_index_columns(self.index_columns.clone())
            })
            .collect()
    }

    #[must_use]
    pub fn import_options(&self) -> ImportOptions {
        let progress_every = (self.progress_every > 0).then_some(self.progress_every);
        ImportOptions { batch_size: self.batch_size, progress_every }
    }

    #[must_use]
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions { busy_timeout: self.busy_timeout, ..StoreOptions::default() }
    }

    /// Output for query `i`; `None` means stdout.
    #[must_use]
    pub fn output_for(&self, i: usize) -> Option<&str> {
        self.outputs.get(i).map(String::as_str).filter(|o| !crate::source::is_stdin(o))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_to_do_is_rejected() {
        assert!(RunConfig::default().validate().is_err());
    }

    #[test]
    fn outputs_must_pair_with_queries() {
        let cfg = RunConfig {
            queries: vec!["SELECT 1".into(), "SELECT 2".into()],
            outputs: vec!["a.csv".into()],
            ..RunConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.contains("(1)") && err.contains("(2)"));
    }

    #[test]
    fn queries_alone_read_stdin() {
        let mut cfg = RunConfig { queries: vec!["SELECT 1".into()], ..RunConfig::default() };
        cfg.default_stdin_input();
        assert_eq!(cfg.inputs, vec!["-"]);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn inputs_get_default_tables_and_detected_delimiters() {
        let cfg = RunConfig {
            inputs: vec!["a.csv".into(), "b.tsv.gz".into(), "c.csv".into()],
            tables: vec!["users".into()],
            index_columns: vec!["id".into()],
            ..RunConfig::default()
        };
        let inputs = cfg.file_inputs();
        let tables: Vec<&str> = inputs.iter().map(|i| i.table.as_str()).collect();
        assert_eq!(tables, vec!["users", "data2", "data3"]);
        assert_eq!(inputs[1].delimiter, b'\t');
        assert_eq!(inputs[2].index_columns, vec!["id"]);
    }

    #[test]
    fn app_config_overlays_defaults() {
        let app = AppConfig {
            batch_size: Some(50),
            delimiter: Some("tab".into()),
            has_header: Some(false),
            ..AppConfig::default()
        };
        let cfg = RunConfig::from_app_config(&app);
        assert_eq!(cfg.batch_size, 50);
        assert_eq!(cfg.delimiter, Some(b'\t'));
        assert!(!cfg.has_header);
    }
}
