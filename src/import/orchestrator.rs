use std::thread;
use std::time::Instant;

use parking_lot::Mutex;

use crate::errors::{FileError, ImportError, ImportErrors};
use crate::store::{Store, create_indexes};

use super::events::{EventChannel, EventKind};
use super::options::{FileInput, ImportOptions, ImportResult};
use super::pipeline::FileImporter;

/// Outcome of a multi-file run.
///
/// A run with some successes and some failures carries both. Callers tell
/// "some succeeded" from "none succeeded" by looking at `results`.
#[derive(Debug, Default)]
pub struct ImportRun {
    /// Successful imports in completion order.
    pub results: Vec<ImportResult>,
    /// Every per-file failure, including failed index steps.
    pub error: Option<ImportErrors>,
}

impl ImportRun {
    #[must_use]
    pub fn all_failed(&self) -> bool {
        self.results.is_empty() && self.error.is_some()
    }

    /// Successful results, or the combined error when nothing succeeded.
    ///
    /// # Errors
    /// Returns the combined error when every file failed.
    pub fn into_result(self) -> Result<(Vec<ImportResult>, Option<ImportErrors>), ImportErrors> {
        match (self.results.is_empty(), self.error) {
            (true, Some(err)) => Err(err),
            (_, error) => Ok((self.results, error)),
        }
    }
}

#[derive(Default)]
struct Collected {
    results: Vec<ImportResult>,
    errors: ImportErrors,
}

/// Import every input concurrently, one worker thread per file.
///
/// Each worker opens its own connection to `store`. A failure in one file
/// never stops the others. An empty input list is a no-op.
pub fn import_all(
    store: &Store,
    inputs: &[FileInput],
    opts: &ImportOptions,
    events: &EventChannel,
) -> ImportRun {
    if inputs.is_empty() {
        return ImportRun::default();
    }
    log::info!(target: "tabulite::import", "import: starting {} file(s)", inputs.len());
    let collected = Mutex::new(Collected::default());

    thread::scope(|s| {
        for input in inputs {
            let collected = &collected;
            s.spawn(move || {
                let (result, index_error) = run_worker(store, input, opts, events);
                let mut out = collected.lock();
                match result {
                    Ok(res) => out.results.push(res),
                    Err(error) => out.errors.push(FileError { path: input.path.clone(), error }),
                }
                if let Some(error) = index_error {
                    out.errors.push(FileError { path: input.path.clone(), error });
                }
            });
        }
    });

    let Collected { results, errors } = collected.into_inner();
    log::info!(
        target: "tabulite::import",
        "import: finished ok={}, failed={}",
        results.len(),
        errors.len()
    );
    ImportRun { results, error: (!errors.is_empty()).then_some(errors) }
}

/// Import one file, then build its indexes if the import succeeded.
fn run_worker(
    store: &Store,
    input: &FileInput,
    opts: &ImportOptions,
    events: &EventChannel,
) -> (Result<ImportResult, ImportError>, Option<ImportError>) {
    let mut conn = match store.connect() {
        Ok(conn) => conn,
        Err(e) => {
            let err = ImportError::schema(&input.table, format!("connect failed: {e}"));
            events.emit(&input.path, &input.table, EventKind::WriteError { error: err.to_string() });
            return (Err(err), None);
        }
    };
    let result = FileImporter::new(input, opts, events).run(&mut conn);
    if result.is_err() || input.index_columns.is_empty() {
        return (result, None);
    }

    let file_events = events.scoped(&input.path, &input.table);
    file_events.emit(EventKind::IndexStart { count: input.index_columns.len() });
    let started = Instant::now();
    match create_indexes(&mut conn, &input.table, &input.index_columns) {
        Ok(count) => {
            file_events.emit(EventKind::IndexComplete { count, duration: started.elapsed() });
            (result, None)
        }
        Err(e) => {
            file_events.emit(EventKind::IndexError { error: e.to_string() });
            log::warn!(target: "tabulite::import", "index: failed path={}: {e}", input.path);
            (result, Some(e))
        }
    }
}
