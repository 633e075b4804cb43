use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::Serialize;

use crate::export::{detect_output_delimiter, execute_query};
use crate::import::{EventChannel, ImportResult, import_all};
use crate::store::Store;

use super::command::RunConfig;
use super::render::EventRenderer;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputMode {
    Human,
    Plain,
    Json,
}

/// One executed query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryOutcome {
    /// 1-based position on the command line.
    pub query: usize,
    /// `None` for stdout.
    pub output: Option<String>,
    pub rows: u64,
}

/// What a run did.
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub db_path: PathBuf,
    pub temporary: bool,
    pub imports: Vec<ImportResult>,
    /// `path: reason` for each failed import or index step.
    pub failures: Vec<String>,
    pub queries: Vec<QueryOutcome>,
}

/// Run with human status lines and progress rendered to stderr.
///
/// # Errors
/// See [`run_with_format`].
pub fn run(cfg: &RunConfig) -> Result<RunSummary, Box<dyn std::error::Error>> {
    let events = EventChannel::new(EventRenderer::stderr(OutputMode::Human, cfg.show_progress));
    run_with_format(cfg, OutputMode::Human, &events)
}

/// Import every input, then run every query.
///
/// Import failures are reported and the run continues unless every import
/// failed. Queries run one after another when any of them writes to stdout,
/// otherwise concurrently with one connection each.
///
/// # Errors
/// Returns an error for invalid configuration, a store that cannot be
/// opened, a run where all imports failed, or any failed query.
pub fn run_with_format(
    cfg: &RunConfig,
    mode: OutputMode,
    events: &EventChannel,
) -> Result<RunSummary, Box<dyn std::error::Error>> {
    cfg.validate()?;
    let store = Store::open_with(cfg.db_path.as_deref(), cfg.store_options())?;
    if store.is_temp() {
        status(mode, &format!("Using temporary database: {}", store.path().display()));
    } else {
        status(mode, &format!("Opening database: {}", store.path().display()));
    }
    let mut summary = RunSummary {
        db_path: store.path().to_path_buf(),
        temporary: store.is_temp(),
        ..RunSummary::default()
    };

    if !cfg.inputs.is_empty() {
        let inputs = cfg.file_inputs();
        let run = import_all(&store, &inputs, &cfg.import_options(), events);
        let all_failed = run.all_failed();
        if let Some(err) = &run.error {
            summary.failures = err.iter().map(ToString::to_string).collect();
            if !all_failed {
                warn(mode, &format!("Warning: some imports failed:\n{err}"));
            }
        }
        if let (true, Some(err)) = (all_failed, run.error) {
            return Err(format!("all imports failed: {err}").into());
        }
        for res in &run.results {
            status(mode, &format!("✓ Successfully imported table '{}'", res.table_name));
        }
        summary.imports = run.results;
    }

    if !cfg.queries.is_empty() {
        summary.queries = run_queries(&store, cfg, mode)?;
    }
    Ok(summary)
}

fn run_queries(
    store: &Store,
    cfg: &RunConfig,
    mode: OutputMode,
) -> Result<Vec<QueryOutcome>, Box<dyn std::error::Error>> {
    let total = cfg.queries.len();
    let any_stdout = (0..total).any(|i| cfg.output_for(i).is_none());
    let delimiter_for = |output: Option<&str>| {
        cfg.delimiter.unwrap_or_else(|| output.map_or(b',', |o| detect_output_delimiter(Path::new(o))))
    };

    if any_stdout || total == 1 {
        let conn = store.connect()?;
        let mut outcomes = Vec::with_capacity(total);
        for (i, sql) in cfg.queries.iter().enumerate() {
            let output = cfg.output_for(i);
            status(mode, &query_banner(i, total));
            let rows = execute_query(&conn, sql, output.map(Path::new), delimiter_for(output))
                .map_err(|e| format!("failed to execute query {}: {e}", i + 1))?;
            status(mode, &format!("  Exported {rows} rows"));
            if let Some(o) = output {
                status(mode, &format!("✓ Query {} results exported to {o}", i + 1));
            }
            outcomes.push(QueryOutcome { query: i + 1, output: output.map(str::to_string), rows });
        }
        return Ok(outcomes);
    }

    let outcomes = Mutex::new(Vec::with_capacity(total));
    let errors = Mutex::new(Vec::new());
    std::thread::scope(|s| {
        for (i, sql) in cfg.queries.iter().enumerate() {
            let (outcomes, errors) = (&outcomes, &errors);
            s.spawn(move || {
                let output = cfg.output_for(i);
                status(mode, &query_banner(i, total));
                let result = store.connect().map_err(|e| e.to_string()).and_then(|conn| {
                    execute_query(&conn, sql, output.map(Path::new), delimiter_for(output))
                        .map_err(|e| e.to_string())
                });
                match result {
                    Ok(rows) => {
                        if let Some(o) = output {
                            status(mode, &format!("✓ Query {} results exported to {o}", i + 1));
                        }
                        outcomes.lock().push(QueryOutcome {
                            query: i + 1,
                            output: output.map(str::to_string),
                            rows,
                        });
                    }
                    Err(e) => errors.lock().push(format!("query {}: {e}", i + 1)),
                }
            });
        }
    });
    let errors = errors.into_inner();
    if !errors.is_empty() {
        return Err(format!("query execution errors: {}", errors.join("; ")).into());
    }
    let mut outcomes = outcomes.into_inner();
    outcomes.sort_by_key(|o| o.query);
    Ok(outcomes)
}

fn query_banner(i: usize, total: usize) -> String {
    if total > 1 { format!("Executing query {}/{total}...", i + 1) } else { "Executing query...".to_string() }
}

fn status(mode: OutputMode, msg: &str) {
    log::info!("{msg}");
    if mode == OutputMode::Human {
        eprintln!("{msg}");
    }
}

fn warn(mode: OutputMode, msg: &str) {
    log::warn!("{msg}");
    if mode != OutputMode::Json {
        eprintln!("{msg}");
    }
}
