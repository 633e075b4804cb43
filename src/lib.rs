//! Streaming CSV/TSV import into SQLite, with ad hoc queries and re-export.
//!
//! The import core reads each file once, writes it in bounded transactional
//! batches, and runs one worker per file. Progress is reported as structured
//! [`import::ProgressEvent`]s; formatting them is left to the caller.
//!
//! ```no_run
//! use tabulite::import::{EventChannel, FileInput, ImportOptions, import_all};
//! use tabulite::store::Store;
//!
//! let store = Store::open(None)?;
//! let inputs = vec![FileInput::new("users.csv", "users"), FileInput::new("orders.tsv.gz", "orders")];
//! let run = import_all(&store, &inputs, &ImportOptions::default(), &EventChannel::silent());
//! for res in &run.results {
//!     println!("{} -> {} ({} rows)", res.path, res.table_name, res.row_count);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod export;
pub mod import;
pub mod logger;
pub mod sanitize;
pub mod source;
pub mod store;

pub use errors::{ExportError, FileError, ImportError, ImportErrors, StoreError};
pub use import::{FileInput, ImportOptions, ImportResult, ImportRun, import_all, import_file};
pub use store::Store;
