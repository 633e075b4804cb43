mod events;
mod options;
mod orchestrator;
mod pipeline;
mod reader;

pub use events::{EventChannel, EventKind, FileEvents, ProgressEvent, ProgressObserver};
pub use options::{DEFAULT_PROGRESS_EVERY, FileInput, ImportOptions, ImportResult};
pub use orchestrator::{ImportRun, import_all};
pub use pipeline::{FileImporter, ImportPhase, import_file, import_from_reader};
pub use reader::{DelimitedReader, ParsedHeader, Row};
