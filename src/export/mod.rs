mod options;
mod pipeline;
mod sinks;

pub use options::{ExportOptions, ExportReport, OutputTarget, detect_output_delimiter};
pub use pipeline::{execute_query, export_file, query_to_writer};
pub use sinks::{DelimitedSink, RowSink};
