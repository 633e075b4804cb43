mod command;
mod render;
mod runner;
mod util;

pub use command::RunConfig;
pub use render::EventRenderer;
pub use runner::{OutputMode, QueryOutcome, RunSummary, run, run_with_format};
pub use util::{default_table_name, parse_output_mode, split_list};
