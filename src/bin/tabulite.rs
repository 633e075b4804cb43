use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tabulite::cli::{self, EventRenderer, OutputMode, RunConfig};
use tabulite::config::{load_config, parse_delimiter};
use tabulite::import::EventChannel;
use tabulite::logger;

#[derive(Parser, Debug)]
#[command(
    name = "tabulite",
    version,
    about = "Stream CSV/TSV files into SQLite, query them with SQL, export the results",
    long_about = None,
    after_help = "Examples:\n  \
        tabulite -i data.csv -q \"SELECT * FROM data LIMIT 10\" -o results.csv\n  \
        tabulite -i users.csv,orders.csv -t users,orders -q \"SELECT * FROM users u JOIN orders o ON u.id = o.user_id\"\n  \
        cat data.csv | tabulite -q \"SELECT COUNT(*) FROM data\""
)]
struct Cli {
    /// Path to a config file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Input CSV/TSV file(s), comma-separated or repeated; '-' for stdin
    #[arg(short = 'i', long = "input")]
    inputs: Vec<String>,
    /// Table name(s) for the inputs (default: data, data2, ...)
    #[arg(short = 't', long = "table")]
    tables: Vec<String>,
    /// SQL query to execute; may be repeated
    #[arg(short = 'q', long = "query")]
    queries: Vec<String>,
    /// Output file(s), one per query; default stdout
    #[arg(short = 'o', long = "output")]
    outputs: Vec<String>,
    /// SQLite database path (default: temporary file removed on exit)
    #[arg(short = 'd', long)]
    db: Option<PathBuf>,
    /// Inputs have no header row; columns become col1..colN
    #[arg(long)]
    no_header: bool,
    /// Field delimiter: comma, tab or auto
    #[arg(long)]
    delimiter: Option<String>,
    /// Column(s) to index on every imported table
    #[arg(short = 'x', long = "index")]
    index: Vec<String>,
    /// Show row-level progress
    #[arg(short = 'p', long)]
    progress: bool,
    /// Rows per insert transaction
    #[arg(long)]
    batch_size: Option<usize>,
    /// Status and event format on stderr: human|plain|json
    #[arg(long, default_value = "human")]
    format: String,
    /// Log level for stderr/file logging
    #[arg(long)]
    log_level: Option<String>,
}

fn build_config(args: &Cli) -> Result<(RunConfig, Option<PathBuf>, Option<String>), String> {
    // Precedence: CLI > env > config files > defaults
    let app = load_config(args.config.as_deref());
    let mut cfg = RunConfig::from_app_config(&app);
    cfg.inputs = cli::split_list(&args.inputs);
    cfg.tables = cli::split_list(&args.tables);
    cfg.queries = args.queries.iter().filter(|q| !q.trim().is_empty()).cloned().collect();
    cfg.outputs = cli::split_list(&args.outputs);
    cfg.index_columns = cli::split_list(&args.index);
    cfg.show_progress = args.progress;
    if args.db.is_some() {
        cfg.db_path.clone_from(&args.db);
    }
    if args.no_header {
        cfg.has_header = false;
    }
    if let Some(d) = &args.delimiter {
        cfg.delimiter = parse_delimiter(d)?;
    }
    if let Some(n) = args.batch_size {
        cfg.batch_size = n;
    }
    cfg.default_stdin_input();
    let level = args.log_level.clone().or(app.log_level);
    Ok((cfg, app.log_dir, level))
}

fn main() -> ExitCode {
    let args = Cli::parse();
    let mode = cli::parse_output_mode(Some(&args.format));
    let (cfg, log_dir, level) = match build_config(&args) {
        Ok(parts) => parts,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };
    match log_dir {
        Some(dir) => {
            if let Err(e) = logger::configure_logging(Some(&dir), level.as_deref(), None) {
                eprintln!("warning: could not configure logging in {}: {e}", dir.display());
            }
        }
        None => {
            if !logger::configure_from_env() {
                logger::init_console(Some(level.as_deref().unwrap_or("warn")));
            }
        }
    }

    let events = EventChannel::new(EventRenderer::stderr(mode, cfg.show_progress));
    match cli::run_with_format(&cfg, mode, &events) {
        Ok(summary) => {
            if mode == OutputMode::Json
                && let Ok(s) = serde_json::to_string(&summary)
            {
                eprintln!("{s}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
