use std::path::{Path, PathBuf};

use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::rolling_file::policy::compound::{
    CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
};
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}";
const ROLL_SIZE: u64 = 10 * 1024 * 1024;
const DEFAULT_RETENTION: u32 = 7;

/// Target used by the import pipeline; routed to its own file.
pub const IMPORT_TARGET: &str = "tabulite::import";

/// error|warn|info|debug|trace|off, anything else is info.
#[must_use]
pub fn parse_level(level: Option<&str>) -> LevelFilter {
    match level.unwrap_or("info").to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

fn rolling(
    base: &Path,
    stem: &str,
    keep: u32,
) -> Result<RollingFileAppender, Box<dyn std::error::Error>> {
    let roller = FixedWindowRoller::builder()
        .build(&format!("{}", base.join(format!("{stem}.{{}}.log")).display()), keep)?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(ROLL_SIZE)), Box::new(roller));
    Ok(RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build(base.join(format!("{stem}.log")), Box::new(policy))?)
}

/// Build the rolling-file configuration: `app.log` for everything and
/// `import.log` for the import pipeline.
///
/// # Errors
/// Returns an error if the directory or an appender cannot be created.
pub fn file_config(
    dir: Option<&Path>,
    level: Option<&str>,
    retention: Option<usize>,
) -> Result<Config, Box<dyn std::error::Error>> {
    let base = dir
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    std::fs::create_dir_all(&base)?;
    let keep = retention.map_or(DEFAULT_RETENTION, |n| u32::try_from(n).unwrap_or(u32::MAX));
    let lvl = parse_level(level);
    let config = Config::builder()
        .appender(Appender::builder().build("app", Box::new(rolling(&base, "app", keep)?)))
        .appender(Appender::builder().build("import", Box::new(rolling(&base, "import", keep)?)))
        .logger(Logger::builder().appender("import").build(IMPORT_TARGET, lvl))
        .build(Root::builder().appender("app").build(lvl))?;
    Ok(config)
}

/// Configure file logging for the process. A second call is ignored.
/// - dir: base directory for logs; if None, current directory.
/// - level: error|warn|info|debug|trace
/// - retention: number of rolled files to keep (default 7)
///
/// # Errors
/// Returns an error if the log directory or its files cannot be created.
pub fn configure_logging(
    dir: Option<&Path>,
    level: Option<&str>,
    retention: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = file_config(dir, level, retention)?;
    if log4rs::init_config(config).is_err() {
        log::debug!("logger already initialized; keeping existing configuration");
    }
    Ok(())
}

/// Log to stderr only, leaving stdout for query output.
pub fn init_console(level: Option<&str>) {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("[{l}] {m}{n}")))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(parse_level(level)));
    if let Ok(config) = config {
        let _ = log4rs::init_config(config);
    }
}

/// Configure logging from environment variables if present:
/// - TABULITE_LOG_DIR
/// - TABULITE_LOG_LEVEL
/// - TABULITE_LOG_RETENTION
///
/// Without `TABULITE_LOG_DIR` nothing is written to disk. Returns whether
/// file logging was configured.
pub fn configure_from_env() -> bool {
    let Some(dir) = std::env::var("TABULITE_LOG_DIR").ok().map(PathBuf::from) else {
        return false;
    };
    let level = std::env::var("TABULITE_LOG_LEVEL").ok();
    let retention =
        std::env::var("TABULITE_LOG_RETENTION").ok().and_then(|s| s.parse::<usize>().ok());
    match configure_logging(Some(&dir), level.as_deref(), retention) {
        Ok(()) => true,
        Err(e) => {
            eprintln!("warning: could not configure logging in {}: {e}", dir.display());
            false
        }
    }
}
