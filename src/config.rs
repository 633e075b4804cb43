use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Settings read from config files and the environment.
///
/// Every field is optional; the CLI fills what remains with its own flags
/// and built-in defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: Option<PathBuf>,
    /// comma|csv|tab|tsv|auto
    pub delimiter: Option<String>,
    pub has_header: Option<bool>,
    pub batch_size: Option<usize>,
    pub progress_every: Option<usize>,
    pub busy_timeout_ms: Option<u64>,
    pub log_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl AppConfig {
    /// Fill fields still unset from `other`.
    fn fill_from(&mut self, other: AppConfig) {
        if self.db_path.is_none() { self.db_path = other.db_path; }
        if self.delimiter.is_none() { self.delimiter = other.delimiter; }
        if self.has_header.is_none() { self.has_header = other.has_header; }
        if self.batch_size.is_none() { self.batch_size = other.batch_size; }
        if self.progress_every.is_none() { self.progress_every = other.progress_every; }
        if self.busy_timeout_ms.is_none() { self.busy_timeout_ms = other.busy_timeout_ms; }
        if self.log_dir.is_none() { self.log_dir = other.log_dir; }
        if self.log_level.is_none() { self.log_level = other.log_level; }
    }
}

/// Candidate config files, highest precedence first.
#[must_use]
pub fn find_config_paths(cli_cfg: Option<&Path>) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = vec![];
    if let Some(p) = cli_cfg { paths.push(p.to_path_buf()); }
    if let Ok(p) = std::env::var("TABULITE_CONFIG") { paths.push(PathBuf::from(p)); }
    if let Ok(home) = std::env::var("USERPROFILE").or_else(|_| std::env::var("HOME")) {
        paths.push(PathBuf::from(home).join(".config").join("tabulite.toml"));
    }
    if let Ok(cur) = std::env::current_dir() { paths.push(cur.join("tabulite.toml")); }
    paths
}

/// Load configuration. Precedence: config files in search order, then the
/// environment. CLI flags are applied later by the caller.
#[must_use]
pub fn load_config(cli_cfg: Option<&Path>) -> AppConfig {
    load_config_from(&find_config_paths(cli_cfg), |k| std::env::var(k).ok())
}

/// [`load_config`] with explicit file candidates and environment lookup.
pub fn load_config_from(paths: &[PathBuf], env: impl Fn(&str) -> Option<String>) -> AppConfig {
    let mut cfg = AppConfig::default();
    for p in paths {
        if !p.exists() {
            continue;
        }
        match std::fs::read_to_string(p) {
            Ok(s) => match toml::from_str::<AppConfig>(&s) {
                Ok(file_cfg) => {
                    log::debug!("config: loaded {}", p.display());
                    cfg.fill_from(file_cfg);
                }
                Err(e) => log::warn!("config: ignoring {}: {e}", p.display()),
            },
            Err(e) => log::warn!("config: cannot read {}: {e}", p.display()),
        }
    }
    let from_env = AppConfig {
        db_path: env("TABULITE_DB").map(PathBuf::from),
        batch_size: env("TABULITE_BATCH_SIZE").and_then(|s| s.parse().ok()),
        log_level: env("TABULITE_LOG_LEVEL"),
        log_dir: env("TABULITE_LOG_DIR").map(PathBuf::from),
        ..AppConfig::default()
    };
    cfg.fill_from(from_env);
    cfg
}

/// Map a delimiter name to its byte; `None` means detect from the file suffix.
///
/// # Errors
/// Returns a message naming the accepted values for anything else.
pub fn parse_delimiter(name: &str) -> Result<Option<u8>, String> {
    match name.trim().to_ascii_lowercase().as_str() {
        "comma" | "csv" | "," => Ok(Some(b',')),
        "tab" | "tsv" | "\\t" | "\t" => Ok(Some(b'\t')),
        "" | "auto" => Ok(None),
        other => Err(format!("invalid delimiter: {other} (use comma, tab, or auto)")),
    }
}
