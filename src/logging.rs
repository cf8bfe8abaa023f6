//! Logging setup for applications embedding rowscan.
//!
//! The library only emits `tracing` events; these helpers install a
//! subscriber that writes them to stderr or to a log file.

use crate::error::{Error, Result};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs a global subscriber writing to `log_path`.
///
/// The file is truncated on each run to avoid unbounded growth. Fails if the
/// file cannot be created or a global subscriber is already installed.
pub fn init_file_logging(log_path: &Path) -> Result<()> {
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::config(format!("Could not create log directory: {e}")))?;
    }

    let log_file = File::create(log_path)
        .map_err(|e| Error::config(format!("Could not create log file: {e}")))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(log_file)
        .with_ansi(false)
        .try_init()
        .map_err(|e| Error::config(format!("Could not install logger: {e}")))
}

/// Installs a global subscriber writing to stderr.
pub fn init_stderr_logging() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| Error::config(format!("Could not install logger: {e}")))
}

/// Returns the default log file path.
///
/// Uses the XDG state directory on Linux (`~/.local/state/db-rowscan/rowscan.log`),
/// or falls back to the config directory on other platforms.
pub fn get_log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        return state_dir.join("db-rowscan").join("rowscan.log");
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("db-rowscan").join("rowscan.log");
    }

    std::env::temp_dir().join("rowscan.log")
}
