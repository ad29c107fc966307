//! Logging setup: console output plus an append-only log file
//!
//! The log file is opened in the working directory when possible and in the
//! user's home directory otherwise. File output goes through a non-blocking
//! writer, so the returned guard must live as long as the process logs.

use crate::{HarvestError, Result};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Default log file name
pub const DEFAULT_LOG_FILE: &str = "listing_harvest.log";

/// Keeps the log file writer alive; dropping it flushes pending lines
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,

    /// Where the log file ended up, if one could be opened
    pub log_path: Option<PathBuf>,
}

/// Filter directives for a verbosity level
pub fn filter_directives(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "listing_harvest=info,warn",
        1 => "listing_harvest=debug,info",
        2 => "listing_harvest=trace,debug",
        _ => "trace",
    }
}

fn open_append(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Opens the log file, falling back to the same file name in `fallback_dir`
///
/// # Returns
///
/// * `Some((path, file))` - The file that was opened, primary or fallback
/// * `None` - Neither location could be opened
pub fn resolve_log_path(primary: &Path, fallback_dir: Option<&Path>) -> Option<(PathBuf, File)> {
    match open_append(primary) {
        Ok(file) => return Some((primary.to_path_buf(), file)),
        Err(e) => eprintln!("Cannot open log file {}: {}", primary.display(), e),
    }

    let file_name = primary.file_name()?;
    let fallback = fallback_dir?.join(file_name);
    match open_append(&fallback) {
        Ok(file) => Some((fallback, file)),
        Err(e) => {
            eprintln!("Cannot open fallback log file {}: {}", fallback.display(), e);
            None
        }
    }
}

/// Installs the global subscriber
///
/// Console output honors the verbosity ladder; the log file receives the
/// same events without ANSI colors. If no log file can be opened the run
/// continues with console output only.
pub fn init_logging(verbose: u8, quiet: bool, log_path: &Path) -> Result<LoggingGuard> {
    let filter = EnvFilter::new(filter_directives(verbose, quiet));

    let home = dirs::home_dir();
    let resolved = resolve_log_path(log_path, home.as_deref());

    let (file_layer, file_guard, log_path) = match resolved {
        Some((path, file)) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard), Some(path))
        }
        None => (None, None, None),
    };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    Registry::default()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| HarvestError::Logging(e.to_string()))?;

    Ok(LoggingGuard {
        _file: file_guard,
        log_path,
    })
}
