//! Logging infrastructure for the agent.
//!
//! Structured logging with dual output:
//! - appends to the configured log file (non-blocking writer)
//! - also prints to stdout for interactive tailing
//! - configurable via the RUST_LOG environment variable

use std::fs;
use std::io;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard flushes and closes the log file writer.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Initialize the logging system.
///
/// Creates the log directory if needed and sets up dual output to both the
/// log file and stdout. Returns a guard that must be kept alive for file
/// logging to work.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created.
pub fn init_logging(log_file: &Path) -> Result<LoggingGuard, io::Error> {
    let (dir, file_name) = split_log_path(log_file);
    fs::create_dir_all(dir)?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(false);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_ansi(true)
        .with_target(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

fn split_log_path(log_file: &Path) -> (&Path, &std::ffi::OsStr) {
    let dir = match log_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = log_file
        .file_name()
        .unwrap_or_else(|| std::ffi::OsStr::new("agent.log"));
    (dir, file_name)
}
