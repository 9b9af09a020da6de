//! Tracing subscriber setup for the binary.
//!
//! Level comes from `FIELDLINK_LOG` (EnvFilter syntax, default `warn`).
//! Output goes to the configured log file, or stderr so stdout stays clean
//! for command output.

use std::fs;
use std::io;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

pub const LOG_ENV: &str = "FIELDLINK_LOG";
const DEFAULT_FILTER: &str = "warn";

/// Keeps the file writer alive; dropping it flushes the log.
pub struct LoggingGuard {
  _file_guard: Option<WorkerGuard>,
}

pub fn init_logging(config: &LogConfig) -> io::Result<LoggingGuard> {
  let env_filter =
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

  let Some(path) = &config.file else {
    tracing_subscriber::registry()
      .with(env_filter)
      .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
      .init();
    return Ok(LoggingGuard { _file_guard: None });
  };

  let (dir, file_name) = split_log_path(path)?;
  fs::create_dir_all(dir)?;

  let file_appender = tracing_appender::rolling::never(dir, file_name);
  let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

  tracing_subscriber::registry()
    .with(env_filter)
    .with(
      tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false),
    )
    .init();

  Ok(LoggingGuard {
    _file_guard: Some(file_guard),
  })
}

fn split_log_path(path: &Path) -> io::Result<(&Path, &std::ffi::OsStr)> {
  let file_name = path.file_name().ok_or_else(|| {
    io::Error::new(
      io::ErrorKind::InvalidInput,
      format!("log file path has no file name: {}", path.display()),
    )
  })?;
  let dir = match path.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent,
    _ => Path::new("."),
  };
  Ok((dir, file_name))
}
