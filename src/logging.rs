use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::constants::constants;

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "YTB_LOG";

pub fn log_dir() -> Option<PathBuf> {
  ProjectDirs::from("", "", "ytb").map(|dirs| dirs.data_local_dir().join("logs"))
}

/// Route tracing output to a daily log file. The terminal belongs to the UI,
/// so nothing is written to stdout or stderr.
///
/// Keep the returned guard alive until exit or buffered lines are lost.
pub fn init() -> Result<WorkerGuard> {
  let dir = log_dir().ok_or_else(|| anyhow!("Could not determine a data directory for logs"))?;
  std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create log directory {}", dir.display()))?;

  let appender = tracing_appender::rolling::daily(&dir, &constants().log_file_prefix);
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::registry()
    .with(filter)
    .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false).with_target(false))
    .try_init()
    .context("Failed to install tracing subscriber")?;

  Ok(guard)
}
