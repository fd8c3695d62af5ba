//! Console and run-log setup.

use std::path::{Path, PathBuf};

use chrono::Local;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Name of the log file for a run started at `stamp`.
pub fn log_file_name(stamp: chrono::DateTime<Local>) -> String {
    format!("repliq-{}.log", stamp.format("%Y%m%d-%H%M%S"))
}

/// Install console and per-run file logging.
///
/// The returned guard flushes the file writer when dropped, so it must live
/// until the process exits.
pub fn init(log_dir: &Path) -> anyhow::Result<(WorkerGuard, PathBuf)> {
    std::fs::create_dir_all(log_dir)?;
    let file_name = log_file_name(Local::now());
    let file_appender = tracing_appender::rolling::never(log_dir, &file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init()?;

    Ok((guard, log_dir.join(file_name)))
}
