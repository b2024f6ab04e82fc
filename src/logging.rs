//! Process-wide tracing setup
//!
//! Events go to stderr and to `sideline.<YYYY-MM-DD>.log` in the log
//! directory, one file per day with a week of history. On macOS they are
//! also forwarded to unified logging.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "sideline";
const LOG_FILE_SUFFIX: &str = "log";
const LOG_DIR_ENV: &str = "SIDELINE_LOG_PATH";
const LOG_FILES_KEPT: usize = 7;

/// Our own targets at info; HTTP client internals only when they warn
const DEFAULT_DIRECTIVES: &str = "warn,sideline=info,sideline_agent=info";

#[cfg(target_os = "macos")]
const OSLOG_SUBSYSTEM: &str = "dev.sideline.agent";

/// Directory holding the daily log files
pub fn log_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(LOG_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }

    let dirs = ProjectDirs::from("dev", "sideline", "agent")
        .context("Failed to determine project directories for log path")?;
    // state_dir only exists on Linux
    let base = dirs.state_dir().unwrap_or_else(|| dirs.data_local_dir());
    Ok(base.join("logs"))
}

/// Install the global subscriber.
///
/// `RUST_LOG` replaces the default directives; an unparsable value is
/// reported on stderr and ignored. The returned guard flushes the file
/// writer on drop and must be held until exit.
pub fn init_logging() -> Result<WorkerGuard> {
    let dir = log_dir()?;
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender(&dir)?);

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = filter_from(rust_log.as_deref());

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false));

    #[cfg(target_os = "macos")]
    let registry = registry.with(tracing_oslog::OsLogger::new(OSLOG_SUBSYSTEM, "default"));

    registry
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::debug!("Logging to {:?}", dir);
    Ok(guard)
}

/// Daily appender that deletes files beyond the last week on rollover
fn file_appender(dir: &Path) -> Result<RollingFileAppender> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory: {:?}", dir))?;

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(LOG_FILES_KEPT)
        .build(dir)
        .with_context(|| format!("Failed to open log file in {:?}", dir))
}

fn filter_from(directives: Option<&str>) -> EnvFilter {
    match directives.map(str::trim).filter(|d| !d.is_empty()) {
        Some(directives) => EnvFilter::try_new(directives).unwrap_or_else(|e| {
            eprintln!("Ignoring {}={:?}: {}", EnvFilter::DEFAULT_ENV, directives, e);
            EnvFilter::new(DEFAULT_DIRECTIVES)
        }),
        None => EnvFilter::new(DEFAULT_DIRECTIVES),
    }
}
