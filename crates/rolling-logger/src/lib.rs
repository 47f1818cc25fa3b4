//! Rolling Logger
//!
//! File logger for the kanban service. Lines go to stderr and to a directory
//! of time-rotated log files written off the hot path. At each rollover the
//! oldest files beyond `max_files` are removed, so the directory acts as a
//! circular buffer over the most recent output.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub use tracing_appender::rolling::Rotation;

/// Number of log files kept on disk
pub const DEFAULT_MAX_FILES: usize = 5;

const LOG_SUFFIX: &str = "log";

static LOGGER: OnceLock<Logger> = OnceLock::new();

struct Logger {
    dir: PathBuf,
    // Dropping the guard flushes the background writer
    guard: Mutex<Option<WorkerGuard>>,
}

/// Logger errors
#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    #[error("log directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("log appender in {path}: {source}")]
    Appender {
        path: PathBuf,
        #[source]
        source: tracing_appender::rolling::InitError,
    },

    #[error("logger already initialized")]
    AlreadyInitialized,

    #[error("logger not initialized")]
    NotInitialized,
}

/// Where and how often log files roll
#[derive(Debug, Clone)]
pub struct LogSettings {
    pub dir: PathBuf,
    pub prefix: String,
    pub rotation: Rotation,
    pub max_files: usize,
}

impl LogSettings {
    /// Daily files under `dir`, keeping `DEFAULT_MAX_FILES`
    pub fn daily(dir: impl AsRef<Path>, prefix: &str) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            prefix: prefix.to_string(),
            rotation: Rotation::DAILY,
            max_files: DEFAULT_MAX_FILES,
        }
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    /// Build the appender; files are named `<prefix>.<date>.log`
    pub fn appender(&self) -> Result<RollingFileAppender, LoggerError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| LoggerError::Io {
            path: self.dir.clone(),
            source,
        })?;

        RollingFileAppender::builder()
            .rotation(self.rotation.clone())
            .filename_prefix(self.prefix.as_str())
            .filename_suffix(LOG_SUFFIX)
            .max_log_files(self.max_files.max(1))
            .build(&self.dir)
            .map_err(|source| LoggerError::Appender {
                path: self.dir.clone(),
                source,
            })
    }
}

/// Install the global subscriber: stderr plus daily files under `log_dir`.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Records sent
/// through the `log` facade are forwarded to the same subscriber.
pub fn init_logger(log_dir: impl AsRef<Path>, app_name: &str) -> Result<(), LoggerError> {
    init_with(LogSettings::daily(log_dir, app_name))
}

pub fn init_with(settings: LogSettings) -> Result<(), LoggerError> {
    if LOGGER.get().is_some() {
        return Err(LoggerError::AlreadyInitialized);
    }

    let (writer, guard) = tracing_appender::non_blocking(settings.appender()?);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer),
        )
        .try_init()
        .map_err(|_| LoggerError::AlreadyInitialized)?;

    LOGGER
        .set(Logger {
            dir: settings.dir.clone(),
            guard: Mutex::new(Some(guard)),
        })
        .map_err(|_| LoggerError::AlreadyInitialized)?;

    tracing::info!(
        prefix = %settings.prefix,
        dir = %settings.dir.display(),
        max_files = settings.max_files,
        "rolling logger initialized"
    );
    Ok(())
}

/// Directory of the installed logger
pub fn log_dir() -> Result<PathBuf, LoggerError> {
    LOGGER
        .get()
        .map(|logger| logger.dir.clone())
        .ok_or(LoggerError::NotInitialized)
}

/// Flush buffered lines to disk; later lines only reach stderr
pub fn shutdown() -> Result<(), LoggerError> {
    let logger = LOGGER.get().ok_or(LoggerError::NotInitialized)?;
    let guard = logger
        .guard
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    drop(guard);
    Ok(())
}

fn ensure_initialized() -> Result<(), LoggerError> {
    LOGGER
        .get()
        .map(|_| ())
        .ok_or(LoggerError::NotInitialized)
}

pub fn info(message: &str) -> Result<(), LoggerError> {
    ensure_initialized()?;
    log::info!("{}", message);
    Ok(())
}

pub fn warn(message: &str) -> Result<(), LoggerError> {
    ensure_initialized()?;
    log::warn!("{}", message);
    Ok(())
}

pub fn error(message: &str) -> Result<(), LoggerError> {
    ensure_initialized()?;
    log::error!("{}", message);
    Ok(())
}
