//! # Logging Utilities
//!
//! Logging setup for polycheck using `tracing`.
//!
//! The checker runs inside a host engine whose stdout usually belongs to
//! the analysed program, so console output goes to stderr. Optionally every
//! event is also written to a log file through a non-blocking appender.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use polycheck_utils::init_logging_from_env;
//!
//! // Keep the guard alive for as long as the program runs.
//! let _guard = init_logging_from_env().expect("Failed to initialize logging");
//!
//! tracing::info!("Checker started");
//! ```
//!
//! ## Environment Variables
//!
//! - `POLYCHECK_LOG`: Filter directives (e.g. `debug`, `polycheck_core=trace`).
//!   Falls back to `RUST_LOG`, then to `info`.
//! - `POLYCHECK_LOG_FORMAT`: Output format (`json` or `pretty`, default: `pretty`)
//! - `POLYCHECK_LOG_FILE`: Optional log file. If it names a directory, a
//!   dated file `YYYY-MM-DD-polycheck.log` is created inside it.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use polycheck_utils::{LogFormat, LogLevel, LoggingConfig, init_logging};
//!
//! let config = LoggingConfig::default()
//!     .with_level(LogLevel::Debug)
//!     .with_format(LogFormat::Json);
//! let _guard = init_logging(&config).expect("Failed to initialize logging");
//! ```

use std::fmt as std_fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, io};

use chrono::Utc;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const FILTER_ENV: &str = "POLYCHECK_LOG";
const FORMAT_ENV: &str = "POLYCHECK_LOG_FORMAT";
const FILE_ENV: &str = "POLYCHECK_LOG_FILE";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat
{
    /// Pretty-printed, human-readable format (default)
    #[default]
    Pretty,
    /// JSON, one object per line
    Json,
}

impl FromStr for LogFormat
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "dev" | "development" => Ok(LogFormat::Pretty),
            "json" | "prod" | "production" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {s}. Use 'pretty' or 'json'")),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    /// Error level
    Error,
    /// Warning level
    Warn,
    /// Info level (default)
    Info,
    /// Debug level
    Debug,
    /// Trace level (most verbose)
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!(
                "Unknown log level: {s}. Use 'error', 'warn', 'info', 'debug', or 'trace'"
            )),
        }
    }
}

impl std_fmt::Display for LogLevel
{
    fn fmt(&self, f: &mut std_fmt::Formatter<'_>) -> std_fmt::Result
    {
        write!(f, "{}", Level::from(*self))
    }
}

/// Logging settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingConfig
{
    /// Explicit level; overrides any filter directives from the environment
    pub level: Option<LogLevel>,
    /// Filter directives (`POLYCHECK_LOG` / `RUST_LOG` syntax)
    pub directives: Option<String>,
    /// Output format
    pub format: LogFormat,
    /// Log file or directory
    pub file: Option<PathBuf>,
}

impl LoggingConfig
{
    /// Read settings from the `POLYCHECK_LOG*` environment variables.
    ///
    /// ## Errors
    ///
    /// Returns [`LoggingError::InvalidFormat`] if `POLYCHECK_LOG_FORMAT` is set
    /// to an unknown format.
    pub fn from_env() -> Result<Self, LoggingError>
    {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Read settings through `var`, which maps a variable name to its value.
    ///
    /// ## Errors
    ///
    /// Same as [`LoggingConfig::from_env`].
    pub fn from_vars<F>(var: F) -> Result<Self, LoggingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let format = match var(FORMAT_ENV) {
            Some(value) => value.parse().map_err(LoggingError::InvalidFormat)?,
            None => LogFormat::default(),
        };
        Ok(Self {
            level: None,
            directives: var(FILTER_ENV).or_else(|| var("RUST_LOG")),
            format,
            file: var(FILE_ENV).filter(|path| !path.is_empty()).map(PathBuf::from),
        })
    }

    /// Set an explicit level.
    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self
    {
        self.level = Some(level);
        self
    }

    /// Set the output format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self
    {
        self.format = format;
        self
    }

    /// Also write to `file` (a file or a directory).
    #[must_use]
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self
    {
        self.file = Some(file.into());
        self
    }

    /// Build the event filter.
    ///
    /// Priority:
    /// 1. the explicit level (from a `--log-level` flag)
    /// 2. the filter directives, if they parse
    /// 3. `info`
    #[must_use]
    pub fn filter(&self) -> EnvFilter
    {
        if let Some(level) = self.level {
            return EnvFilter::new(Level::from(level).to_string());
        }
        self.directives
            .as_deref()
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new(Level::INFO.to_string()))
    }

    /// The file events are written to, if any.
    ///
    /// A directory resolves to a dated file inside it.
    #[must_use]
    pub fn log_file(&self) -> Option<PathBuf>
    {
        self.file.as_deref().map(|path| {
            if path.is_dir() {
                path.join(format!("{}-polycheck.log", Utc::now().format("%Y-%m-%d")))
            } else {
                path.to_path_buf()
            }
        })
    }
}

/// Keeps the file writer alive
///
/// Buffered events are flushed when the guard is dropped, so hold it until
/// the program exits.
#[derive(Debug)]
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard
{
    _worker: Option<WorkerGuard>,
    file: Option<PathBuf>,
}

impl LoggingGuard
{
    /// Path of the log file, if file logging is active.
    #[must_use]
    pub fn log_file(&self) -> Option<&Path>
    {
        self.file.as_deref()
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn output_layer<W>(format: LogFormat, writer: W, ansi: bool, filter: EnvFilter) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer::<Registry>()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_writer(writer);

    match format {
        LogFormat::Pretty => Box::new(layer.with_ansi(ansi).with_filter(filter)),
        LogFormat::Json => Box::new(
            layer
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_filter(filter),
        ),
    }
}

/// Install the global subscriber described by `config`.
///
/// ## Errors
///
/// Returns an error if:
/// - A global subscriber is already installed
/// - The log file's directory cannot be created
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError>
{
    let mut layers: Vec<BoxedLayer> = vec![output_layer(config.format, io::stderr, true, config.filter())];

    let log_file = config.log_file();
    let mut worker = None;
    if let Some(path) = &log_file {
        let directory = path.parent().filter(|dir| !dir.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| LoggingError::InitializationFailed(format!("Not a file path: {}", path.display())))?;
        std::fs::create_dir_all(directory)?;

        let appender = tracing_appender::rolling::never(directory, name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        layers.push(output_layer(config.format, writer, false, config.filter()));
        worker = Some(guard);
    }

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;

    Ok(LoggingGuard {
        _worker: worker,
        file: log_file,
    })
}

/// Install the global subscriber configured by the environment.
///
/// ## Errors
///
/// Same as [`LoggingConfig::from_env`] and [`init_logging`].
pub fn init_logging_from_env() -> Result<LoggingGuard, LoggingError>
{
    init_logging(&LoggingConfig::from_env()?)
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}")]
    InvalidFormat(String),

    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}
