//! Rolling file logging for hosts embedding the entitlement core.
//!
//! # Responsibility
//! - Start the `flexi_logger` backend at most once per process.
//! - Capture panics as sanitized log events.
//!
//! # Invariants
//! - Library code only emits through the `log` facade; it never starts a
//!   backend by itself.
//! - A second `init_logging` with the same config is a no-op; a different
//!   config is rejected.
//! - Initialization never panics.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_LOG_LEVEL: &str = "ENTITLEMENT_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "ENTITLEMENT_LOG_DIR";

const LOG_FILE_BASENAME: &str = "entitlement";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

static ACTIVE_LOGGER: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK_INSTALLED: OnceCell<()> = OnceCell::new();

struct ActiveLogger {
    config: LoggingConfig,
    _handle: LoggerHandle,
}

/// Validated logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: LevelFilter,
    pub log_dir: PathBuf,
}

impl LoggingConfig {
    /// Validates a level name and an absolute log directory.
    pub fn parse(level: &str, log_dir: &str) -> Result<Self, LoggingError> {
        Ok(Self {
            level: parse_level(level)?,
            log_dir: parse_log_dir(log_dir)?,
        })
    }

    /// Reads `ENTITLEMENT_LOG_DIR` and `ENTITLEMENT_LOG_LEVEL`.
    ///
    /// `Ok(None)` when no log directory is configured. The level defaults to
    /// `default_log_level()`.
    pub fn from_env() -> Result<Option<Self>, LoggingError> {
        let Some(dir) = std::env::var(ENV_LOG_DIR).ok() else {
            return Ok(None);
        };
        let level = std::env::var(ENV_LOG_LEVEL).unwrap_or_else(|_| default_log_level().to_string());
        Self::parse(&level, &dir).map(Some)
    }
}

/// Logging bootstrap errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggingError {
    UnsupportedLevel(String),
    EmptyLogDir,
    RelativeLogDir(String),
    CreateDir { dir: PathBuf, message: String },
    Backend(String),
    AlreadyInitialized { active: LoggingConfig },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedLevel(value) => write!(
                f,
                "unsupported log level `{value}`; expected trace|debug|info|warn|error|off"
            ),
            Self::EmptyLogDir => write!(f, "log directory must not be empty"),
            Self::RelativeLogDir(value) => {
                write!(f, "log directory must be an absolute path, got `{value}`")
            }
            Self::CreateDir { dir, message } => {
                write!(f, "failed to create log directory `{}`: {message}", dir.display())
            }
            Self::Backend(message) => write!(f, "failed to start logger: {message}"),
            Self::AlreadyInitialized { active } => write!(
                f,
                "logging already initialized with level `{}` at `{}`",
                active.level,
                active.log_dir.display()
            ),
        }
    }
}

impl Error for LoggingError {}

/// Starts rolling file logging.
///
/// # Errors
/// - `AlreadyInitialized` when a different config is already active.
/// - `CreateDir` / `Backend` when the backend cannot start.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    if let Some(active) = ACTIVE_LOGGER.get() {
        return ensure_same(&active.config, config);
    }

    let active = ACTIVE_LOGGER.get_or_try_init(|| start_backend(config))?;
    ensure_same(&active.config, config)
}

/// Active logging config, `None` before `init_logging` succeeds.
pub fn logging_status() -> Option<LoggingConfig> {
    ACTIVE_LOGGER.get().map(|active| active.config.clone())
}

/// `debug` for debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn ensure_same(active: &LoggingConfig, requested: &LoggingConfig) -> Result<(), LoggingError> {
    if active == requested {
        Ok(())
    } else {
        Err(LoggingError::AlreadyInitialized {
            active: active.clone(),
        })
    }
}

fn start_backend(config: &LoggingConfig) -> Result<ActiveLogger, LoggingError> {
    std::fs::create_dir_all(&config.log_dir).map_err(|err| LoggingError::CreateDir {
        dir: config.log_dir.clone(),
        message: err.to_string(),
    })?;

    let handle = Logger::try_with_str(config.level.as_str())
        .map_err(|err| LoggingError::Backend(err.to_string()))?
        .log_to_file(
            FileSpec::default()
                .directory(config.log_dir.as_path())
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| LoggingError::Backend(err.to_string()))?;

    install_panic_hook_once();
    info!(
        "event=logging_init module=logging status=ok level={} log_dir={} version={}",
        config.level,
        config.log_dir.display(),
        env!("CARGO_PKG_VERSION")
    );

    Ok(ActiveLogger {
        config: config.clone(),
        _handle: handle,
    })
}

fn parse_level(level: &str) -> Result<LevelFilter, LoggingError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => Ok(LevelFilter::Off),
        "trace" => Ok(LevelFilter::Trace),
        "debug" => Ok(LevelFilter::Debug),
        "info" => Ok(LevelFilter::Info),
        "warn" | "warning" => Ok(LevelFilter::Warn),
        "error" => Ok(LevelFilter::Error),
        other => Err(LoggingError::UnsupportedLevel(other.to_string())),
    }
}

fn parse_log_dir(log_dir: &str) -> Result<PathBuf, LoggingError> {
    let trimmed = log_dir.trim();
    if trimmed.is_empty() {
        return Err(LoggingError::EmptyLogDir);
    }
    let path = Path::new(trimmed);
    if !path.is_absolute() {
        return Err(LoggingError::RelativeLogDir(trimmed.to_string()));
    }
    Ok(path.to_path_buf())
}

fn install_panic_hook_once() {
    if PANIC_HOOK_INSTALLED.set(()).is_err() {
        return;
    }

    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_payload_summary(panic_info);
        error!(
            "event=panic_captured module=logging status=error location={} payload={}",
            location, payload
        );
        previous_hook(panic_info);
    }));
}

fn panic_payload_summary(info: &std::panic::PanicHookInfo<'_>) -> String {
    let payload = if let Some(message) = info.payload().downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = info.payload().downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    };

    sanitize_message(&payload, MAX_PANIC_PAYLOAD_CHARS)
}

fn sanitize_message(value: &str, max_chars: usize) -> String {
    let normalized = value.replace(['\n', '\r'], " ");
    let mut truncated = normalized.chars().take(max_chars).collect::<String>();
    if normalized.chars().count() > max_chars {
        truncated.push_str("...");
    }
    truncated
}
