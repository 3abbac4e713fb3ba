//! Structured logging and tracing for the switcher
//!
//! This module sets up the tracing subscriber (console plus a rolling log
//! file) and provides small per-component loggers that tag every message
//! with the component it came from.

use crate::config::LoggingConfig;
use crate::error::{Result, SwitcherError};
use once_cell::sync::OnceCell;
use std::path::Path;
use std::sync::Once;
use tracing::{Level, debug, error, info, trace, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

// Dropping the guard would stop the background writer
static LOG_GUARD: OnceCell<WorkerGuard> = OnceCell::new();
static INIT_ONCE: Once = Once::new();
static INIT_ERROR: OnceCell<String> = OnceCell::new();

/// Initialize logging from the `logging` section
///
/// Safe to call more than once; only the first call installs a subscriber
/// and its outcome is reported to every caller.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    INIT_ONCE.call_once(|| {
        if let Err(e) = install(config) {
            let _ = INIT_ERROR.set(e.to_string());
        }
    });

    match INIT_ERROR.get() {
        Some(err) => Err(SwitcherError::config(err.clone())),
        None => Ok(()),
    }
}

fn install(config: &LoggingConfig) -> Result<()> {
    let base_level = parse_log_level(&config.level)?;
    let level_or_base = |s: &Option<String>| {
        s.as_deref()
            .and_then(|s| parse_log_level(s).ok())
            .unwrap_or(base_level)
    };
    let console_level = level_or_base(&config.console_level);
    let file_level = level_or_base(&config.file_level);

    let mut layers: Vec<BoxedLayer> = Vec::new();
    let console_only = should_use_console_only();

    if console_only || config.console_output {
        layers.push(output_layer(
            std::io::stdout,
            true,
            config.json_format,
            console_level,
        ));
    }
    if !console_only {
        let (writer, guard) = non_blocking(file_appender(config)?);
        let _ = LOG_GUARD.set(guard);
        layers.push(output_layer(writer, false, config.json_format, file_level));
    }

    // The env filter must let the most verbose layer through
    let filter = build_env_filter(console_level.max(file_level));

    // Another subscriber may already be installed by a test harness
    if tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .is_err()
    {
        return Ok(());
    }

    if console_only {
        info!("Logging initialized - console_level: {}, console only", console_level);
    } else {
        info!(
            "Logging initialized - console_level: {}, file_level: {}, file: {}",
            console_level, file_level, config.file
        );
    }
    Ok(())
}

fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("soc_switcher={},reqwest=warn,hyper=warn", level).into()
    })
}

fn should_use_console_only() -> bool {
    cfg!(test) || std::env::var_os("SOC_SWITCHER_DISABLE_FILE_LOG").is_some()
}

fn output_layer<W>(writer: W, ansi: bool, json: bool, level: Level) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(false);
    let filter = LevelFilter::from_level(level);
    if json {
        layer.json().with_filter(filter).boxed()
    } else {
        layer.with_filter(filter).boxed()
    }
}

/// Daily rolling appender named after `logging.file`
///
/// `/var/log/soc-switcher.log` rolls into `/var/log/soc-switcher.<date>.log`;
/// a path without an extension is taken as the directory.
fn file_appender(config: &LoggingConfig) -> Result<rolling::RollingFileAppender> {
    let path = Path::new(&config.file);
    let (dir, prefix, suffix) = match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => (
            path.parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new(".")),
            stem.to_string_lossy().to_string(),
            ext.to_string_lossy().to_string(),
        ),
        _ => (path, "soc-switcher".to_string(), "log".to_string()),
    };

    rolling::Builder::new()
        .rotation(rolling::Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix(suffix)
        .max_log_files(config.backup_count.max(1) as usize)
        .build(dir)
        .map_err(|e| SwitcherError::io(format!("Failed to create log file appender: {}", e)))
}

/// Parse log level string to tracing Level
pub fn parse_log_level(level_str: &str) -> Result<Level> {
    match level_str.to_uppercase().as_str() {
        "TRACE" => Ok(Level::TRACE),
        "DEBUG" => Ok(Level::DEBUG),
        "INFO" => Ok(Level::INFO),
        "WARN" | "WARNING" => Ok(Level::WARN),
        "ERROR" => Ok(Level::ERROR),
        _ => Err(SwitcherError::config(format!(
            "Invalid log level: {}",
            level_str
        ))),
    }
}

/// Component name plus optional `key=value` tags for a logger
#[derive(Debug, Clone)]
pub struct LogContext {
    pub component: String,
    pub extra_fields: Vec<(String, String)>,
}

impl LogContext {
    pub fn new(component: &str) -> Self {
        Self {
            component: component.to_string(),
            extra_fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, key: &str, value: String) -> Self {
        self.extra_fields.push((key.to_string(), value));
        self
    }

    fn render(&self) -> String {
        std::iter::once(format!("component={}", self.component))
            .chain(self.extra_fields.iter().map(|(k, v)| format!("{}={}", k, v)))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Logger that tags every event with its component's `fields`
///
/// The tag string is rendered once at construction.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    fields: String,
}

impl StructuredLogger {
    pub fn new(context: LogContext) -> Self {
        Self {
            fields: context.render(),
        }
    }

    pub fn log(&self, level: Level, message: &str) {
        let fields = self.fields.as_str();
        match level {
            Level::ERROR => error!(fields, "{}", message),
            Level::WARN => warn!(fields, "{}", message),
            Level::INFO => info!(fields, "{}", message),
            Level::DEBUG => debug!(fields, "{}", message),
            _ => trace!(fields, "{}", message),
        }
    }

    pub fn info(&self, message: &str) {
        self.log(Level::INFO, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(Level::WARN, message);
    }

    pub fn error(&self, message: &str) {
        self.log(Level::ERROR, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(Level::DEBUG, message);
    }
}

/// Logger tagged with `component=<name>`
pub fn get_logger(component: &str) -> StructuredLogger {
    StructuredLogger::new(LogContext::new(component))
}

pub fn get_logger_with_context(context: LogContext) -> StructuredLogger {
    StructuredLogger::new(context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("DEBUG").unwrap(), Level::DEBUG);
        assert_eq!(parse_log_level("info").unwrap(), Level::INFO);
        assert_eq!(parse_log_level("warning").unwrap(), Level::WARN);
        assert!(parse_log_level("invalid").is_err());
    }

    #[test]
    fn test_level_max_is_most_verbose() {
        assert_eq!(Level::INFO.max(Level::DEBUG), Level::DEBUG);
        assert_eq!(Level::ERROR.max(Level::WARN), Level::WARN);
    }

    #[test]
    fn test_log_context_fields() {
        let logger = get_logger_with_context(
            LogContext::new("shelly").with_field("relay", "0".to_string()),
        );
        assert_eq!(logger.fields, "component=shelly,relay=0");
        assert_eq!(get_logger("scheduler").fields, "component=scheduler");
    }

    #[test]
    fn test_structured_logger_with_init() {
        init_logging(&LoggingConfig::default()).ok();
        let logger = get_logger("growatt");
        for level in [Level::ERROR, Level::WARN, Level::INFO, Level::DEBUG, Level::TRACE] {
            logger.log(level, "level check");
        }
    }
}
