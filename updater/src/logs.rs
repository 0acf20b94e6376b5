//! Logging configuration

use std::path::PathBuf;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::errors::UpdateError;

/// Log level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_filter_string(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

impl serde::Serialize for LogLevel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_filter_string())
    }
}

impl<'de> serde::Deserialize<'de> for LogLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Logging options
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Log level
    pub log_level: LogLevel,

    /// Directory for an additional plain-text log file
    pub log_dir: Option<PathBuf>,

    /// Enable JSON format on stderr
    pub json_format: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Warn,
            log_dir: None,
            json_format: false,
        }
    }
}

/// Name of the log file written under `LogOptions::log_dir`
pub const LOG_FILE_PREFIX: &str = "sysupdate";

/// Initialize logging
pub fn init_logging(options: LogOptions) -> Result<(), UpdateError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(options.log_level.to_filter_string()));

    let stderr_layer = if options.json_format {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    };

    let file_layer = match &options.log_dir {
        Some(dir) => {
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(LOG_FILE_PREFIX)
                .filename_suffix("log")
                .build(dir)
                .map_err(|e| UpdateError::ConfigError(format!("log file in {:?}: {}", dir, e)))?;
            Some(fmt::layer().with_ansi(false).with_writer(appender))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| UpdateError::ConfigError(e.to_string()))?;

    Ok(())
}
