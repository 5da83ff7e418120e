//! Tracing subscriber bootstrap for binaries and demos embedding the core
//!
//! The library itself only emits `tracing` events; installing a subscriber is
//! left to the embedding program.

use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

use crate::errors::{HandsfreeError, Result};

/// Variable consulted by [`LoggingConfig::from_env`]
pub const LOG_LEVEL_ENV: &str = "HANDSFREE_LOG_LEVEL";

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Baseline level; `RUST_LOG` directives are layered on top
    pub level: Level,
    pub json: bool,
    /// Include source file and line in every record
    pub file_info: bool,
    /// Emit span enter/exit records
    pub log_spans: bool,
    /// Reported once when logging comes up
    pub app_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new(Level::INFO, "handsfree")
    }
}

impl LoggingConfig {
    pub fn new(level: Level, app_name: impl Into<String>) -> Self {
        Self {
            level,
            json: false,
            file_info: false,
            log_spans: false,
            app_name: app_name.into(),
        }
    }

    /// Level taken from `HANDSFREE_LOG_LEVEL`, `INFO` when the variable is unset
    pub fn from_env(app_name: impl Into<String>) -> Result<Self> {
        let level = match std::env::var(LOG_LEVEL_ENV) {
            Ok(value) => parse_log_level(&value)?,
            Err(_) => Level::INFO,
        };
        Ok(Self::new(level, app_name))
    }

    pub fn with_json(mut self) -> Self {
        self.json = true;
        self
    }

    pub fn with_file_info(mut self) -> Self {
        self.file_info = true;
        self
    }

    pub fn with_spans(mut self) -> Self {
        self.log_spans = true;
        self
    }
}

/// Install the global `fmt` subscriber. Fails if one is already installed.
pub fn setup_logging(config: LoggingConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(config.level.into());
    let span_events = match config.log_spans {
        true => FmtSpan::ACTIVE,
        false => FmtSpan::NONE,
    };

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_span_events(span_events)
        .with_file(config.file_info)
        .with_line_number(config.file_info);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| HandsfreeError::config(format!("failed to install subscriber: {}", e)))?;

    tracing::info!(app = %config.app_name, level = %config.level, "Logging initialised");
    Ok(())
}

/// Case-insensitive level name, e.g. `"debug"` or `"WARN"`
pub fn parse_log_level(level: &str) -> Result<Level> {
    Level::from_str(level.trim()).map_err(|_| HandsfreeError::config(format!("Invalid log level: {}", level)))
}
