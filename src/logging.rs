//! Tracing subscriber setup for the simulator.
//!
//! The matching core only emits `tracing` events; installing a subscriber is
//! left to the binary or the embedding application.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: standard tracing filter, overrides `LogConfig::default_level`
//! - `LOG_FORMAT`: `pretty` (default), `compact`, or `json`
//! - `LOG_TIMESTAMPS`: `utc` (default), `local`, or `none`

use serde::{Deserialize, Serialize};
use std::env;
use tracing_subscriber::fmt::time::{ChronoLocal, ChronoUtc};
use tracing_subscriber::EnvFilter;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "compact" => LogFormat::Compact,
            _ => LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampFormat {
    #[default]
    Utc,
    Local,
    None,
}

impl TimestampFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "local" => TimestampFormat::Local,
            "none" | "off" => TimestampFormat::None,
            _ => TimestampFormat::Utc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
    pub timestamps: TimestampFormat,
    /// Filter used when `RUST_LOG` is unset, e.g. `info` or `ohlc_match_core=debug`.
    pub default_level: String,
    pub include_target: bool,
    /// file:line of the emitting call site
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            timestamps: TimestampFormat::Utc,
            default_level: "info".to_string(),
            include_target: true,
            include_location: false,
        }
    }
}

impl LogConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            format: env::var("LOG_FORMAT")
                .map(|s| LogFormat::parse(&s))
                .unwrap_or(defaults.format),
            timestamps: env::var("LOG_TIMESTAMPS")
                .map(|s| TimestampFormat::parse(&s))
                .unwrap_or(defaults.timestamps),
            ..defaults
        }
    }

    pub fn with_default_level(mut self, level: impl Into<String>) -> Self {
        self.default_level = level.into();
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter {filter:?}: {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("global subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

/// Install a global `fmt` subscriber. Fails if one is already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.default_level).map_err(|e| LoggingError::InvalidFilter {
            filter: config.default_level.clone(),
            reason: e.to_string(),
        })?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.include_target)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    let utc = || ChronoUtc::new(TIME_FORMAT.to_string());
    let local = || ChronoLocal::new(TIME_FORMAT.to_string());

    let result = match (config.format, config.timestamps) {
        (LogFormat::Json, TimestampFormat::Utc) => builder.json().with_timer(utc()).try_init(),
        (LogFormat::Json, TimestampFormat::Local) => builder.json().with_timer(local()).try_init(),
        (LogFormat::Json, TimestampFormat::None) => builder.json().without_time().try_init(),
        (LogFormat::Compact, TimestampFormat::Utc) => builder.compact().with_timer(utc()).try_init(),
        (LogFormat::Compact, TimestampFormat::Local) => builder.compact().with_timer(local()).try_init(),
        (LogFormat::Compact, TimestampFormat::None) => builder.compact().without_time().try_init(),
        (LogFormat::Pretty, TimestampFormat::Utc) => builder.pretty().with_timer(utc()).try_init(),
        (LogFormat::Pretty, TimestampFormat::Local) => builder.pretty().with_timer(local()).try_init(),
        (LogFormat::Pretty, TimestampFormat::None) => builder.pretty().without_time().try_init(),
    };

    result.map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))
}
