// 9.0 config.rs: all simulator settings in one place. broker, logging, replay.
// 9.1 loaded from JSON; any missing section falls back to its defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::broker::BrokerConfig;
use crate::logging::{LogConfig, LogFormat, TimestampFormat};
use crate::ohlc::OhlcKind;
use crate::quote_feed::ReplayConfig;

// Complete configuration for a replay run
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub broker: BrokerConfig,
    pub logging: LogConfig,
    pub replay: ReplayConfig,
}

impl SimulatorConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    // Backtests replay whole days of minute data; keep every fill and log quietly
    pub fn backtest() -> Self {
        let mut config = Self::default();
        config.broker.max_events = 1_000_000;
        config.logging.format = LogFormat::Compact;
        config.logging.default_level = "warn".to_string();
        config.replay.kinds = vec![OhlcKind::Minute];
        config
    }

    // Errors only, no timestamps. for test harnesses and piping
    pub fn quiet() -> Self {
        let mut config = Self::default();
        config.logging.default_level = "error".to_string();
        config.logging.timestamps = TimestampFormat::None;
        config.logging.include_target = false;
        config
    }

    /** 9.2: reject settings the broker or the feed cannot run with */
    pub fn validate(&self) -> Result<(), ConfigError> {
        // the channel keeps at least the two events of one cross
        if self.broker.max_events < 2 {
            return Err(ConfigError::InvalidBroker {
                reason: "max_events must be at least 2".to_string(),
            });
        }

        if self.replay.kinds.is_empty() {
            return Err(ConfigError::InvalidReplay {
                reason: "at least one bar kind must be replayed".to_string(),
            });
        }

        if self.logging.default_level.trim().is_empty() {
            return Err(ConfigError::InvalidLogging {
                reason: "default level must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid broker settings: {reason}")]
    InvalidBroker { reason: String },

    #[error("invalid replay settings: {reason}")]
    InvalidReplay { reason: String },

    #[error("invalid logging settings: {reason}")]
    InvalidLogging { reason: String },

    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Decode(#[from] serde_json::Error),
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Backtest,
    Quiet,
}

impl Environment {
    pub fn config(&self) -> SimulatorConfig {
        match self {
            Environment::Development => SimulatorConfig::default(),
            Environment::Backtest => SimulatorConfig::backtest(),
            Environment::Quiet => SimulatorConfig::quiet(),
        }
    }
}
