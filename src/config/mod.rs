//! Configuration management for utilp
//!
//! [`UtilpConfig`] merges the embedded defaults, user and repository TOML
//! files and `UTILP_*` environment variables with figment. [`Settings`] is
//! the typed result, convertible into the runtime configs of the reducer
//! and the print logger.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::logging::LoggerConfig;
use crate::reducer::{DEFAULT_MAX_BACKOFF, DEFAULT_REPORT_INTERVAL, ReducerConfig, WaitStrategy};
use crate::utils::expand_home;

mod core;

pub use self::core::UtilpConfig;

/// Main configuration structure for utilp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub reducer: ReducerSettings,
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log directory, `~` is expanded. Unset means `~/utilp_logs`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            dir: None,
            file_prefix: LoggerConfig::DEFAULT_PREFIX.to_string(),
        }
    }
}

impl LoggingSettings {
    pub fn to_logger_config(&self) -> LoggerConfig {
        let mut config = LoggerConfig::default();
        if let Some(dir) = &self.dir {
            config.dir = expand_home(dir);
        }
        config.file_prefix = self.file_prefix.clone();
        config
    }
}

/// `[reducer]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReducerSettings {
    pub verbose: bool,
    pub interval: usize,
    pub poll: bool,
    pub max_backoff_ms: u64,
}

impl Default for ReducerSettings {
    fn default() -> Self {
        Self {
            verbose: false,
            interval: DEFAULT_REPORT_INTERVAL,
            poll: false,
            max_backoff_ms: DEFAULT_MAX_BACKOFF.as_millis() as u64,
        }
    }
}

impl ReducerSettings {
    pub fn to_reducer_config(&self) -> ReducerConfig {
        let wait = if self.poll {
            WaitStrategy::Polling {
                max_backoff: Duration::from_millis(self.max_backoff_ms),
            }
        } else {
            WaitStrategy::Blocking
        };
        ReducerConfig {
            verbose: self.verbose,
            interval: self.interval,
            wait,
        }
    }
}
