//! Engine configuration.
//!
//! Loaded from environment variables with defaults suitable for local
//! development.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Title given to the default pipeline of every new workspace.
    pub default_pipeline_title: String,

    /// How long a unit of work waits for its scope locks, in milliseconds.
    pub lock_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_pipeline_title: "Client assignment/discussion".to_string(),
            lock_timeout_ms: 5_000,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `BOARD_DEFAULT_PIPELINE_TITLE`: default pipeline title
    ///   (default: "Client assignment/discussion")
    /// - `BOARD_LOCK_TIMEOUT_MS`: scope lock timeout (default: 5000)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            default_pipeline_title: std::env::var("BOARD_DEFAULT_PIPELINE_TITLE")
                .unwrap_or(default.default_pipeline_title),
            lock_timeout_ms: std::env::var("BOARD_LOCK_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.lock_timeout_ms),
        }
    }

    /// Set the default pipeline title.
    pub fn with_default_pipeline_title(mut self, title: impl Into<String>) -> Self {
        self.default_pipeline_title = title.into();
        self
    }

    /// Set the lock timeout.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Scope lock timeout as a [`Duration`].
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_pipeline_title.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "BOARD_DEFAULT_PIPELINE_TITLE".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.lock_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "BOARD_LOCK_TIMEOUT_MS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
