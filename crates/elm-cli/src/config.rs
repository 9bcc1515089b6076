//! Demo CLI Configuration Management
//!
//! Configuration is read from a TOML file given with `--config`. Every section
//! is optional and falls back to its defaults, so a file only needs to name
//! what it changes:
//!
//! ```toml
//! [runtime]
//! restart_policy = "overlap"
//!
//! [chess]
//! starting_time = 300
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use elm_core::RuntimeConfig;
use serde::{Deserialize, Serialize};

use crate::error::{CliError, Result};

// ----------------------------------------------------------------------------
// CLI Application Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the demo CLI
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration applied to every runtime the demo creates
    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub chess: ChessConfig,

    #[serde(default)]
    pub login: LoginConfig,
}

/// Terminal session behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Input lines buffered for runtimes that fall behind
    pub input_buffer: usize,
    /// How long to let pending messages and commands finish once input ends
    pub drain_timeout_ms: u64,
}

/// Chess clock sample settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChessConfig {
    /// Time each clock starts with, in ticks
    pub starting_time: u32,
    pub tick_ms: u64,
}

/// Login sample settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
    /// Simulated latency of the login service
    pub delay_ms: u64,
    /// Period of the logged-in timer
    pub timer_ms: u64,
}

// ----------------------------------------------------------------------------
// Default Implementations
// ----------------------------------------------------------------------------

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            input_buffer: 64,
            drain_timeout_ms: 2000,
        }
    }
}

impl Default for ChessConfig {
    fn default() -> Self {
        Self {
            starting_time: 1000,
            tick_ms: 1000,
        }
    }
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            delay_ms: 1000,
            timer_ms: 1000,
        }
    }
}

impl SessionConfig {
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

impl ChessConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

impl LoginConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn timer_period(&self) -> Duration {
        Duration::from_millis(self.timer_ms)
    }
}

// ----------------------------------------------------------------------------
// Configuration Loading Logic
// ----------------------------------------------------------------------------

impl AppConfig {
    /// Load and validate configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = Self::from_toml(&contents)?;
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<()> {
        self.runtime.validate().map_err(CliError::Config)?;

        if self.session.input_buffer == 0 {
            return Err(CliError::Config(
                "Session input buffer must be greater than 0".to_string(),
            ));
        }
        if self.chess.tick_ms == 0 {
            return Err(CliError::Config(
                "Chess tick must be greater than 0".to_string(),
            ));
        }
        if self.login.timer_ms == 0 {
            return Err(CliError::Config(
                "Login timer period must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// The default configuration rendered as TOML
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| "# Failed to generate example config".to_string())
    }
}
