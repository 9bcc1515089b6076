//! Centralized Configuration Management
//!
//! Consolidates the configuration structures used by a component runtime:
//! channel sizing, subscription restart ordering and message-flow logging.

use crate::task_logging::LogLevel;
use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Channel Configuration
// ----------------------------------------------------------------------------

/// Configuration for the runtime's channel buffers
///
/// The inbox feeding the sequencing task is unbounded so that `dispatch` never
/// blocks; only the state fan-out is bounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Number of state snapshots buffered per observer before it starts lagging
    pub state_buffer_size: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            state_buffer_size: 64, // Renderers are fast synchronous consumers
        }
    }
}

impl ChannelConfig {
    /// Create configuration for low-memory environments
    pub fn low_memory() -> Self {
        Self {
            state_buffer_size: 16,
        }
    }

    /// Create configuration optimized for testing
    pub fn testing() -> Self {
        Self {
            state_buffer_size: 1024, // Tests read whole state histories
        }
    }
}

// ----------------------------------------------------------------------------
// Subscription Restart Policy
// ----------------------------------------------------------------------------

/// Ordering used when a running subscription has to be restarted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartPolicy {
    /// Stop the old instance, then start the new one. Messages still queued from
    /// the old instance are discarded.
    #[default]
    StopThenStart,
    /// Start the new instance, then stop the old one. Messages already queued by
    /// the old instance are still applied.
    Overlap,
}

// ----------------------------------------------------------------------------
// Runtime Configuration
// ----------------------------------------------------------------------------

/// Complete configuration of one component runtime
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub channels: ChannelConfig,
    #[serde(default)]
    pub restart_policy: RestartPolicy,
    #[serde(default)]
    pub log_level: LogLevel,
}

impl RuntimeConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create configuration for low-memory environments
    pub fn low_memory() -> Self {
        Self {
            channels: ChannelConfig::low_memory(),
            ..Self::default()
        }
    }

    /// Create configuration optimized for testing
    pub fn testing() -> Self {
        Self {
            channels: ChannelConfig::testing(),
            restart_policy: RestartPolicy::StopThenStart,
            log_level: LogLevel::Full,
        }
    }

    /// Builder method for customizing channel configuration
    pub fn with_channels(mut self, channels: ChannelConfig) -> Self {
        self.channels = channels;
        self
    }

    /// Builder method for customizing the restart policy
    pub fn with_restart_policy(mut self, restart_policy: RestartPolicy) -> Self {
        self.restart_policy = restart_policy;
        self
    }

    /// Builder method for customizing message-flow logging
    pub fn with_log_level(mut self, log_level: LogLevel) -> Self {
        self.log_level = log_level;
        self
    }

    /// Validate the configuration for consistency and feasibility
    pub fn validate(&self) -> Result<(), String> {
        if self.channels.state_buffer_size == 0 {
            return Err("State buffer size cannot be zero".into());
        }
        // tokio's broadcast channel rejects capacities above usize::MAX / 2
        if self.channels.state_buffer_size > usize::MAX / 2 {
            return Err("State buffer size is too large".into());
        }
        Ok(())
    }
}
