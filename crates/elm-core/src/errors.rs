//! Error types for the component runtime
//!
//! This module contains every error type shared between the authoring contract
//! and the runtime engine: construction errors surfaced synchronously to the
//! host, errors escaping a command stream, and the fatal faults reported on a
//! runtime's fault channel.

use thiserror::Error;

// ----------------------------------------------------------------------------
// Specific Error Types
// ----------------------------------------------------------------------------

/// Error escaping a command stream
///
/// Commands are expected to turn their own failures into messages (see
/// [`crate::command::perform`]). A `CommandError` yielded by a command stream
/// is an unhandled failure and is fatal to the runtime that executed it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Command failed: {reason}")]
    Failed { reason: String },
}

impl CommandError {
    /// Create a generic command failure
    pub fn failed<T: Into<String>>(reason: T) -> Self {
        CommandError::Failed {
            reason: reason.into(),
        }
    }
}

/// Identifies the work unit a fault originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultSource {
    Transition,
    Command(u64),
    Subscription(usize),
}

/// Fatal fault of a runtime instance
///
/// A runtime that reports a fault has already torn itself down: it never applies
/// another message against a possibly inconsistent state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeFault {
    #[error("Transition function panicked while applying {message}: {reason}")]
    TransitionPanicked { message: String, reason: String },

    #[error("Command #{command_id} let an error escape: {error}")]
    CommandFailed { command_id: u64, error: CommandError },

    #[error("Command #{command_id} panicked: {reason}")]
    CommandPanicked { command_id: u64, reason: String },

    #[error("Subscription #{index} panicked: {reason}")]
    SubscriptionPanicked { index: usize, reason: String },
}

impl RuntimeFault {
    /// Where the fault was raised
    pub fn source(&self) -> FaultSource {
        match self {
            RuntimeFault::TransitionPanicked { .. } => FaultSource::Transition,
            RuntimeFault::CommandFailed { command_id, .. }
            | RuntimeFault::CommandPanicked { command_id, .. } => FaultSource::Command(*command_id),
            RuntimeFault::SubscriptionPanicked { index, .. } => FaultSource::Subscription(*index),
        }
    }

    /// Render a caught panic payload as text
    pub fn panic_reason(payload: &(dyn std::any::Any + Send)) -> String {
        if let Some(text) = payload.downcast_ref::<&str>() {
            (*text).to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "non-string panic payload".to_string()
        }
    }
}

// ----------------------------------------------------------------------------
// Main Error Type
// ----------------------------------------------------------------------------

/// Errors reported synchronously to the host
#[derive(Debug, Error)]
pub enum ElmError {
    /// Configuration rejected at construction time
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    /// The runtime was constructed outside of an async executor
    #[error("No async executor available: {reason}")]
    NoExecutor { reason: String },

    /// The runtime stopped because of a fatal fault
    #[error("Runtime fault: {0}")]
    Fault(#[from] RuntimeFault),
}

// ----------------------------------------------------------------------------
// Convenience Error Constructors
// ----------------------------------------------------------------------------

impl ElmError {
    /// Create a configuration error with a reason
    pub fn config_error<T: Into<String>>(reason: T) -> Self {
        ElmError::Configuration {
            reason: reason.into(),
        }
    }

    /// Create a missing executor error with a reason
    pub fn no_executor<T: Into<String>>(reason: T) -> Self {
        ElmError::NoExecutor {
            reason: reason.into(),
        }
    }
}

// ----------------------------------------------------------------------------
// Type Aliases
// ----------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, ElmError>;
pub type ElmResult<T> = Result<T>;
