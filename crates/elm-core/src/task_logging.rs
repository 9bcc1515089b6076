//! Task Communication Logging Infrastructure
//!
//! Structured logging of the message flow between the sequencing task, the
//! host, command executions and subscriptions. Output goes through `tracing`.

use serde::{Deserialize, Serialize};
use std::fmt;

// ----------------------------------------------------------------------------
// Log Event Types
// ----------------------------------------------------------------------------

/// Verbosity of message-flow logging for one runtime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Nothing is logged
    #[default]
    None,
    /// Messages and commands are logged
    Basic,
    /// Messages, commands and every published state are logged
    Full,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::None => write!(f, "NONE"),
            LogLevel::Basic => write!(f, "BASIC"),
            LogLevel::Full => write!(f, "FULL"),
        }
    }
}

/// Task identifiers for communication logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskId {
    /// The sequencing task owning the state
    Runtime,
    /// Direct `dispatch` callers
    Host,
    /// A command execution
    Command(u64),
    /// A running subscription instance, by declaration index
    Subscription(usize),
    /// An external message stream attached with `dispatch_stream`
    Source(u64),
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskId::Runtime => write!(f, "Runtime"),
            TaskId::Host => write!(f, "Host"),
            TaskId::Command(id) => write!(f, "Command(#{})", id),
            TaskId::Subscription(index) => write!(f, "Subscription(#{})", index),
            TaskId::Source(id) => write!(f, "Source(#{})", id),
        }
    }
}

/// Communication direction for channel messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Send,
    Receive,
    Drop,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Send => write!(f, "→"),
            Direction::Receive => write!(f, "←"),
            Direction::Drop => write!(f, "✗"),
        }
    }
}

// ----------------------------------------------------------------------------
// Logger Implementation
// ----------------------------------------------------------------------------

/// Task communication logger
pub trait TaskLogger {
    /// A message reached the sequencing task
    fn log_receive<T: fmt::Debug>(&self, from: TaskId, to: TaskId, message: &T);

    /// A command was handed to the command executor
    fn log_send<T: fmt::Debug>(&self, from: TaskId, to: TaskId, command: &T);

    /// A message was discarded without reaching the transition function
    fn log_drop<T: fmt::Debug>(&self, from: TaskId, to: TaskId, message: &T, reason: &str);

    /// A new state was published
    fn log_state<T: fmt::Debug>(&self, task: TaskId, state: &T);

    fn log_task_event(&self, task: TaskId, message: &str);
}

/// Logger emitting `tracing` events filtered by a [`LogLevel`]
#[derive(Debug, Clone)]
pub struct TracingLogger {
    level: LogLevel,
}

impl TracingLogger {
    pub fn new(level: LogLevel) -> Self {
        Self { level }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    fn should_log(&self, level: LogLevel) -> bool {
        self.level != LogLevel::None && self.level >= level
    }
}

impl TaskLogger for TracingLogger {
    fn log_receive<T: fmt::Debug>(&self, from: TaskId, to: TaskId, message: &T) {
        if !self.should_log(LogLevel::Basic) {
            return;
        }
        tracing::debug!("{} {} {} msg:{:?}", to, Direction::Receive, from, message);
    }

    fn log_send<T: fmt::Debug>(&self, from: TaskId, to: TaskId, command: &T) {
        if !self.should_log(LogLevel::Basic) {
            return;
        }
        tracing::debug!("{} {} {} cmd:{:?}", from, Direction::Send, to, command);
    }

    fn log_drop<T: fmt::Debug>(&self, from: TaskId, to: TaskId, message: &T, reason: &str) {
        if !self.should_log(LogLevel::Basic) {
            return;
        }
        tracing::warn!(
            "{} {} {} msg:{:?} reason:{}",
            from,
            Direction::Drop,
            to,
            message,
            reason
        );
    }

    fn log_state<T: fmt::Debug>(&self, task: TaskId, state: &T) {
        if !self.should_log(LogLevel::Full) {
            return;
        }
        tracing::debug!("{} state:{:?}", task, state);
    }

    fn log_task_event(&self, task: TaskId, message: &str) {
        if !self.should_log(LogLevel::Basic) {
            return;
        }
        tracing::info!("{} {}", task, message);
    }
}

/// No-op logger for when message-flow logging is disabled
#[derive(Debug, Clone)]
pub struct NoOpLogger;

impl TaskLogger for NoOpLogger {
    fn log_receive<T: fmt::Debug>(&self, _from: TaskId, _to: TaskId, _message: &T) {}

    fn log_send<T: fmt::Debug>(&self, _from: TaskId, _to: TaskId, _command: &T) {}

    fn log_drop<T: fmt::Debug>(&self, _from: TaskId, _to: TaskId, _message: &T, _reason: &str) {}

    fn log_state<T: fmt::Debug>(&self, _task: TaskId, _state: &T) {}

    fn log_task_event(&self, _task: TaskId, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_display() {
        assert_eq!(format!("{}", TaskId::Runtime), "Runtime");
        assert_eq!(format!("{}", TaskId::Command(3)), "Command(#3)");
        assert_eq!(format!("{}", TaskId::Subscription(0)), "Subscription(#0)");
    }

    #[test]
    fn test_tracing_logger_level_filtering() {
        let logger = TracingLogger::new(LogLevel::Basic);
        assert!(logger.should_log(LogLevel::Basic));
        assert!(!logger.should_log(LogLevel::Full));

        let logger = TracingLogger::new(LogLevel::Full);
        assert!(logger.should_log(LogLevel::Basic));
        assert!(logger.should_log(LogLevel::Full));

        let logger = TracingLogger::new(LogLevel::None);
        assert!(!logger.should_log(LogLevel::Basic));
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::None < LogLevel::Basic);
        assert!(LogLevel::Basic < LogLevel::Full);
        assert_eq!(LogLevel::Full.to_string(), "FULL");
    }
}
