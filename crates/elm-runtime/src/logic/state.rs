//! Runtime Task State
//!
//! Contains the state owned by the sequencing task, the runtime statistics and
//! the logger wrapper.

use elm_core::task_logging::{LogLevel, NoOpLogger, TaskId, TaskLogger, TracingLogger};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ----------------------------------------------------------------------------
// Core State
// ----------------------------------------------------------------------------

/// State owned by the sequencing task
pub struct CoreState<S> {
    /// The one current state of the runtime
    pub current: Arc<S>,
    /// Number of messages applied so far
    pub sequence: u64,
}

impl<S> CoreState<S> {
    pub fn new(initial: Arc<S>) -> Self {
        Self {
            current: initial,
            sequence: 0,
        }
    }
}

// ----------------------------------------------------------------------------
// Logger Wrapper
// ----------------------------------------------------------------------------

/// Logger wrapper for object safety
#[derive(Debug, Clone)]
pub enum LoggerWrapper {
    Tracing(TracingLogger),
    NoOp(NoOpLogger),
}

impl LoggerWrapper {
    /// Pick the logger matching a runtime's log level
    pub fn for_level(level: LogLevel) -> Self {
        match level {
            LogLevel::None => LoggerWrapper::NoOp(NoOpLogger),
            level => LoggerWrapper::Tracing(TracingLogger::new(level)),
        }
    }

    pub fn log_receive<T: fmt::Debug>(&self, from: TaskId, to: TaskId, message: &T) {
        match self {
            LoggerWrapper::Tracing(logger) => logger.log_receive(from, to, message),
            LoggerWrapper::NoOp(logger) => logger.log_receive(from, to, message),
        }
    }

    pub fn log_send<T: fmt::Debug>(&self, from: TaskId, to: TaskId, command: &T) {
        match self {
            LoggerWrapper::Tracing(logger) => logger.log_send(from, to, command),
            LoggerWrapper::NoOp(logger) => logger.log_send(from, to, command),
        }
    }

    pub fn log_drop<T: fmt::Debug>(&self, from: TaskId, to: TaskId, message: &T, reason: &str) {
        match self {
            LoggerWrapper::Tracing(logger) => logger.log_drop(from, to, message, reason),
            LoggerWrapper::NoOp(logger) => logger.log_drop(from, to, message, reason),
        }
    }

    pub fn log_state<T: fmt::Debug>(&self, task: TaskId, state: &T) {
        match self {
            LoggerWrapper::Tracing(logger) => logger.log_state(task, state),
            LoggerWrapper::NoOp(logger) => logger.log_state(task, state),
        }
    }

    pub fn log_task_event(&self, task: TaskId, message: &str) {
        match self {
            LoggerWrapper::Tracing(logger) => logger.log_task_event(task, message),
            LoggerWrapper::NoOp(logger) => logger.log_task_event(task, message),
        }
    }
}

// ----------------------------------------------------------------------------
// Runtime Statistics
// ----------------------------------------------------------------------------

/// Counters of one runtime, updated from every task it owns
#[derive(Debug, Default)]
pub struct RuntimeStats {
    messages_queued: AtomicU64,
    messages_applied: AtomicU64,
    messages_discarded: AtomicU64,
    states_published: AtomicU64,
    commands_started: AtomicU64,
    commands_completed: AtomicU64,
    commands_cancelled: AtomicU64,
    subscriptions_started: AtomicU64,
    subscriptions_stopped: AtomicU64,
}

impl RuntimeStats {
    /// A message entered the inbox
    pub fn record_message_queued(&self) {
        self.messages_queued.fetch_add(1, Ordering::Relaxed);
    }

    /// A message left the inbox, or could not be enqueued after all
    pub fn record_message_dequeued(&self) {
        let _ = self
            .messages_queued
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |queued| {
                queued.checked_sub(1)
            });
    }

    pub fn record_message_applied(&self) {
        self.messages_applied.fetch_add(1, Ordering::Relaxed);
    }

    /// A message from a stale subscription instance was not applied
    pub fn record_message_discarded(&self) {
        self.messages_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_state_published(&self) {
        self.states_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_command_started(&self) {
        self.commands_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_command_completed(&self) {
        self.commands_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_commands_cancelled(&self, count: u64) {
        self.commands_cancelled.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_subscription_started(&self) {
        self.subscriptions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_subscriptions_stopped(&self, count: u64) {
        self.subscriptions_stopped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            messages_queued: self.messages_queued.load(Ordering::Relaxed),
            messages_applied: self.messages_applied.load(Ordering::Relaxed),
            messages_discarded: self.messages_discarded.load(Ordering::Relaxed),
            states_published: self.states_published.load(Ordering::Relaxed),
            commands_started: self.commands_started.load(Ordering::Relaxed),
            commands_completed: self.commands_completed.load(Ordering::Relaxed),
            commands_cancelled: self.commands_cancelled.load(Ordering::Relaxed),
            subscriptions_started: self.subscriptions_started.load(Ordering::Relaxed),
            subscriptions_stopped: self.subscriptions_stopped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`RuntimeStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Messages waiting in the inbox or being applied
    pub messages_queued: u64,
    pub messages_applied: u64,
    pub messages_discarded: u64,
    /// States published after the initial one
    pub states_published: u64,
    pub commands_started: u64,
    pub commands_completed: u64,
    pub commands_cancelled: u64,
    pub subscriptions_started: u64,
    pub subscriptions_stopped: u64,
}

impl StatsSnapshot {
    /// Subscription instances currently running
    pub fn subscriptions_running(&self) -> u64 {
        self.subscriptions_started
            .saturating_sub(self.subscriptions_stopped)
    }

    /// Command executions neither completed nor cancelled
    pub fn commands_in_flight(&self) -> u64 {
        self.commands_started
            .saturating_sub(self.commands_completed + self.commands_cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_for_level() {
        assert!(matches!(
            LoggerWrapper::for_level(LogLevel::None),
            LoggerWrapper::NoOp(_)
        ));
        match LoggerWrapper::for_level(LogLevel::Full) {
            LoggerWrapper::Tracing(logger) => assert_eq!(logger.level(), LogLevel::Full),
            other => panic!("Unexpected logger: {:?}", other),
        }
    }

    #[test]
    fn test_stats_snapshot() {
        let stats = RuntimeStats::default();
        stats.record_command_started();
        stats.record_command_started();
        stats.record_command_completed();
        stats.record_subscription_started();
        stats.record_subscriptions_stopped(1);
        stats.record_subscription_started();

        stats.record_message_queued();
        stats.record_message_dequeued();
        stats.record_message_dequeued();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.messages_queued, 0);
        assert_eq!(snapshot.commands_in_flight(), 1);
        assert_eq!(snapshot.subscriptions_running(), 1);
        assert_eq!(snapshot.messages_applied, 0);
    }
}
