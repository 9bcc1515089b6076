//! Core Logic Module
//!
//! This module contains the sequencing task split into focused components:
//! - `state`: state owned by the task, statistics and the logger wrapper
//! - `task`: the `RuntimeTask` loop applying messages one at a time
//!
//! ## Serialization Point
//!
//! Every message of a runtime, whatever produced it, passes through one
//! `RuntimeTask` that exclusively owns the current state. Transitions never
//! overlap and are applied in inbox order. Commands, subscriptions and
//! attached streams run as separate tasks and only ever reach the state by
//! sending a message into the inbox.

pub mod state;
pub mod task;

pub use state::{CoreState, LoggerWrapper, RuntimeStats, StatsSnapshot};
pub use task::RuntimeTask;
