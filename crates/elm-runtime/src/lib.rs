//! Elm-Architecture Runtime Engine
//!
//! This crate drives components defined with `elm-core`:
//! - `ComponentRuntime`: the host-facing handle (dispatch, state stream, teardown)
//! - `RuntimeTask`: the sequencing task applying messages one at a time
//! - Command executor and subscription manager
//! - Lifecycle binding and the keyed runtime store
//!
//! `elm-core` defines what a component is; this crate is what runs it.

pub mod builder;
pub mod lifecycle;
pub mod logic;
pub mod managers;
mod runtime;
mod tasks;

pub use builder::{create_runtime_for, create_test_runtime, RuntimeBuilder};
pub use lifecycle::{
    BindingOutcome, HostLifecycle, LifecycleBinder, LifecycleBinding, LifecycleEvent,
    RuntimeStore,
};
pub use logic::StatsSnapshot;
pub use runtime::*;

// Re-export core types for convenience
pub use elm_core::{
    channel::StateStream, command, subscription, CmdStream, Component, ElmError, ElmResult,
    LogLevel, MsgStream, NoCmd, RestartPolicy, RuntimeConfig, RuntimeFault, SimpleComponent,
    Subscription, Update,
};
