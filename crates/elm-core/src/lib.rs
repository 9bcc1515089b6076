//! Elm-Architecture Component Contract
//!
//! This crate provides the types a component author works with: the
//! [`Component`] trait and its [`SimpleComponent`] restriction, command and
//! subscription streams, the replay-latest state channel, configuration,
//! errors and message-flow logging. The engine that drives components lives in
//! `elm-runtime`.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod channel;
pub mod command;
pub mod component;
pub mod config;
pub mod errors;
pub mod subscription;
pub mod task_logging;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use channel::{Inbound, MessageOrigin, StateChannel, StateStream};
pub use command::CmdStream;
pub use component::{Component, NoCmd, SimpleComponent, Update};
pub use config::{ChannelConfig, RestartPolicy, RuntimeConfig};
pub use errors::{CommandError, ElmError, ElmResult, FaultSource, Result, RuntimeFault};
pub use subscription::{BoxedSubscription, FnSubscription, MsgStream, Subscription};
pub use task_logging::{LogLevel, NoOpLogger, TaskId, TaskLogger, TracingLogger};
