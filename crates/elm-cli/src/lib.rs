//! Elm-architecture demo CLI library
//!
//! Hosts the sample components (counter, chess clocks, login form) in a
//! terminal session: input lines become messages, every published state is
//! printed, and the end of input tears the runtimes down through their
//! lifecycle bindings.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod samples;

pub use app::{DemoSession, OutputFormat, SessionReport};
pub use cli::{Cli, Commands, FlowLogging};
pub use commands::CommandDispatcher;
pub use config::AppConfig;
pub use error::{CliError, Result};
