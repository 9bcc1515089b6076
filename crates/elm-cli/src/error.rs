//! Error handling for the demo CLI

use elm_core::{ElmError, RuntimeFault};
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Runtime error: {0}")]
    Runtime(#[from] ElmError),

    #[error("Runtime '{runtime}' stopped with a fault: {fault}")]
    Fault { runtime: String, fault: RuntimeFault },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    Input(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),
}

impl CliError {
    /// Create an input error for a line that could not be parsed
    pub fn unknown_input<T: AsRef<str>>(line: T) -> Self {
        CliError::Input(format!("unrecognised input '{}', type 'help'", line.as_ref()))
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        // Alternate form keeps the cause chain: "context: cause"
        CliError::Config(format!("{:#}", err))
    }
}
