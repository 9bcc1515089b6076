//! Command-line interface definitions and parsing

use clap::{Parser, Subcommand, ValueEnum};
use elm_core::LogLevel;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Print every state as a JSON line
    #[arg(long)]
    pub json: bool,

    /// Message-flow logging of the runtimes (overrides the configuration)
    #[arg(long, value_enum)]
    pub flow_logging: Option<FlowLogging>,

    /// Print the example configuration and exit
    #[arg(long)]
    pub print_config: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Counter driven by '+' and '-' lines
    Counter,
    /// Two chess clocks sharing one 'click' input
    Chess {
        /// Start with the second clock running instead of the first
        #[arg(long)]
        second_starts: bool,
    },
    /// Login form with an asynchronous login and a logged-in timer
    Login,
}

/// Verbosity of the runtimes' message-flow logging
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowLogging {
    None,
    Basic,
    Full,
}

impl From<FlowLogging> for LogLevel {
    fn from(level: FlowLogging) -> Self {
        match level {
            FlowLogging::None => LogLevel::None,
            FlowLogging::Basic => LogLevel::Basic,
            FlowLogging::Full => LogLevel::Full,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chess_with_flags() {
        let cli = Cli::parse_from([
            "elm-demo",
            "--json",
            "--flow-logging",
            "basic",
            "chess",
            "--second-starts",
        ]);
        assert!(cli.json);
        assert_eq!(cli.flow_logging.map(LogLevel::from), Some(LogLevel::Basic));
        assert_eq!(cli.command, Commands::Chess { second_starts: true });
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
