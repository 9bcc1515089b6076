//! Elm-architecture demo CLI entry point

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use elm_cli::{
    app::OutputFormat,
    cli::Cli,
    commands::{terminal_input, CommandDispatcher},
    config::AppConfig,
    error::Result,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    setup_logging(cli.verbose);

    if cli.print_config {
        println!("{}", AppConfig::example_config());
        return Ok(());
    }

    // Load configuration
    let mut config = load_configuration(&cli)?;
    if let Some(level) = cli.flow_logging {
        config.runtime.log_level = level.into();
    }

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Plain
    };

    let outcome = CommandDispatcher::execute(
        &cli.command,
        &config,
        format,
        terminal_input(),
        std::io::stdout(),
    )
    .await
    .and_then(|(report, _)| report.into_result());

    // Exit explicitly: a blocked stdin read would otherwise hold the executor open
    match outcome {
        Ok(report) => {
            for (runtime, stats) in &report.stats {
                info!(
                    "Runtime '{}': {} message(s) applied, {} state(s) published",
                    runtime, stats.messages_applied, stats.states_published
                );
            }
            std::process::exit(0);
        }
        Err(e) => {
            error!("Demo failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Setup logging on stderr; stdout carries the rendered states
fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// Load configuration from file or use defaults
fn load_configuration(cli: &Cli) -> Result<AppConfig> {
    if let Some(config_path) = &cli.config {
        info!("Loading configuration from: {}", config_path);
        AppConfig::load_from_file(config_path)
    } else {
        info!("Using default configuration");
        Ok(AppConfig::default())
    }
}
