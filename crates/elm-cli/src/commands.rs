//! Command handlers for the demo CLI

use futures::stream::{self, Stream, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::app::{DemoSession, OutputFormat, SessionReport};
use crate::cli::Commands;
use crate::config::AppConfig;
use crate::error::Result;
use crate::samples::{chess, counter, login, ChessTimerComponent, CounterComponent, LoginComponent};

/// Command dispatcher for handling CLI commands
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Run the sample selected by `command` until `input` ends
    pub async fn execute<I, W>(
        command: &Commands,
        config: &AppConfig,
        format: OutputFormat,
        input: I,
        out: W,
    ) -> Result<(SessionReport, W)>
    where
        I: Stream<Item = String> + Send,
        W: std::io::Write + Send + 'static,
    {
        match command {
            Commands::Counter => Self::handle_counter_command(config, format, input, out).await,
            Commands::Chess { second_starts } => {
                Self::handle_chess_command(config, format, *second_starts, input, out).await
            }
            Commands::Login => Self::handle_login_command(config, format, input, out).await,
        }
    }

    async fn handle_counter_command<I, W>(
        config: &AppConfig,
        format: OutputFormat,
        input: I,
        out: W,
    ) -> Result<(SessionReport, W)>
    where
        I: Stream<Item = String> + Send,
        W: std::io::Write + Send + 'static,
    {
        let mut session = DemoSession::new(
            counter::HELP,
            counter::parse_message,
            config.runtime.clone(),
            config.session.clone(),
            format,
        );
        session.add_runtime("counter", || CounterComponent)?;
        session.run(input, out).await
    }

    /// Two clocks fed by the same click stream
    async fn handle_chess_command<I, W>(
        config: &AppConfig,
        format: OutputFormat,
        second_starts: bool,
        input: I,
        out: W,
    ) -> Result<(SessionReport, W)>
    where
        I: Stream<Item = String> + Send,
        W: std::io::Write + Send + 'static,
    {
        let mut session = DemoSession::new(
            chess::HELP,
            chess::parse_message,
            config.runtime.clone(),
            config.session.clone(),
            format,
        );
        session.add_runtime("first", || {
            ChessTimerComponent::new(!second_starts, &config.chess)
        })?;
        session.add_runtime("second", || {
            ChessTimerComponent::new(second_starts, &config.chess)
        })?;
        session.run(input, out).await
    }

    async fn handle_login_command<I, W>(
        config: &AppConfig,
        format: OutputFormat,
        input: I,
        out: W,
    ) -> Result<(SessionReport, W)>
    where
        I: Stream<Item = String> + Send,
        W: std::io::Write + Send + 'static,
    {
        let mut session = DemoSession::new(
            login::HELP,
            login::parse_message,
            config.runtime.clone(),
            config.session.clone(),
            format,
        );
        session.add_runtime("login", || LoginComponent::new(&config.login))?;
        session.run(input, out).await
    }
}

/// Lines read from stdin until EOF
pub fn stdin_lines() -> impl Stream<Item = String> + Send {
    let lines = BufReader::new(tokio::io::stdin()).lines();
    stream::unfold(lines, |mut lines| async move {
        match lines.next_line().await {
            Ok(Some(line)) => Some((line, lines)),
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read input: {}", e);
                None
            }
        }
    })
}

/// Terminal input: stdin lines until EOF or Ctrl-C
pub fn terminal_input() -> impl Stream<Item = String> + Send {
    stdin_lines().take_until(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received interrupt, shutting down"),
            Err(e) => {
                warn!("Cannot listen for interrupts: {}", e);
                futures::future::pending::<()>().await;
            }
        }
    })
}
