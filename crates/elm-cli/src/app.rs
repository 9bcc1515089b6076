//! Terminal session hosting sample runtimes
//!
//! A [`DemoSession`] owns one or more runtimes of the same component, keyed in
//! a [`RuntimeStore`]. Input lines are parsed into messages and published on
//! one shared stream that every runtime consumes. Every published state is
//! rendered as an output line. When the input ends the session drains pending
//! work and reports `Destroyed` to all lifecycle bindings.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use elm_runtime::{
    BindingOutcome, Component, ComponentRuntime, LifecycleBinder, LifecycleEvent, RuntimeConfig,
    RuntimeFault, RuntimeStore, StatsSnapshot,
};
use futures::future::join_all;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{CliError, Result};

const DRAIN_POLL: Duration = Duration::from_millis(5);

// ----------------------------------------------------------------------------
// Output
// ----------------------------------------------------------------------------

/// How states are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// `label: state` using the state's `Display`
    Plain,
    /// One JSON object per line
    Json,
}

#[derive(Serialize)]
struct StateLine<'a, S> {
    runtime: &'a str,
    state: &'a S,
}

#[derive(Serialize)]
struct StatsLine<'a> {
    runtime: &'a str,
    running: bool,
    stats: &'a StatsSnapshot,
}

fn format_state<S>(format: OutputFormat, runtime: &str, state: &S) -> Result<String>
where
    S: Serialize + fmt::Display,
{
    match format {
        OutputFormat::Plain => Ok(format!("{}: {}", runtime, state)),
        OutputFormat::Json => Ok(serde_json::to_string(&StateLine { runtime, state })?),
    }
}

fn format_stats(
    format: OutputFormat,
    runtime: &str,
    running: bool,
    stats: &StatsSnapshot,
) -> Result<String> {
    match format {
        OutputFormat::Plain => Ok(format!(
            "{}: {} applied, {} published, {} commands ({} in flight), {} subscriptions running{}",
            runtime,
            stats.messages_applied,
            stats.states_published,
            stats.commands_started,
            stats.commands_in_flight(),
            stats.subscriptions_running(),
            if running { "" } else { " [stopped]" }
        )),
        OutputFormat::Json => Ok(serde_json::to_string(&StatsLine {
            runtime,
            running,
            stats,
        })?),
    }
}

// ----------------------------------------------------------------------------
// Session Input
// ----------------------------------------------------------------------------

/// One classified input line
#[derive(Debug, PartialEq)]
enum SessionInput<M> {
    Message(M),
    Help,
    Stats,
    Quit,
    Blank,
}

fn classify<M>(line: &str, parser: fn(&str) -> Result<M>) -> Result<SessionInput<M>> {
    match line.trim() {
        "" => Ok(SessionInput::Blank),
        "help" | "?" => Ok(SessionInput::Help),
        "stats" => Ok(SessionInput::Stats),
        "quit" | "exit" => Ok(SessionInput::Quit),
        other => parser(other).map(SessionInput::Message),
    }
}

/// Broadcast receiver as a stream; lagging receivers skip what they missed
fn shared_input<M: Clone + Send + 'static>(receiver: broadcast::Receiver<M>) -> impl Stream<Item = M> {
    stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(msg) => return Some((msg, receiver)),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Runtime input lagged, skipped {} line(s)", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}

// ----------------------------------------------------------------------------
// Session Report
// ----------------------------------------------------------------------------

/// What happened to each runtime of a finished session
#[derive(Debug, Clone, Default)]
pub struct SessionReport {
    pub outcomes: Vec<(String, Option<BindingOutcome>)>,
    pub stats: Vec<(String, StatsSnapshot)>,
    pub faults: Vec<(String, RuntimeFault)>,
    /// Input lines that could not be parsed
    pub rejected_lines: usize,
}

impl SessionReport {
    /// Fail with the first fault, if any runtime stopped with one
    pub fn into_result(self) -> Result<Self> {
        match self.faults.first() {
            Some((runtime, fault)) => Err(CliError::Fault {
                runtime: runtime.clone(),
                fault: fault.clone(),
            }),
            None => Ok(self),
        }
    }
}

// ----------------------------------------------------------------------------
// Demo Session
// ----------------------------------------------------------------------------

/// Runtimes of one sample component driven by line input
pub struct DemoSession<C: Component> {
    help: &'static str,
    parser: fn(&str) -> Result<C::Msg>,
    store: RuntimeStore<C>,
    keys: Vec<String>,
    format: OutputFormat,
    config: SessionConfig,
}

impl<C> DemoSession<C>
where
    C: Component,
    C::Msg: Clone,
    C::State: Serialize + fmt::Display,
{
    pub fn new(
        help: &'static str,
        parser: fn(&str) -> Result<C::Msg>,
        runtime_config: RuntimeConfig,
        config: SessionConfig,
        format: OutputFormat,
    ) -> Self {
        Self {
            help,
            parser,
            store: RuntimeStore::with_config(runtime_config),
            keys: Vec::new(),
            format,
            config,
        }
    }

    /// Create the runtime shown under `key`
    pub fn add_runtime<F>(&mut self, key: &str, make: F) -> Result<&ComponentRuntime<C>>
    where
        F: FnOnce() -> C,
    {
        if !self.keys.iter().any(|existing| existing == key) {
            self.keys.push(key.to_string());
        }
        Ok(self.store.get_or_create(key, make)?)
    }

    pub fn runtime(&self, key: &str) -> Option<&ComponentRuntime<C>> {
        self.store.get(key)
    }

    fn runtimes(&self) -> impl Iterator<Item = (&str, &ComponentRuntime<C>)> {
        self.keys
            .iter()
            .filter_map(|key| self.store.get(key).map(|runtime| (key.as_str(), runtime)))
    }

    /// Drive the runtimes with `input` until it ends, a `quit` line, or every
    /// runtime stopped; rendered lines are written to `out`
    pub async fn run<I, W>(mut self, input: I, out: W) -> Result<(SessionReport, W)>
    where
        I: Stream<Item = String> + Send,
        W: std::io::Write + Send + 'static,
    {
        if self.keys.is_empty() {
            return Err(CliError::Config("Session has no runtimes".to_string()));
        }

        let (lines, line_receiver) = mpsc::unbounded_channel::<String>();
        let writer = tokio::spawn(write_lines(line_receiver, out));

        let (input_sender, _) = broadcast::channel::<C::Msg>(self.config.input_buffer);
        let (host, lifecycle) = watch::channel(LifecycleEvent::Created);

        let mut bindings = Vec::new();
        let mut views = Vec::new();
        for (key, runtime) in self.runtimes() {
            runtime.dispatch_stream(shared_input(input_sender.subscribe()));
            bindings.push((key.to_string(), LifecycleBinder::bind(runtime, lifecycle.clone())));

            let label = key.to_string();
            views.push(
                runtime
                    .state()
                    .map(move |state| (label.clone(), state))
                    .boxed(),
            );
            info!("Runtime {} started as '{}'", runtime.id(), key);
        }
        let renderer = tokio::spawn(render_states(views, self.format, lines.clone()));

        let (sent, rejected_lines) = self.read_input(input, &input_sender, &lines).await;
        self.drain(&input_sender).await;

        let _ = host.send(LifecycleEvent::Destroyed);
        let mut report = SessionReport {
            rejected_lines,
            ..SessionReport::default()
        };
        for (key, binding) in bindings {
            let outcome = binding.finished().await;
            debug!("Binding of '{}' ended: {:?}", key, outcome);
            report.outcomes.push((key, outcome));
        }
        for (key, runtime) in self.runtimes() {
            report.stats.push((key.to_string(), runtime.stats()));
            if let Some(fault) = runtime.fault() {
                report.faults.push((key.to_string(), fault));
            }
        }
        info!(
            "Session ended after {} message(s), {} rejected line(s)",
            sent, rejected_lines
        );

        // State streams end with teardown, which stops the renderer
        if let Err(e) = renderer.await {
            warn!("State renderer failed: {}", e);
        }
        self.store.clear();
        drop(lines);
        let out = writer
            .await
            .map_err(|e| CliError::Io(std::io::Error::other(e)))??;
        Ok((report, out))
    }

    /// Read input lines until the session should end
    async fn read_input<I>(
        &self,
        input: I,
        input_sender: &broadcast::Sender<C::Msg>,
        lines: &mpsc::UnboundedSender<String>,
    ) -> (u64, usize)
    where
        I: Stream<Item = String> + Send,
    {
        let all_stopped = join_all(self.runtimes().map(|(_, runtime)| runtime.wait_for_fault()));
        tokio::pin!(all_stopped);
        tokio::pin!(input);

        let mut sent = 0u64;
        let mut rejected = 0usize;
        loop {
            let line = tokio::select! {
                line = input.next() => line,
                _ = &mut all_stopped => {
                    info!("Every runtime stopped, ending session");
                    break;
                }
            };
            let Some(line) = line else {
                debug!("Input ended");
                break;
            };

            match classify(&line, self.parser) {
                Ok(SessionInput::Blank) => {}
                Ok(SessionInput::Help) => {
                    let _ = lines.send(self.help.to_string());
                }
                Ok(SessionInput::Stats) => {
                    for (key, runtime) in self.runtimes() {
                        match format_stats(self.format, key, runtime.is_running(), &runtime.stats()) {
                            Ok(line) => {
                                let _ = lines.send(line);
                            }
                            Err(e) => warn!("Failed to render stats: {}", e),
                        }
                    }
                }
                Ok(SessionInput::Quit) => break,
                Ok(SessionInput::Message(msg)) => {
                    if input_sender.send(msg).is_err() {
                        warn!("No runtime is accepting input, ending session");
                        break;
                    }
                    sent += 1;
                }
                Err(e) => {
                    rejected += 1;
                    warn!("{}", e);
                }
            }
        }
        (sent, rejected)
    }

    /// Let queued messages and running commands finish, within the timeout
    async fn drain(&self, input_sender: &broadcast::Sender<C::Msg>) {
        let settled = async {
            loop {
                let busy = !input_sender.is_empty()
                    || self.runtimes().any(|(_, runtime)| {
                        let stats = runtime.stats();
                        runtime.is_running()
                            && (stats.messages_queued > 0 || stats.commands_in_flight() > 0)
                    });
                if !busy {
                    return;
                }
                tokio::time::sleep(DRAIN_POLL).await;
            }
        };
        if tokio::time::timeout(self.config.drain_timeout(), settled)
            .await
            .is_err()
        {
            warn!(
                "Pending work did not finish within {:?}, tearing down anyway",
                self.config.drain_timeout()
            );
        }
    }
}

/// Render every state of every runtime until all state streams end
async fn render_states<S>(
    views: Vec<BoxStream<'static, (String, Arc<S>)>>,
    format: OutputFormat,
    lines: mpsc::UnboundedSender<String>,
) where
    S: Serialize + fmt::Display + Send + Sync + 'static,
{
    let mut views = stream::select_all(views);
    while let Some((runtime, state)) = views.next().await {
        match format_state(format, &runtime, &*state) {
            Ok(line) => {
                if lines.send(line).is_err() {
                    return;
                }
            }
            Err(e) => warn!("Failed to render state of '{}': {}", runtime, e),
        }
    }
}

/// Write lines to `out` until every sender is gone
async fn write_lines<W: std::io::Write>(
    mut lines: mpsc::UnboundedReceiver<String>,
    mut out: W,
) -> Result<W> {
    while let Some(line) = lines.recv().await {
        writeln!(out, "{}", line)?;
        out.flush()?;
    }
    Ok(out)
}
