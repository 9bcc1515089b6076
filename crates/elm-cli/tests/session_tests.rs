//! End-to-end tests of the demo sessions with scripted input

use elm_cli::{AppConfig, CommandDispatcher, Commands, OutputFormat};
use elm_runtime::BindingOutcome;
use futures::stream;
use serde_json::Value;

fn script(lines: &[&str]) -> impl futures::Stream<Item = String> + Send {
    stream::iter(lines.iter().map(|line| line.to_string()).collect::<Vec<_>>())
}

fn output_lines(out: Vec<u8>) -> Vec<String> {
    String::from_utf8(out)
        .expect("Output is not UTF-8")
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_counter_session_renders_every_state() {
    let (report, out) = CommandDispatcher::execute(
        &Commands::Counter,
        &AppConfig::default(),
        OutputFormat::Plain,
        script(&["+", "+", "", "bogus", "-"]),
        Vec::new(),
    )
    .await
    .expect("Session failed");

    assert_eq!(
        output_lines(out),
        vec!["counter: 0", "counter: 1", "counter: 2", "counter: 1"]
    );
    assert_eq!(report.rejected_lines, 1);
    assert_eq!(
        report.outcomes,
        vec![("counter".to_string(), Some(BindingOutcome::Destroyed))]
    );
    assert_eq!(report.stats[0].1.messages_applied, 3);
    assert!(report.into_result().is_ok());
}

#[tokio::test]
async fn test_quit_ends_the_session() {
    let (report, out) = CommandDispatcher::execute(
        &Commands::Counter,
        &AppConfig::default(),
        OutputFormat::Plain,
        script(&["+", "quit", "+", "+"]),
        Vec::new(),
    )
    .await
    .expect("Session failed");

    assert_eq!(output_lines(out), vec!["counter: 0", "counter: 1"]);
    assert_eq!(report.stats[0].1.messages_applied, 1);
}

#[tokio::test]
async fn test_chess_click_reaches_both_clocks() {
    let (report, out) = CommandDispatcher::execute(
        &Commands::Chess {
            second_starts: false,
        },
        &AppConfig::default(),
        OutputFormat::Json,
        script(&["click"]),
        Vec::new(),
    )
    .await
    .expect("Session failed");

    let states: Vec<(String, bool)> = output_lines(out)
        .iter()
        .map(|line| {
            let value: Value = serde_json::from_str(line).expect("Line is not JSON");
            (
                value["runtime"].as_str().unwrap_or_default().to_string(),
                value["state"]["is_on"].as_bool().unwrap_or_default(),
            )
        })
        .collect();

    // A slow run may add ticks; only the on/off transitions matter here
    let mut first: Vec<bool> = states
        .iter()
        .filter(|(runtime, _)| runtime == "first")
        .map(|(_, on)| *on)
        .collect();
    let mut second: Vec<bool> = states
        .iter()
        .filter(|(runtime, _)| runtime == "second")
        .map(|(_, on)| *on)
        .collect();
    first.dedup();
    second.dedup();

    assert_eq!(first, vec![true, false]);
    assert_eq!(second, vec![false, true]);
    assert_eq!(report.outcomes.len(), 2);
    assert!(report
        .stats
        .iter()
        .all(|(_, stats)| stats.subscriptions_started == 1));
}

#[tokio::test]
async fn test_login_session_waits_for_pending_login() {
    let config = AppConfig::from_toml("[login]\ndelay_ms = 20").expect("Invalid config");
    let (report, out) = CommandDispatcher::execute(
        &Commands::Login,
        &config,
        OutputFormat::Plain,
        script(&["email elm@example.com", "password architecture", "login"]),
        Vec::new(),
    )
    .await
    .expect("Session failed");

    let lines = output_lines(out);
    assert!(lines
        .iter()
        .any(|line| line.ends_with("[loading]")));
    assert_eq!(
        lines.last().map(String::as_str),
        Some("login: logged in as elm for 0s \"Welcome, elm\"")
    );
    assert_eq!(report.stats[0].1.commands_completed, 1);
}
