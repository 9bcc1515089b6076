//! Chess clock sample
//!
//! Two clocks share one input: every click toggles both, so exactly one of
//! them is running at any time. Each clock ticks once per period while on.

use elm_runtime::subscription::{every, BoxedSubscription, FnSubscription};
use elm_runtime::SimpleComponent;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::config::ChessConfig;
use crate::error::{CliError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChessTimerState {
    pub time: u32,
    pub is_on: bool,
}

impl fmt::Display for ChessTimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.is_on { "on" } else { "off" };
        write!(f, "{} ({})", self.time, status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChessTimerMsg {
    Click,
    Tick,
}

pub struct ChessTimerComponent {
    starting_is_on: bool,
    starting_time: u32,
    tick: Duration,
}

impl ChessTimerComponent {
    pub fn new(starting_is_on: bool, config: &ChessConfig) -> Self {
        Self {
            starting_is_on,
            starting_time: config.starting_time,
            tick: config.tick(),
        }
    }
}

impl SimpleComponent for ChessTimerComponent {
    type State = ChessTimerState;
    type Msg = ChessTimerMsg;

    fn init_state(&self) -> ChessTimerState {
        ChessTimerState {
            time: self.starting_time,
            is_on: self.starting_is_on,
        }
    }

    fn simple_update(&self, msg: ChessTimerMsg, prev: &ChessTimerState) -> ChessTimerState {
        match msg {
            ChessTimerMsg::Click => ChessTimerState {
                is_on: !prev.is_on,
                ..prev.clone()
            },
            // A flagged clock stays at zero
            ChessTimerMsg::Tick => ChessTimerState {
                time: prev.time.saturating_sub(1),
                ..prev.clone()
            },
        }
    }

    fn subscriptions(&self) -> Vec<BoxedSubscription<ChessTimerState, ChessTimerMsg>> {
        let tick = self.tick;
        vec![FnSubscription::new("timer", move |_: &ChessTimerState| {
            every(tick, || ChessTimerMsg::Tick)
        })
        .active_when(|state: &ChessTimerState| state.is_on)
        .distinct_when(|prev: &ChessTimerState, next: &ChessTimerState| {
            prev.is_on != next.is_on
        })
        .boxed()]
    }
}

pub const HELP: &str = "'click' (or 'c') hands the move to the other clock";

pub fn parse_message(line: &str) -> Result<ChessTimerMsg> {
    match line {
        "click" | "c" => Ok(ChessTimerMsg::Click),
        other => Err(CliError::unknown_input(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elm_runtime::RuntimeBuilder;

    fn config() -> ChessConfig {
        ChessConfig {
            starting_time: 1000,
            tick_ms: 1000,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_pauses_and_resumes() {
        let runtime = RuntimeBuilder::new(ChessTimerComponent::new(true, &config()))
            .build()
            .unwrap();

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(runtime.current_state().time, 998);

        runtime.dispatch(ChessTimerMsg::Click);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(
            *runtime.current_state(),
            ChessTimerState {
                time: 998,
                is_on: false
            }
        );

        runtime.dispatch(ChessTimerMsg::Click);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(runtime.current_state().time, 997);
    }

    #[test]
    fn test_flagged_clock_stays_at_zero() {
        let component = ChessTimerComponent::new(
            true,
            &ChessConfig {
                starting_time: 1,
                tick_ms: 10,
            },
        );
        let state = component.simple_update(ChessTimerMsg::Tick, &component.init_state());
        let state = component.simple_update(ChessTimerMsg::Tick, &state);
        assert_eq!(state.time, 0);
    }

    #[test]
    fn test_display_and_parse() {
        let state = ChessTimerState {
            time: 42,
            is_on: false,
        };
        assert_eq!(state.to_string(), "42 (off)");
        assert_eq!(parse_message("c").unwrap(), ChessTimerMsg::Click);
        assert!(parse_message("tick").is_err());
    }
}
