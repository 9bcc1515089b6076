//! Counter sample

use elm_runtime::SimpleComponent;
use serde::Serialize;
use std::fmt;

use crate::error::{CliError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterState {
    pub counter: i64,
}

impl fmt::Display for CounterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.counter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterMsg {
    Increment,
    Decrement,
}

pub struct CounterComponent;

impl SimpleComponent for CounterComponent {
    type State = CounterState;
    type Msg = CounterMsg;

    fn init_state(&self) -> CounterState {
        CounterState { counter: 0 }
    }

    fn simple_update(&self, msg: CounterMsg, prev: &CounterState) -> CounterState {
        match msg {
            CounterMsg::Increment => CounterState {
                counter: prev.counter + 1,
            },
            CounterMsg::Decrement => CounterState {
                counter: prev.counter - 1,
            },
        }
    }
}

pub const HELP: &str = "'+' or 'inc' increments, '-' or 'dec' decrements";

pub fn parse_message(line: &str) -> Result<CounterMsg> {
    match line {
        "+" | "inc" | "increment" => Ok(CounterMsg::Increment),
        "-" | "dec" | "decrement" => Ok(CounterMsg::Decrement),
        other => Err(CliError::unknown_input(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elm_runtime::Component;

    #[test]
    fn test_counter_transitions() {
        let component = CounterComponent;
        let state = Component::init_state(&component);
        let state = component.update(CounterMsg::Increment, &state).state;
        let state = component.update(CounterMsg::Increment, &state).state;
        let state = component.update(CounterMsg::Decrement, &state).state;
        assert_eq!(state, CounterState { counter: 1 });
    }

    #[test]
    fn test_parse_message() {
        assert_eq!(parse_message("+").unwrap(), CounterMsg::Increment);
        assert_eq!(parse_message("dec").unwrap(), CounterMsg::Decrement);
        assert!(matches!(parse_message("++"), Err(CliError::Input(_))));
    }
}
