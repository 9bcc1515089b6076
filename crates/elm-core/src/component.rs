//! Component Authoring Contract
//!
//! A component bundles everything a runtime needs to drive one piece of UI
//! state: the initial state, the pure transition function, the interpretation of
//! commands and the declared subscriptions.
//!
//! ## Contract
//!
//! - [`Component::update`] must be pure: no I/O, no mutation of external state,
//!   deterministic for its inputs. The runtime calls it exactly once per
//!   accepted message and never retries or memoises it.
//! - Commands never see state. [`Component::call`] turns a command into a
//!   stream of follow-up messages which re-enter the runtime like any other.
//! - Subscriptions are declared once; the runtime decides from the current state
//!   which of them are running.

use crate::command::CmdStream;
use crate::subscription::BoxedSubscription;
use std::fmt;

// ----------------------------------------------------------------------------
// Transition Result
// ----------------------------------------------------------------------------

/// Result of one application of the transition function
#[derive(Debug, Clone, PartialEq)]
pub struct Update<S, C> {
    /// The next state
    pub state: S,
    /// Commands to hand to the command executor, in order
    pub commands: Vec<C>,
}

impl<S, C> Update<S, C> {
    /// Transition to `state` without side effects
    pub fn new(state: S) -> Self {
        Self {
            state,
            commands: Vec::new(),
        }
    }

    /// Transition to `state` and request a single command
    pub fn with_command(state: S, command: C) -> Self {
        Self {
            state,
            commands: vec![command],
        }
    }

    /// Append a command to the transition
    pub fn and_command(mut self, command: C) -> Self {
        self.commands.push(command);
        self
    }

    /// Append several commands to the transition
    pub fn and_commands<I: IntoIterator<Item = C>>(mut self, commands: I) -> Self {
        self.commands.extend(commands);
        self
    }

    pub fn into_parts(self) -> (S, Vec<C>) {
        (self.state, self.commands)
    }
}

impl<S, C> From<(S, Vec<C>)> for Update<S, C> {
    fn from((state, commands): (S, Vec<C>)) -> Self {
        Self { state, commands }
    }
}

impl<S, C> From<(S, Option<C>)> for Update<S, C> {
    fn from((state, command): (S, Option<C>)) -> Self {
        Self {
            state,
            commands: command.into_iter().collect(),
        }
    }
}

// ----------------------------------------------------------------------------
// Component Trait
// ----------------------------------------------------------------------------

/// A component driven by a runtime
pub trait Component: Send + Sync + 'static {
    /// Immutable snapshot of everything the component shows
    type State: PartialEq + fmt::Debug + Send + Sync + 'static;
    /// Discrete events fed into the transition function
    type Msg: fmt::Debug + Send + 'static;
    /// Requests for side effects
    type Cmd: fmt::Debug + Send + 'static;

    /// Build the state the runtime starts from
    fn init_state(&self) -> Self::State;

    /// Pure transition from the previous state and a message
    fn update(&self, msg: Self::Msg, prev_state: &Self::State) -> Update<Self::State, Self::Cmd>;

    /// Interpret a command as an asynchronous stream of follow-up messages
    fn call(&self, cmd: Self::Cmd) -> CmdStream<Self::Msg>;

    /// Long-running message sources, in declaration order
    fn subscriptions(&self) -> Vec<BoxedSubscription<Self::State, Self::Msg>> {
        Vec::new()
    }
}

// ----------------------------------------------------------------------------
// Simple Components
// ----------------------------------------------------------------------------

/// Command vocabulary of components that never request side effects
///
/// `NoCmd` has no values, so a [`SimpleComponent`] can never produce one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoCmd {}

/// A component whose transition function never produces commands
pub trait SimpleComponent: Send + Sync + 'static {
    type State: PartialEq + fmt::Debug + Send + Sync + 'static;
    type Msg: fmt::Debug + Send + 'static;

    fn init_state(&self) -> Self::State;

    fn simple_update(&self, msg: Self::Msg, prev_state: &Self::State) -> Self::State;

    fn subscriptions(&self) -> Vec<BoxedSubscription<Self::State, Self::Msg>> {
        Vec::new()
    }
}

impl<T: SimpleComponent> Component for T {
    type State = T::State;
    type Msg = T::Msg;
    type Cmd = NoCmd;

    fn init_state(&self) -> Self::State {
        SimpleComponent::init_state(self)
    }

    fn update(&self, msg: Self::Msg, prev_state: &Self::State) -> Update<Self::State, NoCmd> {
        Update::new(self.simple_update(msg, prev_state))
    }

    fn call(&self, cmd: NoCmd) -> CmdStream<Self::Msg> {
        match cmd {}
    }

    fn subscriptions(&self) -> Vec<BoxedSubscription<Self::State, Self::Msg>> {
        SimpleComponent::subscriptions(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Counter(i32);

    #[derive(Debug)]
    enum CounterMsg {
        Increment,
        Decrement,
    }

    struct CounterComponent;

    impl SimpleComponent for CounterComponent {
        type State = Counter;
        type Msg = CounterMsg;

        fn init_state(&self) -> Counter {
            Counter(0)
        }

        fn simple_update(&self, msg: CounterMsg, prev_state: &Counter) -> Counter {
            match msg {
                CounterMsg::Increment => Counter(prev_state.0 + 1),
                CounterMsg::Decrement => Counter(prev_state.0 - 1),
            }
        }
    }

    #[test]
    fn test_simple_component_bridges_to_component() {
        let component = CounterComponent;
        let state = Component::init_state(&component);
        let update = component.update(CounterMsg::Increment, &state);
        assert_eq!(update.state, Counter(1));
        assert!(update.commands.is_empty());

        let update = component.update(CounterMsg::Decrement, &update.state);
        assert_eq!(update.state, Counter(0));
        assert!(Component::subscriptions(&component).is_empty());
    }

    #[test]
    fn test_update_builders() {
        let update: Update<u8, &str> = Update::with_command(1, "load").and_commands(["save", "log"]);
        assert_eq!(update.commands, vec!["load", "save", "log"]);

        let update: Update<u8, &str> = (2, None).into();
        assert_eq!(update.into_parts(), (2, vec![]));

        let update: Update<u8, &str> = (3, vec!["a"]).into();
        assert_eq!(update, Update::new(3).and_command("a"));
    }
}
