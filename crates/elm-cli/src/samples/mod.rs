//! Sample components driven by the demo CLI

pub mod chess;
pub mod counter;
pub mod login;

pub use chess::{ChessTimerComponent, ChessTimerMsg, ChessTimerState};
pub use counter::{CounterComponent, CounterMsg, CounterState};
pub use login::{LoginComponent, LoginMsg, LoginService, LoginState};
