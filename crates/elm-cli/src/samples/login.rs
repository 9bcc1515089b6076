//! Login sample
//!
//! A login form whose submit runs an asynchronous login command. The outcome
//! of the command comes back as a message either way. Once a user is logged
//! in, a timer subscription counts the seconds of the session.

use elm_runtime::subscription::{every, BoxedSubscription, FnSubscription};
use elm_runtime::{command, CmdStream, Component, Update};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::config::LoginConfig;
use crate::error::{CliError, Result};

const MIN_PASSWORD_LEN: usize = 6;

// ----------------------------------------------------------------------------
// Login Service
// ----------------------------------------------------------------------------

/// Failure reported by the login service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoginError {
    #[error("No account registered for {0}")]
    UnknownAccount(String),
    #[error("Wrong password")]
    WrongPassword,
}

/// In-memory login service with a fixed account table and simulated latency
#[derive(Debug, Clone)]
pub struct LoginService {
    accounts: Vec<(String, String)>,
    delay: Duration,
}

impl LoginService {
    pub fn new(delay: Duration) -> Self {
        Self {
            accounts: vec![
                ("elm@example.com".to_string(), "architecture".to_string()),
                ("demo@example.com".to_string(), "password".to_string()),
            ],
            delay,
        }
    }

    /// Resolve to the logged-in username
    pub async fn login(self, email: String, password: String) -> std::result::Result<String, LoginError> {
        tokio::time::sleep(self.delay).await;

        let (_, expected) = self
            .accounts
            .iter()
            .find(|(account, _)| *account == email)
            .ok_or_else(|| LoginError::UnknownAccount(email.clone()))?;
        if *expected != password {
            return Err(LoginError::WrongPassword);
        }
        let username = email.split('@').next().unwrap_or_default();
        Ok(username.to_string())
    }
}

// ----------------------------------------------------------------------------
// Component
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoginState {
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub login_enabled: bool,
    pub loading_visible: bool,
    pub logged_username: String,
    pub msg_text: String,
    pub logged_timer: u32,
}

impl LoginState {
    fn can_submit(email: &str, password: &str) -> bool {
        email.contains('@') && password.len() >= MIN_PASSWORD_LEN
    }

    fn with_credentials(&self, email: String, password: String) -> Self {
        Self {
            login_enabled: !self.loading_visible && Self::can_submit(&email, &password),
            email,
            password,
            msg_text: String::new(),
            ..self.clone()
        }
    }

    pub fn is_logged_in(&self) -> bool {
        !self.logged_username.is_empty()
    }
}

impl fmt::Display for LoginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_logged_in() {
            write!(f, "logged in as {} for {}s", self.logged_username, self.logged_timer)?;
        } else {
            write!(
                f,
                "email='{}' password={} login={}",
                self.email,
                "*".repeat(self.password.len()),
                if self.login_enabled { "enabled" } else { "disabled" }
            )?;
        }
        if self.loading_visible {
            write!(f, " [loading]")?;
        }
        if !self.msg_text.is_empty() {
            write!(f, " \"{}\"", self.msg_text)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginMsg {
    EmailChanged(String),
    PasswordChanged(String),
    LoginClicked,
    LoginSucceeded(String),
    LoginFailed(String),
    Logout,
    TimerTick,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginCmd {
    Login { email: String, password: String },
}

pub struct LoginComponent {
    service: LoginService,
    timer_period: Duration,
}

impl LoginComponent {
    pub fn new(config: &LoginConfig) -> Self {
        Self {
            service: LoginService::new(config.delay()),
            timer_period: config.timer_period(),
        }
    }
}

impl Component for LoginComponent {
    type State = LoginState;
    type Msg = LoginMsg;
    type Cmd = LoginCmd;

    fn init_state(&self) -> LoginState {
        LoginState::default()
    }

    fn update(&self, msg: LoginMsg, prev: &LoginState) -> Update<LoginState, LoginCmd> {
        match msg {
            LoginMsg::EmailChanged(email) => {
                Update::new(prev.with_credentials(email, prev.password.clone()))
            }
            LoginMsg::PasswordChanged(password) => {
                Update::new(prev.with_credentials(prev.email.clone(), password))
            }
            LoginMsg::LoginClicked if prev.login_enabled => Update::with_command(
                LoginState {
                    login_enabled: false,
                    loading_visible: true,
                    msg_text: String::new(),
                    ..prev.clone()
                },
                LoginCmd::Login {
                    email: prev.email.clone(),
                    password: prev.password.clone(),
                },
            ),
            LoginMsg::LoginClicked => Update::new(prev.clone()),
            LoginMsg::LoginSucceeded(username) => Update::new(LoginState {
                msg_text: format!("Welcome, {}", username),
                logged_username: username,
                ..LoginState::default()
            }),
            LoginMsg::LoginFailed(reason) => Update::new(LoginState {
                loading_visible: false,
                login_enabled: LoginState::can_submit(&prev.email, &prev.password),
                msg_text: reason,
                ..prev.clone()
            }),
            LoginMsg::Logout if prev.is_logged_in() => Update::new(LoginState {
                msg_text: "Logged out".to_string(),
                ..LoginState::default()
            }),
            LoginMsg::Logout => Update::new(prev.clone()),
            LoginMsg::TimerTick => Update::new(LoginState {
                logged_timer: prev.logged_timer + 1,
                ..prev.clone()
            }),
        }
    }

    fn call(&self, cmd: LoginCmd) -> CmdStream<LoginMsg> {
        match cmd {
            LoginCmd::Login { email, password } => command::perform(
                self.service.clone().login(email, password),
                LoginMsg::LoginSucceeded,
                |error: LoginError| LoginMsg::LoginFailed(error.to_string()),
            ),
        }
    }

    fn subscriptions(&self) -> Vec<BoxedSubscription<LoginState, LoginMsg>> {
        let period = self.timer_period;
        vec![FnSubscription::new("logged-timer", move |_: &LoginState| {
            every(period, || LoginMsg::TimerTick)
        })
        .active_when(LoginState::is_logged_in)
        .distinct_when(|prev: &LoginState, next: &LoginState| {
            prev.logged_username != next.logged_username
        })
        .boxed()]
    }
}

pub const HELP: &str =
    "'email <address>', 'password <secret>', 'login', 'logout' (try elm@example.com / architecture)";

pub fn parse_message(line: &str) -> Result<LoginMsg> {
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    match word {
        "email" => Ok(LoginMsg::EmailChanged(rest.to_string())),
        "password" => Ok(LoginMsg::PasswordChanged(rest.to_string())),
        "login" if rest.is_empty() => Ok(LoginMsg::LoginClicked),
        "logout" if rest.is_empty() => Ok(LoginMsg::Logout),
        _ => Err(CliError::unknown_input(line)),
    }
}
