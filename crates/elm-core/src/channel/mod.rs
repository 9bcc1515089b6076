//! Channel Module
//!
//! Channel infrastructure between the sequencing task and everything around it:
//! - `communication`: envelope types flowing into the sequencing task
//! - `utils`: inbox creation and the replay-latest state channel

pub mod communication;
pub mod utils;

pub use communication::{Inbound, MessageOrigin};

pub use crate::config::ChannelConfig;

pub use utils::{
    create_inbox, create_state_channel, InboxReceiver, InboxSender, StateChannel, StateStream,
};
