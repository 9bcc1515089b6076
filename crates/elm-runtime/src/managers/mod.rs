//! Runtime Managers
//!
//! Components owned by the sequencing task that run concurrent work on its
//! behalf.

pub mod commands;
pub mod subscriptions;

pub use commands::CommandExecutor;
pub use subscriptions::SubscriptionManager;
