//! Inbox Communication Types
//!
//! Everything that reaches the sequencing task travels in an [`Inbound`]
//! envelope: messages tagged with where they came from, completion notices of
//! command executions, and faults raised by spawned work.

use crate::errors::RuntimeFault;
use crate::task_logging::TaskId;
use std::fmt;

// ----------------------------------------------------------------------------
// Message Origin
// ----------------------------------------------------------------------------

/// Producer of a message entering the sequencing task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageOrigin {
    /// A direct `dispatch` call
    Host,
    /// An external stream attached with `dispatch_stream`
    Source(u64),
    /// A command execution
    Command(u64),
    /// A subscription instance; `generation` identifies the instance
    Subscription { index: usize, generation: u64 },
}

impl MessageOrigin {
    /// Task identifier used when logging this origin
    pub fn task_id(&self) -> TaskId {
        match self {
            MessageOrigin::Host => TaskId::Host,
            MessageOrigin::Source(id) => TaskId::Source(*id),
            MessageOrigin::Command(id) => TaskId::Command(*id),
            MessageOrigin::Subscription { index, .. } => TaskId::Subscription(*index),
        }
    }
}

impl fmt::Display for MessageOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageOrigin::Subscription { index, generation } => {
                write!(f, "Subscription(#{} gen:{})", index, generation)
            }
            other => write!(f, "{}", other.task_id()),
        }
    }
}

// ----------------------------------------------------------------------------
// Inbound: everything → Sequencing Task
// ----------------------------------------------------------------------------

/// Envelope delivered to the sequencing task
#[derive(Debug)]
pub enum Inbound<M> {
    /// A message to apply to the current state
    Message { origin: MessageOrigin, msg: M },
    /// A command stream ended normally
    CommandCompleted { command_id: u64 },
    /// Spawned work failed fatally
    Fault(RuntimeFault),
}

impl<M> Inbound<M> {
    pub fn message(origin: MessageOrigin, msg: M) -> Self {
        Inbound::Message { origin, msg }
    }
}
