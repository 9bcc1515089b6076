//! Runtime Task Implementation
//!
//! Contains the sequencing task: the single owner of a runtime's state and the
//! only place the transition function is ever invoked.

use super::state::{CoreState, LoggerWrapper};
use crate::managers::{CommandExecutor, SubscriptionManager};
use crate::runtime::RuntimeShared;
use elm_core::channel::{Inbound, InboxReceiver, MessageOrigin};
use elm_core::task_logging::TaskId;
use elm_core::{Component, RuntimeFault};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

// ----------------------------------------------------------------------------
// Runtime Task
// ----------------------------------------------------------------------------

/// The sequencing task that applies every message of one runtime
pub struct RuntimeTask<C: Component> {
    component: Arc<C>,
    /// Current state (owned exclusively by this task)
    state: CoreState<C::State>,
    /// Every message, completion and fault arrives here, in order
    inbox: InboxReceiver<C::Msg>,
    commands: CommandExecutor<C>,
    subscriptions: SubscriptionManager<C::State, C::Msg>,
    shared: Arc<RuntimeShared<C::State>>,
    logger: LoggerWrapper,
}

impl<C: Component> RuntimeTask<C> {
    pub(crate) fn new(
        component: Arc<C>,
        initial: Arc<C::State>,
        inbox: InboxReceiver<C::Msg>,
        commands: CommandExecutor<C>,
        subscriptions: SubscriptionManager<C::State, C::Msg>,
        shared: Arc<RuntimeShared<C::State>>,
        logger: LoggerWrapper,
    ) -> Self {
        Self {
            component,
            state: CoreState::new(initial),
            inbox,
            commands,
            subscriptions,
            shared,
            logger,
        }
    }

    /// Run the main loop until teardown or a fatal fault
    pub async fn run(mut self) {
        self.logger
            .log_task_event(TaskId::Runtime, "Runtime task starting");

        while let Some(inbound) = self.inbox.recv().await {
            if self.shared.is_shut_down() {
                break;
            }

            let outcome = match inbound {
                Inbound::Message { origin, msg } => {
                    // Still counted as queued until its commands are started
                    let outcome = self.apply(origin, msg);
                    self.shared.stats.record_message_dequeued();
                    outcome
                }
                Inbound::CommandCompleted { command_id } => {
                    self.commands.complete(command_id);
                    Ok(())
                }
                Inbound::Fault(fault) => Err(fault),
            };

            // A fault leaves the state possibly inconsistent: never apply anything else
            if let Err(fault) = outcome {
                self.shared.fail(fault);
                break;
            }
        }

        self.logger.log_task_event(
            TaskId::Runtime,
            &format!("Runtime task stopped after {} message(s)", self.state.sequence),
        );
    }

    /// Apply one message: transition, publish, reconcile, execute
    fn apply(&mut self, origin: MessageOrigin, msg: C::Msg) -> Result<(), RuntimeFault> {
        if let MessageOrigin::Subscription { index, generation } = origin {
            if !self.subscriptions.accepts(index, generation) {
                self.logger.log_drop(
                    origin.task_id(),
                    TaskId::Runtime,
                    &msg,
                    "subscription instance was replaced",
                );
                self.shared.stats.record_message_discarded();
                return Ok(());
            }
        }

        self.logger
            .log_receive(origin.task_id(), TaskId::Runtime, &msg);

        let component = Arc::clone(&self.component);
        let prev = Arc::clone(&self.state.current);
        let update = catch_unwind(AssertUnwindSafe(|| component.update(msg, &prev))).map_err(
            |payload| RuntimeFault::TransitionPanicked {
                message: format!("message from {}", origin),
                reason: RuntimeFault::panic_reason(payload.as_ref()),
            },
        )?;

        self.state.sequence += 1;
        self.shared.stats.record_message_applied();

        let (next, commands) = update.into_parts();
        if next != *prev {
            let next = Arc::new(next);
            self.state.current = Arc::clone(&next);
            self.logger.log_state(TaskId::Runtime, &*next);
            if self.shared.state.publish(Arc::clone(&next)) {
                self.shared.stats.record_state_published();
            }
            self.subscriptions.reconcile(&prev, &next)?;
        }

        for command in commands {
            self.commands.execute(command)?;
        }

        Ok(())
    }
}
