//! Command Executor
//!
//! Runs each command produced by a transition as an independent task. The
//! messages a command yields are forwarded into the runtime inbox; the end of
//! its stream is reported as a completion. An error escaping the stream, or a
//! panic while producing it, is reported as a fatal fault.

use crate::logic::LoggerWrapper;
use crate::tasks::{TaskContext, TaskKey};
use elm_core::channel::{Inbound, MessageOrigin};
use elm_core::task_logging::TaskId;
use elm_core::{CmdStream, Component, RuntimeFault};
use futures::stream::StreamExt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::debug;

// ----------------------------------------------------------------------------
// Command Executor
// ----------------------------------------------------------------------------

/// Spawns and tracks command executions of one runtime
pub struct CommandExecutor<C: Component> {
    component: Arc<C>,
    context: TaskContext<C::Msg>,
    logger: LoggerWrapper,
    next_command_id: u64,
}

impl<C: Component> CommandExecutor<C> {
    pub(crate) fn new(component: Arc<C>, context: TaskContext<C::Msg>, logger: LoggerWrapper) -> Self {
        Self {
            component,
            context,
            logger,
            next_command_id: 1,
        }
    }

    /// Interpret `command` and run the resulting stream
    ///
    /// Returns the id assigned to the execution. A panic inside
    /// [`Component::call`] is returned as a fault.
    pub fn execute(&mut self, command: C::Cmd) -> Result<u64, RuntimeFault> {
        let command_id = self.next_command_id;
        self.next_command_id += 1;

        self.logger
            .log_send(TaskId::Runtime, TaskId::Command(command_id), &command);

        let component = Arc::clone(&self.component);
        let stream = catch_unwind(AssertUnwindSafe(move || component.call(command))).map_err(
            |payload| RuntimeFault::CommandPanicked {
                command_id,
                reason: RuntimeFault::panic_reason(payload.as_ref()),
            },
        )?;

        let context = self.context.clone();
        if self.context.spawn(
            TaskKey::Command(command_id),
            run_command(context, command_id, stream),
        ) {
            self.context.stats().record_command_started();
        }
        Ok(command_id)
    }

    /// Bookkeeping for a command whose stream ended
    pub fn complete(&self, command_id: u64) {
        self.context.tasks().finish(&TaskKey::Command(command_id));
        self.context.stats().record_command_completed();
        self.logger
            .log_task_event(TaskId::Command(command_id), "completed");
    }
}

/// Forward every message of a command stream into the inbox
async fn run_command<M: Send + 'static>(context: TaskContext<M>, command_id: u64, stream: CmdStream<M>) {
    let origin = MessageOrigin::Command(command_id);
    let mut stream = AssertUnwindSafe(stream).catch_unwind();

    while let Some(item) = stream.next().await {
        match item {
            Ok(Ok(msg)) => {
                if !context.forward(origin, msg) {
                    debug!("Command #{} stopped forwarding: runtime is gone", command_id);
                    return;
                }
            }
            Ok(Err(error)) => {
                context.report(Inbound::Fault(RuntimeFault::CommandFailed { command_id, error }));
                return;
            }
            Err(payload) => {
                context.report(Inbound::Fault(RuntimeFault::CommandPanicked {
                    command_id,
                    reason: RuntimeFault::panic_reason(payload.as_ref()),
                }));
                return;
            }
        }
    }

    context.report(Inbound::CommandCompleted { command_id });
}
