//! Runtime Builder API
//!
//! Provides a builder-style API for hosts (CLI/tests/applications) to turn a
//! component into a running [`ComponentRuntime`].

use crate::logic::{LoggerWrapper, RuntimeTask};
use crate::managers::{CommandExecutor, SubscriptionManager};
use crate::runtime::{ComponentRuntime, RuntimeId, RuntimeShared};
use crate::tasks::TaskContext;
use elm_core::channel::{create_inbox, create_state_channel};
use elm_core::task_logging::{LogLevel, TaskId};
use elm_core::{Component, ElmError, ElmResult, RestartPolicy, RuntimeConfig};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{info, info_span, Instrument};

// ----------------------------------------------------------------------------
// Runtime Builder
// ----------------------------------------------------------------------------

/// Builder for creating a runtime around one component
pub struct RuntimeBuilder<C: Component> {
    component: Arc<C>,
    config: RuntimeConfig,
}

impl<C: Component> RuntimeBuilder<C> {
    /// Create a new runtime builder
    pub fn new(component: C) -> Self {
        Self::from_arc(Arc::new(component))
    }

    /// Create a builder for a component shared with other runtimes
    pub fn from_arc(component: Arc<C>) -> Self {
        Self {
            component,
            config: RuntimeConfig::default(),
        }
    }

    /// Set the runtime configuration
    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Configure message-flow logging
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.config.log_level = level;
        self
    }

    /// Disable message-flow logging
    pub fn with_no_logging(self) -> Self {
        self.with_log_level(LogLevel::None)
    }

    /// Set the subscription restart ordering
    pub fn restart_policy(mut self, policy: RestartPolicy) -> Self {
        self.config.restart_policy = policy;
        self
    }

    /// Set the per-observer state buffer size
    pub fn state_buffer_size(mut self, size: usize) -> Self {
        self.config.channels.state_buffer_size = size;
        self
    }

    /// Build and start the runtime
    ///
    /// Must be called from within a tokio runtime. The initial state is
    /// computed and the subscriptions active for it are started before this
    /// returns.
    pub fn build(self) -> ElmResult<ComponentRuntime<C>> {
        self.config.validate().map_err(ElmError::config_error)?;
        let executor = Handle::try_current().map_err(|e| ElmError::no_executor(e.to_string()))?;

        let id = RuntimeId::new();
        let span = info_span!("runtime", id = %id);
        let _entered = span.enter();

        let logger = LoggerWrapper::for_level(self.config.log_level);
        let state = create_state_channel(self.component.init_state(), &self.config.channels);
        let initial = state.latest();
        logger.log_state(TaskId::Runtime, &*initial);

        let (inbox_sender, inbox_receiver) = create_inbox();
        let shared = Arc::new(RuntimeShared::new(id, state));
        let context = TaskContext::new(
            executor.clone(),
            inbox_sender,
            shared.tasks.clone(),
            Arc::clone(&shared.shutdown),
            Arc::clone(&shared.stats),
        );

        let mut subscriptions = SubscriptionManager::new(
            self.component.subscriptions(),
            self.config.restart_policy,
            context.clone(),
            logger.clone(),
        );
        if let Err(fault) = subscriptions.start_initial(&initial) {
            shared.fail(fault.clone());
            return Err(fault.into());
        }

        let commands = CommandExecutor::new(Arc::clone(&self.component), context.clone(), logger.clone());
        let task = RuntimeTask::new(
            Arc::clone(&self.component),
            initial,
            inbox_receiver,
            commands,
            subscriptions,
            Arc::clone(&shared),
            logger,
        );
        let handle = executor.spawn(task.run().instrument(span.clone()));
        shared.set_runtime_task(handle.abort_handle());

        info!(
            "Runtime {} started ({} restart policy, {} log level)",
            id,
            match self.config.restart_policy {
                RestartPolicy::StopThenStart => "stop-then-start",
                RestartPolicy::Overlap => "overlap",
            },
            self.config.log_level
        );

        Ok(ComponentRuntime::new(shared, context, self.config))
    }
}

// ----------------------------------------------------------------------------
// Convenience Functions
// ----------------------------------------------------------------------------

/// Create a runtime for `component` with the given message-flow log level
pub fn create_runtime_for<C: Component>(
    component: C,
    log_level: LogLevel,
) -> ElmResult<ComponentRuntime<C>> {
    RuntimeBuilder::new(component)
        .with_log_level(log_level)
        .build()
}

/// Create a runtime with the testing configuration
pub fn create_test_runtime<C: Component>(component: C) -> ElmResult<ComponentRuntime<C>> {
    RuntimeBuilder::new(component)
        .with_config(RuntimeConfig::testing())
        .build()
}
