//! Component Runtime
//!
//! The host-facing handle of a running component. A runtime is created by
//! [`RuntimeBuilder`](crate::RuntimeBuilder) and lives until it is torn down,
//! dropped, or stopped by a fatal fault.
//!
//! ```rust,no_run
//! use elm_core::SimpleComponent;
//! use elm_runtime::RuntimeBuilder;
//! use futures::StreamExt;
//!
//! struct Counter;
//!
//! #[derive(Debug)]
//! enum Msg { Increment, Decrement }
//!
//! impl SimpleComponent for Counter {
//!     type State = i64;
//!     type Msg = Msg;
//!
//!     fn init_state(&self) -> i64 { 0 }
//!
//!     fn simple_update(&self, msg: Msg, count: &i64) -> i64 {
//!         match msg {
//!             Msg::Increment => count + 1,
//!             Msg::Decrement => count - 1,
//!         }
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = RuntimeBuilder::new(Counter).build()?;
//! let mut states = runtime.state();
//!
//! runtime.dispatch(Msg::Increment);
//! assert_eq!(*states.next().await.unwrap(), 0);
//! assert_eq!(*states.next().await.unwrap(), 1);
//!
//! runtime.teardown();
//! # Ok(())
//! # }
//! ```

use crate::logic::{RuntimeStats, StatsSnapshot};
use crate::tasks::{TaskContext, TaskKey, TaskRegistry};
use elm_core::channel::{InboxSender, MessageOrigin, StateChannel, StateStream};
use elm_core::{Component, RuntimeConfig, RuntimeFault};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

// ----------------------------------------------------------------------------
// Runtime Identity and Status
// ----------------------------------------------------------------------------

/// Unique identity of one runtime instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuntimeId(Uuid);

impl RuntimeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RuntimeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RuntimeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First 8 hex digits are enough to tell runtimes apart in logs
        let simple = self.0.simple().to_string();
        write!(f, "{}", &simple[..8])
    }
}

/// Lifecycle status of a runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeStatus {
    Running,
    /// Torn down by the host
    Stopped,
    /// Stopped by a fatal fault
    Faulted(RuntimeFault),
}

impl RuntimeStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, RuntimeStatus::Running)
    }

    pub fn fault(&self) -> Option<&RuntimeFault> {
        match self {
            RuntimeStatus::Faulted(fault) => Some(fault),
            _ => None,
        }
    }
}

// ----------------------------------------------------------------------------
// Shared Runtime Internals
// ----------------------------------------------------------------------------

/// State shared between the handle, the sequencing task and the lifecycle
/// watchers of one runtime
pub(crate) struct RuntimeShared<S> {
    pub id: RuntimeId,
    pub state: StateChannel<S>,
    pub tasks: TaskRegistry,
    pub shutdown: Arc<AtomicBool>,
    pub stats: Arc<RuntimeStats>,
    status: watch::Sender<RuntimeStatus>,
    runtime_task: Mutex<Option<AbortHandle>>,
    next_source_id: AtomicU64,
}

impl<S: Send + Sync + 'static> RuntimeShared<S> {
    pub fn new(id: RuntimeId, state: StateChannel<S>) -> Self {
        let (status, _) = watch::channel(RuntimeStatus::Running);
        Self {
            id,
            state,
            tasks: TaskRegistry::new(),
            shutdown: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(RuntimeStats::default()),
            status,
            runtime_task: Mutex::new(None),
            next_source_id: AtomicU64::new(1),
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    pub fn status(&self) -> RuntimeStatus {
        self.status.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<RuntimeStatus> {
        self.status.subscribe()
    }

    pub fn next_source_id(&self) -> u64 {
        self.next_source_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn set_runtime_task(&self, handle: AbortHandle) {
        if self.is_shut_down() {
            handle.abort();
            return;
        }
        *self
            .runtime_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
        // Teardown may have run between the check and the store
        if self.is_shut_down() {
            self.abort_runtime_task();
        }
    }

    fn abort_runtime_task(&self) {
        let handle = self
            .runtime_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    /// Stop everything the runtime owns; `false` if it was already stopped
    pub fn teardown(&self) -> bool {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return false;
        }

        self.state.close();
        let aborted = self.tasks.abort_all();
        self.stats.record_commands_cancelled(aborted.commands);
        self.stats.record_subscriptions_stopped(aborted.subscriptions);
        self.abort_runtime_task();

        self.status.send_if_modified(|status| {
            if status.is_running() {
                *status = RuntimeStatus::Stopped;
                true
            } else {
                false
            }
        });

        info!(
            "Runtime {} torn down: {} command(s) cancelled, {} subscription(s) stopped, {} source(s) detached",
            self.id, aborted.commands, aborted.subscriptions, aborted.sources
        );
        true
    }

    /// Record a fatal fault and tear down
    pub fn fail(&self, fault: RuntimeFault) {
        error!("Runtime {} stopped by fault: {}", self.id, fault);
        self.status.send_if_modified(|status| {
            if status.is_running() {
                *status = RuntimeStatus::Faulted(fault);
                true
            } else {
                false
            }
        });
        self.teardown();
    }
}

// ----------------------------------------------------------------------------
// Dispatcher
// ----------------------------------------------------------------------------

/// Cloneable message entry point of a runtime
///
/// Messages dispatched after teardown are silently dropped.
pub struct Dispatcher<M> {
    inbox: InboxSender<M>,
    shutdown: Arc<AtomicBool>,
    stats: Arc<RuntimeStats>,
}

impl<M> Clone for Dispatcher<M> {
    fn clone(&self) -> Self {
        Self {
            inbox: self.inbox.clone(),
            shutdown: Arc::clone(&self.shutdown),
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<M: Send + 'static> Dispatcher<M> {
    /// Enqueue one message; never blocks
    pub fn dispatch(&self, msg: M) {
        if self.is_closed() {
            return;
        }
        self.stats.record_message_queued();
        let sent = self
            .inbox
            .send(elm_core::Inbound::message(MessageOrigin::Host, msg));
        if sent.is_err() {
            self.stats.record_message_dequeued();
        }
    }

    /// Whether the runtime behind this dispatcher is gone
    pub fn is_closed(&self) -> bool {
        self.shutdown.load(Ordering::Acquire) || self.inbox.is_closed()
    }
}

// ----------------------------------------------------------------------------
// Component Runtime
// ----------------------------------------------------------------------------

/// A running component: message entry point, state stream and teardown
pub struct ComponentRuntime<C: Component> {
    shared: Arc<RuntimeShared<C::State>>,
    context: TaskContext<C::Msg>,
    config: RuntimeConfig,
}

impl<C: Component> ComponentRuntime<C> {
    pub(crate) fn new(
        shared: Arc<RuntimeShared<C::State>>,
        context: TaskContext<C::Msg>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            shared,
            context,
            config,
        }
    }

    pub(crate) fn shared(&self) -> &Arc<RuntimeShared<C::State>> {
        &self.shared
    }

    pub(crate) fn context(&self) -> &TaskContext<C::Msg> {
        &self.context
    }

    pub fn id(&self) -> RuntimeId {
        self.shared.id
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Enqueue one message for the transition function
    ///
    /// Never blocks. After teardown the message is silently dropped.
    pub fn dispatch(&self, msg: C::Msg) {
        self.dispatcher().dispatch(msg);
    }

    /// Cloneable dispatcher for producers on other tasks or threads
    pub fn dispatcher(&self) -> Dispatcher<C::Msg> {
        Dispatcher {
            inbox: self.context.inbox().clone(),
            shutdown: Arc::clone(&self.shared.shutdown),
            stats: Arc::clone(&self.shared.stats),
        }
    }

    /// Feed every element of `messages` into the runtime until it ends or the
    /// runtime is torn down
    pub fn dispatch_stream<St>(&self, messages: St)
    where
        St: Stream<Item = C::Msg> + Send + 'static,
    {
        self.context.tasks().prune_finished();

        let source_id = self.shared.next_source_id();
        let context = self.context.clone();
        let forwarder = async move {
            let origin = MessageOrigin::Source(source_id);
            let mut messages = Box::pin(messages);
            while let Some(msg) = messages.next().await {
                if !context.forward(origin, msg) {
                    return;
                }
            }
            debug!("Source #{} ended", source_id);
        };

        if self.context.spawn(TaskKey::Source(source_id), forwarder) {
            debug!("Runtime {} attached source #{}", self.shared.id, source_id);
        }
    }

    /// Latest state followed by every later one
    ///
    /// Each call returns an independent stream. The stream ends once the
    /// runtime is torn down.
    pub fn state(&self) -> StateStream<C::State> {
        self.shared.state.subscribe()
    }

    /// The most recently published state
    pub fn current_state(&self) -> Arc<C::State> {
        self.shared.state.latest()
    }

    /// Cancel commands, stop subscriptions and sources, stop the sequencing
    /// task and complete every state stream
    ///
    /// Synchronous and idempotent.
    pub fn teardown(&self) {
        self.shared.teardown();
    }

    pub fn is_running(&self) -> bool {
        self.shared.status().is_running()
    }

    pub fn status(&self) -> RuntimeStatus {
        self.shared.status()
    }

    /// The fault that stopped the runtime, if any
    pub fn fault(&self) -> Option<RuntimeFault> {
        self.shared.status().fault().cloned()
    }

    /// Wait until the runtime stops; resolves to the fault that stopped it,
    /// or `None` after a regular teardown
    pub async fn wait_for_fault(&self) -> Option<RuntimeFault> {
        let mut status = self.shared.watch_status();
        wait_until_stopped(&mut status).await;
        let fault = status.borrow().fault().cloned();
        fault
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }
}

impl<C: Component> fmt::Debug for ComponentRuntime<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRuntime")
            .field("id", &self.shared.id)
            .field("status", &self.shared.status())
            .finish()
    }
}

impl<C: Component> Drop for ComponentRuntime<C> {
    fn drop(&mut self) {
        self.shared.teardown();
    }
}

/// Resolve once `status` leaves [`RuntimeStatus::Running`]
pub(crate) async fn wait_until_stopped(status: &mut watch::Receiver<RuntimeStatus>) {
    loop {
        if !status.borrow_and_update().is_running() {
            return;
        }
        if status.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_id_display() {
        let id = RuntimeId::new();
        assert_eq!(id.to_string().len(), 8);
        assert_ne!(id, RuntimeId::new());
    }

    #[test]
    fn test_status_accessors() {
        assert!(RuntimeStatus::Running.is_running());
        assert!(RuntimeStatus::Stopped.fault().is_none());

        let fault = RuntimeFault::SubscriptionPanicked {
            index: 0,
            reason: "boom".into(),
        };
        let status = RuntimeStatus::Faulted(fault.clone());
        assert!(!status.is_running());
        assert_eq!(status.fault(), Some(&fault));
    }

    #[tokio::test]
    async fn test_shared_teardown_is_idempotent() {
        let shared = RuntimeShared::new(RuntimeId::new(), StateChannel::new(0u8, 4));
        let mut status = shared.watch_status();

        assert!(shared.teardown());
        assert!(!shared.teardown());
        assert!(shared.state.is_closed());

        wait_until_stopped(&mut status).await;
        assert_eq!(shared.status(), RuntimeStatus::Stopped);
    }

    #[tokio::test]
    async fn test_fault_wins_over_later_teardown() {
        let shared = RuntimeShared::new(RuntimeId::new(), StateChannel::new(0u8, 4));
        let fault = RuntimeFault::TransitionPanicked {
            message: "message from Host".into(),
            reason: "bad".into(),
        };

        shared.fail(fault.clone());
        shared.teardown();
        assert_eq!(shared.status(), RuntimeStatus::Faulted(fault));
    }
}
