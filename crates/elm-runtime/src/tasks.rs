//! Spawned Task Bookkeeping
//!
//! Every unit of concurrent work a runtime owns (command executions,
//! subscription instances, attached message sources) is spawned through a
//! [`TaskContext`] and registered in the runtime's [`TaskRegistry`], so that
//! teardown can abort all of it synchronously from any thread.

use crate::logic::RuntimeStats;
use dashmap::DashMap;
use elm_core::channel::{Inbound, InboxSender, MessageOrigin};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::Instrument;

// ----------------------------------------------------------------------------
// Task Registry
// ----------------------------------------------------------------------------

/// Identity of a spawned task within one runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum TaskKey {
    Command(u64),
    Subscription { index: usize, generation: u64 },
    Source(u64),
}

/// What a full abort cancelled, per kind of work
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct AbortSummary {
    pub commands: u64,
    pub subscriptions: u64,
    pub sources: u64,
}

/// Abort handles of every live task of a runtime
#[derive(Debug, Clone, Default)]
pub(crate) struct TaskRegistry {
    handles: Arc<DashMap<TaskKey, AbortHandle>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, key: TaskKey, handle: AbortHandle) {
        if let Some(previous) = self.handles.insert(key, handle) {
            previous.abort();
        }
    }

    /// Abort one task; `false` if it was not registered
    pub fn abort(&self, key: &TaskKey) -> bool {
        match self.handles.remove(key) {
            Some((_, handle)) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Forget a task that ended on its own
    pub fn finish(&self, key: &TaskKey) {
        self.handles.remove(key);
    }

    /// Abort everything still registered
    pub fn abort_all(&self) -> AbortSummary {
        let keys: Vec<TaskKey> = self.handles.iter().map(|entry| *entry.key()).collect();
        let mut summary = AbortSummary::default();
        for key in keys {
            if !self.abort(&key) {
                continue;
            }
            match key {
                TaskKey::Command(_) => summary.commands += 1,
                TaskKey::Subscription { .. } => summary.subscriptions += 1,
                TaskKey::Source(_) => summary.sources += 1,
            }
        }
        summary
    }

    /// Drop entries of tasks that already completed
    pub fn prune_finished(&self) {
        self.handles.retain(|_, handle| !handle.is_finished());
    }

    pub fn contains(&self, key: &TaskKey) -> bool {
        self.handles.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }
}

// ----------------------------------------------------------------------------
// Task Context
// ----------------------------------------------------------------------------

/// Everything a spawned task needs to talk back to its runtime
pub(crate) struct TaskContext<M> {
    executor: Handle,
    inbox: InboxSender<M>,
    tasks: TaskRegistry,
    shutdown: Arc<AtomicBool>,
    stats: Arc<RuntimeStats>,
}

impl<M> Clone for TaskContext<M> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            inbox: self.inbox.clone(),
            tasks: self.tasks.clone(),
            shutdown: Arc::clone(&self.shutdown),
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<M: Send + 'static> TaskContext<M> {
    pub fn new(
        executor: Handle,
        inbox: InboxSender<M>,
        tasks: TaskRegistry,
        shutdown: Arc<AtomicBool>,
        stats: Arc<RuntimeStats>,
    ) -> Self {
        Self {
            executor,
            inbox,
            tasks,
            shutdown,
            stats,
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    pub fn executor(&self) -> &Handle {
        &self.executor
    }

    pub fn stats(&self) -> &RuntimeStats {
        &self.stats
    }

    pub fn tasks(&self) -> &TaskRegistry {
        &self.tasks
    }

    pub fn inbox(&self) -> &InboxSender<M> {
        &self.inbox
    }

    /// Spawn and register a task; refused once the runtime is shut down
    pub fn spawn<F>(&self, key: TaskKey, future: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_shut_down() {
            return false;
        }
        let handle = self.executor.spawn(future.in_current_span());
        self.tasks.register(key, handle.abort_handle());
        // Teardown may have swept the registry between the check and the insert
        if self.is_shut_down() {
            self.tasks.abort(&key);
            return false;
        }
        true
    }

    /// Forward a message into the inbox; `false` once the runtime is gone
    pub fn forward(&self, origin: MessageOrigin, msg: M) -> bool {
        if self.is_shut_down() {
            return false;
        }
        self.stats.record_message_queued();
        if self.inbox.send(Inbound::message(origin, msg)).is_err() {
            self.stats.record_message_dequeued();
            return false;
        }
        true
    }

    /// Report a completion or fault to the sequencing task
    pub fn report(&self, inbound: Inbound<M>) {
        if self.is_shut_down() {
            return;
        }
        let _ = self.inbox.send(inbound);
    }
}
