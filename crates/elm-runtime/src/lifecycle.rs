//! Lifecycle Binding
//!
//! Ties a runtime to the lifecycle of the host that owns it. The host exposes
//! its lifecycle as a source of [`LifecycleEvent`]s; once it reports
//! `Destroyed`, or the source closes, the runtime is torn down exactly once.
//!
//! [`RuntimeStore`] keeps one runtime per host-chosen key so that a host that
//! is re-created (a screen rotated, a view re-attached) gets back the runtime
//! it had before instead of starting over.

use crate::builder::RuntimeBuilder;
use crate::runtime::{wait_until_stopped, ComponentRuntime};
use async_trait::async_trait;
use elm_core::{Component, ElmResult, RuntimeConfig};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, Instrument};

// ----------------------------------------------------------------------------
// Host Lifecycle
// ----------------------------------------------------------------------------

/// Lifecycle signal of a host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleEvent {
    Created,
    Destroyed,
}

/// Source of lifecycle events of a host
#[async_trait]
pub trait HostLifecycle: Send + 'static {
    /// Next lifecycle event, or `None` once the host is gone
    async fn next_event(&mut self) -> Option<LifecycleEvent>;

    /// Lifecycle state the host is already in, for sources that hold one
    fn current_event(&mut self) -> Option<LifecycleEvent> {
        None
    }
}

#[async_trait]
impl HostLifecycle for mpsc::Receiver<LifecycleEvent> {
    async fn next_event(&mut self) -> Option<LifecycleEvent> {
        self.recv().await
    }
}

#[async_trait]
impl HostLifecycle for mpsc::UnboundedReceiver<LifecycleEvent> {
    async fn next_event(&mut self) -> Option<LifecycleEvent> {
        self.recv().await
    }
}

#[async_trait]
impl HostLifecycle for watch::Receiver<LifecycleEvent> {
    async fn next_event(&mut self) -> Option<LifecycleEvent> {
        self.changed().await.ok()?;
        let event = *self.borrow_and_update();
        Some(event)
    }

    fn current_event(&mut self) -> Option<LifecycleEvent> {
        Some(*self.borrow_and_update())
    }
}

// ----------------------------------------------------------------------------
// Lifecycle Binder
// ----------------------------------------------------------------------------

/// How a lifecycle binding ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingOutcome {
    /// The host reported `Destroyed`; the runtime was torn down
    Destroyed,
    /// The host's event source closed; the runtime was torn down
    HostClosed,
    /// The runtime stopped on its own first
    RuntimeStopped,
}

/// Binds runtimes to host lifecycles
pub struct LifecycleBinder;

impl LifecycleBinder {
    /// Watch `host` and tear `runtime` down when the host is destroyed
    pub fn bind<C, H>(runtime: &ComponentRuntime<C>, mut host: H) -> LifecycleBinding
    where
        C: Component,
        H: HostLifecycle,
    {
        let shared = std::sync::Arc::clone(runtime.shared());
        let mut status = shared.watch_status();
        let id = shared.id;
        let executor = runtime.context().executor();

        if host.current_event() == Some(LifecycleEvent::Destroyed) {
            info!("Runtime {} bound to a destroyed host, tearing down", id);
            shared.teardown();
            return LifecycleBinding {
                handle: executor.spawn(async { BindingOutcome::Destroyed }),
            };
        }

        let watcher = async move {
            loop {
                tokio::select! {
                    event = host.next_event() => match event {
                        Some(LifecycleEvent::Created) => {
                            debug!("Runtime {} host created", id);
                        }
                        Some(LifecycleEvent::Destroyed) => {
                            info!("Runtime {} host destroyed, tearing down", id);
                            shared.teardown();
                            return BindingOutcome::Destroyed;
                        }
                        None => {
                            info!("Runtime {} host lifecycle closed, tearing down", id);
                            shared.teardown();
                            return BindingOutcome::HostClosed;
                        }
                    },
                    _ = wait_until_stopped(&mut status) => {
                        return BindingOutcome::RuntimeStopped;
                    }
                }
            }
        };

        LifecycleBinding {
            handle: executor.spawn(watcher.in_current_span()),
        }
    }
}

/// A live lifecycle binding
///
/// Dropping the binding leaves it active; use [`LifecycleBinding::unbind`] to
/// stop watching the host without touching the runtime.
pub struct LifecycleBinding {
    handle: JoinHandle<BindingOutcome>,
}

impl LifecycleBinding {
    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop watching the host
    pub fn unbind(self) {
        self.handle.abort();
    }

    /// Wait for the binding to end; `None` if it was unbound
    pub async fn finished(self) -> Option<BindingOutcome> {
        self.handle.await.ok()
    }
}

// ----------------------------------------------------------------------------
// Runtime Store
// ----------------------------------------------------------------------------

/// Host-owned cache of runtimes, one per key
pub struct RuntimeStore<C: Component> {
    runtimes: HashMap<String, ComponentRuntime<C>>,
    config: RuntimeConfig,
}

impl<C: Component> Default for RuntimeStore<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Component> RuntimeStore<C> {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Store whose runtimes are built with `config`
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            runtimes: HashMap::new(),
            config,
        }
    }

    /// The runtime stored under `key`, created from `make` if there is none
    /// or the stored one has stopped
    pub fn get_or_create<F>(&mut self, key: &str, make: F) -> ElmResult<&ComponentRuntime<C>>
    where
        F: FnOnce() -> C,
    {
        let config = self.config.clone();
        let build = move || RuntimeBuilder::new(make()).with_config(config).build();

        match self.runtimes.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                if !entry.get().is_running() {
                    debug!("Replacing stopped runtime for key {}", key);
                    entry.insert(build()?);
                }
                Ok(&*entry.into_mut())
            }
            Entry::Vacant(entry) => Ok(&*entry.insert(build()?)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ComponentRuntime<C>> {
        self.runtimes.get(key)
    }

    /// Tear down and forget the runtime under `key`
    pub fn remove(&mut self, key: &str) -> bool {
        match self.runtimes.remove(key) {
            Some(runtime) => {
                runtime.teardown();
                true
            }
            None => false,
        }
    }

    /// Tear down and forget every runtime
    pub fn clear(&mut self) {
        for (_, runtime) in self.runtimes.drain() {
            runtime.teardown();
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.runtimes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.runtimes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runtimes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elm_core::SimpleComponent;
    use std::time::Duration;

    struct Counter;

    impl SimpleComponent for Counter {
        type State = i32;
        type Msg = i32;

        fn init_state(&self) -> i32 {
            0
        }

        fn simple_update(&self, delta: i32, count: &i32) -> i32 {
            count + delta
        }
    }

    #[tokio::test]
    async fn test_destroyed_tears_down() {
        let runtime = RuntimeBuilder::new(Counter).build().unwrap();
        let (host, events) = mpsc::channel(4);
        let binding = LifecycleBinder::bind(&runtime, events);

        host.send(LifecycleEvent::Created).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(runtime.is_running());
        assert!(binding.is_active());

        host.send(LifecycleEvent::Destroyed).await.unwrap();
        assert_eq!(binding.finished().await, Some(BindingOutcome::Destroyed));
        assert!(!runtime.is_running());
    }

    #[tokio::test]
    async fn test_closed_host_tears_down() {
        let runtime = RuntimeBuilder::new(Counter).build().unwrap();
        let (host, events) = mpsc::unbounded_channel();
        let binding = LifecycleBinder::bind(&runtime, events);

        drop(host);
        assert_eq!(binding.finished().await, Some(BindingOutcome::HostClosed));
        assert!(!runtime.is_running());
    }

    #[tokio::test]
    async fn test_watch_host_and_runtime_stopping_first() {
        let runtime = RuntimeBuilder::new(Counter).build().unwrap();
        let (_host, events) = watch::channel(LifecycleEvent::Created);
        let binding = LifecycleBinder::bind(&runtime, events);

        runtime.teardown();
        assert_eq!(binding.finished().await, Some(BindingOutcome::RuntimeStopped));
    }

    #[tokio::test]
    async fn test_bind_to_already_destroyed_host() {
        let runtime = RuntimeBuilder::new(Counter).build().unwrap();
        let (_host, events) = watch::channel(LifecycleEvent::Destroyed);
        let binding = LifecycleBinder::bind(&runtime, events);

        assert!(!runtime.is_running());
        assert_eq!(binding.finished().await, Some(BindingOutcome::Destroyed));
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_destroyed_host() {
        let runtime = RuntimeBuilder::new(Counter).build().unwrap();
        let (host, _events) = watch::channel(LifecycleEvent::Created);
        host.send(LifecycleEvent::Destroyed).unwrap();

        let binding = LifecycleBinder::bind(&runtime, host.subscribe());
        assert_eq!(binding.finished().await, Some(BindingOutcome::Destroyed));
        assert!(!runtime.is_running());
        assert_eq!(*host.borrow(), LifecycleEvent::Destroyed);
    }

    #[tokio::test]
    async fn test_watch_host_created_then_destroyed() {
        let runtime = RuntimeBuilder::new(Counter).build().unwrap();
        let (host, events) = watch::channel(LifecycleEvent::Created);
        let binding = LifecycleBinder::bind(&runtime, events);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(runtime.is_running());

        host.send(LifecycleEvent::Destroyed).unwrap();
        assert_eq!(binding.finished().await, Some(BindingOutcome::Destroyed));
        assert!(!runtime.is_running());
    }

    #[tokio::test]
    async fn test_unbind_leaves_runtime_running() {
        let runtime = RuntimeBuilder::new(Counter).build().unwrap();
        let (host, events) = mpsc::channel(1);
        LifecycleBinder::bind(&runtime, events).unbind();

        drop(host);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(runtime.is_running());
    }

    #[tokio::test]
    async fn test_store_reuses_runtime_per_key() {
        let mut store = RuntimeStore::new();
        let first = store.get_or_create("first", || Counter).unwrap().id();
        let again = store.get_or_create("first", || Counter).unwrap().id();
        let second = store.get_or_create("second", || Counter).unwrap().id();

        assert_eq!(first, again);
        assert_ne!(first, second);
        assert_eq!(store.len(), 2);

        store.get("first").unwrap().teardown();
        let replaced = store.get_or_create("first", || Counter).unwrap().id();
        assert_ne!(first, replaced);

        assert!(store.remove("second"));
        assert!(!store.remove("second"));
        store.clear();
        assert!(store.is_empty());
    }
}
