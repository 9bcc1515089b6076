//! Subscription Manager
//!
//! Keeps the set of running subscription instances in line with the current
//! state. Instances are tagged with a generation so that the sequencing task
//! can tell messages of a replaced instance apart from those of the live one.

use crate::logic::LoggerWrapper;
use crate::tasks::{TaskContext, TaskKey};
use elm_core::channel::{Inbound, MessageOrigin};
use elm_core::task_logging::TaskId;
use elm_core::{BoxedSubscription, MsgStream, RestartPolicy, RuntimeFault};
use futures::stream::StreamExt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::debug;

// ----------------------------------------------------------------------------
// Subscription Manager
// ----------------------------------------------------------------------------

/// Starts, restarts and stops the declared subscriptions of one runtime
pub struct SubscriptionManager<S, M> {
    subscriptions: Vec<BoxedSubscription<S, M>>,
    /// Generation of the running instance, per declared subscription
    running: Vec<Option<u64>>,
    next_generation: u64,
    policy: RestartPolicy,
    context: TaskContext<M>,
    logger: LoggerWrapper,
}

impl<S: 'static, M: Send + 'static> SubscriptionManager<S, M> {
    pub(crate) fn new(
        subscriptions: Vec<BoxedSubscription<S, M>>,
        policy: RestartPolicy,
        context: TaskContext<M>,
        logger: LoggerWrapper,
    ) -> Self {
        let running = vec![None; subscriptions.len()];
        Self {
            subscriptions,
            running,
            next_generation: 1,
            policy,
            context,
            logger,
        }
    }

    /// Start every subscription active for the initial state
    pub fn start_initial(&mut self, state: &S) -> Result<(), RuntimeFault> {
        for index in 0..self.subscriptions.len() {
            self.guarded(index, |manager| {
                if manager.subscriptions[index].is_active(state) {
                    manager.start(index, state);
                }
            })?;
        }
        Ok(())
    }

    /// Reconcile running instances with the transition from `prev` to `next`
    pub fn reconcile(&mut self, prev: &S, next: &S) -> Result<(), RuntimeFault> {
        for index in 0..self.subscriptions.len() {
            self.guarded(index, |manager| manager.reconcile_one(index, prev, next))?;
        }
        Ok(())
    }

    fn reconcile_one(&mut self, index: usize, prev: &S, next: &S) {
        let subscription = &self.subscriptions[index];
        let active = subscription.is_active(next);

        match (self.running[index], active) {
            (Some(_), true) => {
                if subscription.is_distinct(prev, next) {
                    self.restart(index, next);
                }
            }
            (None, true) => self.start(index, next),
            (Some(_), false) => self.stop(index),
            (None, false) => {}
        }
    }

    /// Run author code for one subscription, turning a panic into a fault
    fn guarded<F>(&mut self, index: usize, f: F) -> Result<(), RuntimeFault>
    where
        F: FnOnce(&mut Self),
    {
        catch_unwind(AssertUnwindSafe(|| f(self))).map_err(|payload| {
            RuntimeFault::SubscriptionPanicked {
                index,
                reason: RuntimeFault::panic_reason(payload.as_ref()),
            }
        })
    }

    fn restart(&mut self, index: usize, state: &S) {
        self.logger
            .log_task_event(TaskId::Subscription(index), "restarting on distinct state change");
        match self.policy {
            RestartPolicy::StopThenStart => {
                self.stop(index);
                self.start(index, state);
            }
            RestartPolicy::Overlap => {
                let previous = self.running[index].take();
                self.start(index, state);
                if let Some(generation) = previous {
                    self.abort_instance(index, generation);
                }
            }
        }
    }

    fn start(&mut self, index: usize, state: &S) {
        let stream = self.subscriptions[index].start(state);
        let generation = self.next_generation;
        self.next_generation += 1;

        let context = self.context.clone();
        let spawned = self.context.spawn(
            TaskKey::Subscription { index, generation },
            run_subscription(context, index, generation, stream),
        );
        if !spawned {
            return;
        }

        self.running[index] = Some(generation);
        self.context.stats().record_subscription_started();
        self.logger.log_task_event(
            TaskId::Subscription(index),
            &format!("started {} (gen {})", self.subscriptions[index].name(), generation),
        );
    }

    fn stop(&mut self, index: usize) {
        if let Some(generation) = self.running[index].take() {
            self.abort_instance(index, generation);
        }
    }

    fn abort_instance(&self, index: usize, generation: u64) {
        self.context
            .tasks()
            .abort(&TaskKey::Subscription { index, generation });
        self.context.stats().record_subscriptions_stopped(1);
        self.logger.log_task_event(
            TaskId::Subscription(index),
            &format!("stopped {} (gen {})", self.subscriptions[index].name(), generation),
        );
    }

    /// Whether a message from this instance may still be applied
    pub fn accepts(&self, index: usize, generation: u64) -> bool {
        match self.policy {
            RestartPolicy::Overlap => true,
            RestartPolicy::StopThenStart => {
                self.running.get(index).copied().flatten() == Some(generation)
            }
        }
    }

    /// Whether the subscription at `index` currently has a running instance
    pub fn is_running(&self, index: usize) -> bool {
        self.running.get(index).is_some_and(Option::is_some)
    }

    pub fn running_count(&self) -> usize {
        self.running.iter().filter(|slot| slot.is_some()).count()
    }
}

/// Forward every message of a subscription instance into the inbox
async fn run_subscription<M: Send + 'static>(
    context: TaskContext<M>,
    index: usize,
    generation: u64,
    stream: MsgStream<M>,
) {
    let origin = MessageOrigin::Subscription { index, generation };
    let mut stream = AssertUnwindSafe(stream).catch_unwind();

    while let Some(item) = stream.next().await {
        match item {
            Ok(msg) => {
                if !context.forward(origin, msg) {
                    return;
                }
            }
            Err(payload) => {
                context.report(Inbound::Fault(RuntimeFault::SubscriptionPanicked {
                    index,
                    reason: RuntimeFault::panic_reason(payload.as_ref()),
                }));
                return;
            }
        }
    }

    debug!("Subscription #{} gen:{} ended", index, generation);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::RuntimeStats;
    use crate::tasks::TaskRegistry;
    use elm_core::channel::{create_inbox, InboxReceiver};
    use elm_core::subscription::{every, FnSubscription};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::runtime::Handle;

    #[derive(Debug, Clone, PartialEq)]
    struct Clock {
        on: bool,
        mode: u8,
    }

    fn clock(on: bool, mode: u8) -> Clock {
        Clock { on, mode }
    }

    fn manager(
        policy: RestartPolicy,
        starts: Arc<AtomicUsize>,
    ) -> (SubscriptionManager<Clock, &'static str>, InboxReceiver<&'static str>) {
        let (inbox, receiver) = create_inbox();
        let context = TaskContext::new(
            Handle::current(),
            inbox,
            TaskRegistry::new(),
            Arc::new(AtomicBool::new(false)),
            Arc::new(RuntimeStats::default()),
        );
        let ticker = FnSubscription::new("ticker", move |_: &Clock| {
            starts.fetch_add(1, Ordering::SeqCst);
            every(Duration::from_secs(1), || "tick")
        })
        .active_when(|state: &Clock| state.on)
        .distinct_when(|prev: &Clock, next: &Clock| prev.mode != next.mode);

        let manager = SubscriptionManager::new(
            vec![ticker.boxed()],
            policy,
            context,
            LoggerWrapper::for_level(Default::default()),
        );
        (manager, receiver)
    }

    #[tokio::test]
    async fn test_inactive_subscription_is_not_started() {
        let starts = Arc::new(AtomicUsize::new(0));
        let (mut manager, _receiver) = manager(RestartPolicy::default(), starts.clone());

        manager.start_initial(&clock(false, 0)).unwrap();
        assert_eq!(starts.load(Ordering::SeqCst), 0);
        assert!(!manager.is_running(0));

        manager.reconcile(&clock(false, 0), &clock(true, 0)).unwrap();
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert!(manager.is_running(0));
    }

    #[tokio::test]
    async fn test_non_distinct_changes_keep_instance() {
        let starts = Arc::new(AtomicUsize::new(0));
        let (mut manager, _receiver) = manager(RestartPolicy::default(), starts.clone());
        manager.start_initial(&clock(true, 0)).unwrap();

        let state = clock(true, 0);
        for _ in 0..10 {
            manager.reconcile(&state, &state.clone()).unwrap();
        }
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert!(manager.accepts(0, 1));
    }

    #[tokio::test]
    async fn test_stop_then_start_rejects_old_generation() {
        let starts = Arc::new(AtomicUsize::new(0));
        let (mut manager, _receiver) = manager(RestartPolicy::StopThenStart, starts.clone());
        manager.start_initial(&clock(true, 0)).unwrap();
        manager.reconcile(&clock(true, 0), &clock(true, 1)).unwrap();

        assert_eq!(starts.load(Ordering::SeqCst), 2);
        assert!(!manager.accepts(0, 1));
        assert!(manager.accepts(0, 2));
        assert!(!manager.context.tasks().contains(&TaskKey::Subscription {
            index: 0,
            generation: 1
        }));

        manager.reconcile(&clock(true, 1), &clock(false, 1)).unwrap();
        assert_eq!(manager.running_count(), 0);
        assert!(!manager.accepts(0, 2));
        let stats = manager.context.stats().snapshot();
        assert_eq!(stats.subscriptions_started, 2);
        assert_eq!(stats.subscriptions_stopped, 2);
    }

    #[tokio::test]
    async fn test_overlap_accepts_old_generation() {
        let starts = Arc::new(AtomicUsize::new(0));
        let (mut manager, _receiver) = manager(RestartPolicy::Overlap, starts.clone());
        manager.start_initial(&clock(true, 0)).unwrap();
        manager.reconcile(&clock(true, 0), &clock(true, 1)).unwrap();

        assert!(manager.accepts(0, 1));
        assert!(manager.accepts(0, 2));
        assert!(manager.context.tasks().contains(&TaskKey::Subscription {
            index: 0,
            generation: 2
        }));
    }

    #[tokio::test]
    async fn test_panicking_predicate_becomes_fault() {
        let (inbox, _receiver) = create_inbox::<&'static str>();
        let context = TaskContext::new(
            Handle::current(),
            inbox,
            TaskRegistry::new(),
            Arc::new(AtomicBool::new(false)),
            Arc::new(RuntimeStats::default()),
        );
        let broken = FnSubscription::new("broken", |_: &Clock| every(Duration::from_secs(1), || "tick"))
            .active_when(|_: &Clock| panic!("no opinion"));
        let mut manager = SubscriptionManager::new(
            vec![broken.boxed()],
            RestartPolicy::default(),
            context,
            LoggerWrapper::for_level(Default::default()),
        );

        let fault = manager.start_initial(&clock(true, 0)).unwrap_err();
        assert_eq!(
            fault,
            RuntimeFault::SubscriptionPanicked {
                index: 0,
                reason: "no opinion".into()
            }
        );
    }
}
