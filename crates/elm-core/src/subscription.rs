//! Subscriptions
//!
//! A subscription is a long-running message source whose lifetime is driven by
//! the component state. For every state transition the runtime asks each
//! declared subscription two questions:
//!
//! - [`Subscription::is_active`]: should it be running for the new state?
//! - [`Subscription::is_distinct`]: if it is already running, did the state
//!   change in a way that requires restarting it?
//!
//! A running instance is left untouched while it stays active and no distinct
//! change is reported, so a timer keeps ticking across unrelated state changes.

use futures::stream::{self, BoxStream, StreamExt};
use std::time::Duration;
use tokio::time::{self, Instant};

/// Stream of messages produced by one running subscription instance
pub type MsgStream<M> = BoxStream<'static, M>;

/// Owned, type-erased subscription as declared by a component
pub type BoxedSubscription<S, M> = Box<dyn Subscription<S, M>>;

/// A state-activated long-running message source
pub trait Subscription<S, M>: Send + Sync + 'static {
    /// Whether the subscription should be running for `state`
    fn is_active(&self, _state: &S) -> bool {
        true
    }

    /// Whether the change from `prev` to `next` requires restarting a running
    /// instance. Only consulted while the subscription stays active.
    fn is_distinct(&self, _prev: &S, _next: &S) -> bool {
        false
    }

    /// Start producing messages, seeded with the current state
    fn start(&self, state: &S) -> MsgStream<M>;

    /// Name used in logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

// ----------------------------------------------------------------------------
// Closure-based Subscriptions
// ----------------------------------------------------------------------------

type ActivePredicate<S> = Box<dyn Fn(&S) -> bool + Send + Sync>;
type DistinctPredicate<S> = Box<dyn Fn(&S, &S) -> bool + Send + Sync>;
type Starter<S, M> = Box<dyn Fn(&S) -> MsgStream<M> + Send + Sync>;

/// Subscription assembled from closures
///
/// ```rust
/// use elm_core::subscription::{every, FnSubscription};
/// use std::time::Duration;
///
/// #[derive(Debug)]
/// struct Timer { running: bool }
/// #[derive(Debug)]
/// enum Msg { Tick }
///
/// let ticker = FnSubscription::new("ticker", |_: &Timer| every(Duration::from_secs(1), || Msg::Tick))
///     .active_when(|state: &Timer| state.running)
///     .distinct_when(|prev: &Timer, next: &Timer| prev.running != next.running);
/// # let _ = ticker.boxed();
/// ```
pub struct FnSubscription<S, M> {
    name: String,
    active: ActivePredicate<S>,
    distinct: DistinctPredicate<S>,
    start: Starter<S, M>,
}

impl<S: 'static, M: 'static> FnSubscription<S, M> {
    /// Always-active subscription that is never restarted
    pub fn new<N, F>(name: N, start: F) -> Self
    where
        N: Into<String>,
        F: Fn(&S) -> MsgStream<M> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            active: Box::new(|_| true),
            distinct: Box::new(|_, _| false),
            start: Box::new(start),
        }
    }

    /// Set the activation predicate
    pub fn active_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        self.active = Box::new(predicate);
        self
    }

    /// Set the distinctness check
    pub fn distinct_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&S, &S) -> bool + Send + Sync + 'static,
    {
        self.distinct = Box::new(predicate);
        self
    }

    pub fn boxed(self) -> BoxedSubscription<S, M> {
        Box::new(self)
    }
}

impl<S: 'static, M: 'static> Subscription<S, M> for FnSubscription<S, M> {
    fn is_active(&self, state: &S) -> bool {
        (self.active)(state)
    }

    fn is_distinct(&self, prev: &S, next: &S) -> bool {
        (self.distinct)(prev, next)
    }

    fn start(&self, state: &S) -> MsgStream<M> {
        (self.start)(state)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ----------------------------------------------------------------------------
// Timer Sources
// ----------------------------------------------------------------------------

/// Produce a message every `period`, the first one after a full period
///
/// # Panics
///
/// Panics if `period` is zero.
pub fn every<M, F>(period: Duration, make_msg: F) -> MsgStream<M>
where
    F: FnMut() -> M + Send + 'static,
    M: Send + 'static,
{
    let ticker = time::interval_at(Instant::now() + period, period);
    stream::unfold((ticker, make_msg), |(mut ticker, mut make_msg)| async move {
        ticker.tick().await;
        let msg = make_msg();
        Some((msg, (ticker, make_msg)))
    })
    .boxed()
}

/// Produce a single message after `delay`
pub fn after<M: Send + 'static>(delay: Duration, msg: M) -> MsgStream<M> {
    stream::once(async move {
        time::sleep(delay).await;
        msg
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Clock {
        on: bool,
        ticks: u32,
    }

    #[derive(Debug, PartialEq)]
    enum Msg {
        Tick,
        Done,
    }

    struct Ticker;

    impl Subscription<Clock, Msg> for Ticker {
        fn start(&self, _state: &Clock) -> MsgStream<Msg> {
            every(Duration::from_secs(1), || Msg::Tick)
        }
    }

    #[test]
    fn test_trait_defaults() {
        let clock = Clock { on: false, ticks: 0 };
        assert!(Ticker.is_active(&clock));
        assert!(!Ticker.is_distinct(&clock, &Clock { on: true, ticks: 3 }));
        assert!(Ticker.name().ends_with("Ticker"));
    }

    #[test]
    fn test_fn_subscription_predicates() {
        let sub = FnSubscription::new("clock", |_: &Clock| after(Duration::ZERO, Msg::Done))
            .active_when(|state: &Clock| state.on)
            .distinct_when(|prev: &Clock, next: &Clock| prev.on != next.on);

        let off = Clock { on: false, ticks: 0 };
        let on = Clock { on: true, ticks: 0 };
        let on_later = Clock { on: true, ticks: 5 };

        assert!(!sub.is_active(&off));
        assert!(sub.is_active(&on));
        assert!(sub.is_distinct(&off, &on));
        assert!(!sub.is_distinct(&on, &on_later));
        assert_eq!(sub.name(), "clock");
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_waits_a_full_period_before_first_message() {
        let started = Instant::now();
        let ticks: Vec<Msg> = every(Duration::from_secs(1), || Msg::Tick).take(3).collect().await;
        assert_eq!(ticks, vec![Msg::Tick, Msg::Tick, Msg::Tick]);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_after_produces_once() {
        let started = Instant::now();
        let produced: Vec<Msg> = after(Duration::from_millis(250), Msg::Done).collect().await;
        assert_eq!(produced, vec![Msg::Done]);
        assert_eq!(started.elapsed(), Duration::from_millis(250));
    }
}
