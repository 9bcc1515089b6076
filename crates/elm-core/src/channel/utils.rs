//! Channel Utilities
//!
//! - The inbox: an unbounded tokio mpsc channel so that `dispatch` never blocks.
//! - The state channel: replay-latest fan-out of immutable state snapshots. A
//!   new observer first receives the most recently published snapshot, then
//!   every later one, independently of other observers.

use crate::channel::communication::Inbound;
use crate::config::ChannelConfig;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, mpsc};
use tracing::warn;

// ----------------------------------------------------------------------------
// Inbox
// ----------------------------------------------------------------------------

pub type InboxSender<M> = mpsc::UnboundedSender<Inbound<M>>;
pub type InboxReceiver<M> = mpsc::UnboundedReceiver<Inbound<M>>;

/// Create the unbounded inbox feeding a sequencing task
pub fn create_inbox<M>() -> (InboxSender<M>, InboxReceiver<M>) {
    mpsc::unbounded_channel()
}

// ----------------------------------------------------------------------------
// State Channel
// ----------------------------------------------------------------------------

/// Live sequence of published state snapshots
pub type StateStream<S> = BoxStream<'static, Arc<S>>;

/// Create a state channel seeded with the initial state
pub fn create_state_channel<S>(initial: S, config: &ChannelConfig) -> StateChannel<S>
where
    S: Send + Sync + 'static,
{
    StateChannel::new(initial, config.state_buffer_size)
}

struct StateSlot<S> {
    latest: Arc<S>,
    sender: Option<broadcast::Sender<Arc<S>>>,
    published: u64,
}

/// Replay-latest, multi-observer state fan-out
///
/// Publishing and subscribing happen under the same lock, so an observer never
/// misses a snapshot published between reading the latest value and joining
/// the live feed. Once closed, nothing can be published anymore and live
/// streams end after draining what they already buffered.
pub struct StateChannel<S> {
    inner: Arc<Mutex<StateSlot<S>>>,
}

impl<S> Clone for StateChannel<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Send + Sync + 'static> StateChannel<S> {
    /// Create a channel holding `initial` as its latest snapshot
    ///
    /// # Panics
    ///
    /// Panics if `buffer_size` is zero; configurations are validated before a
    /// runtime creates its channel.
    pub fn new(initial: S, buffer_size: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer_size);
        Self {
            inner: Arc::new(Mutex::new(StateSlot {
                latest: Arc::new(initial),
                sender: Some(sender),
                published: 0,
            })),
        }
    }

    fn slot(&self) -> MutexGuard<'_, StateSlot<S>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish a new snapshot to every observer
    ///
    /// Returns `false` once the channel is closed.
    pub fn publish(&self, state: Arc<S>) -> bool {
        let mut slot = self.slot();
        let Some(sender) = slot.sender.as_ref() else {
            return false;
        };
        // No observers is fine: the snapshot is still kept as the latest one
        let _ = sender.send(Arc::clone(&state));
        slot.latest = state;
        slot.published += 1;
        true
    }

    /// Observe the latest snapshot followed by every later one
    pub fn subscribe(&self) -> StateStream<S> {
        let (latest, receiver) = {
            let slot = self.slot();
            (
                Arc::clone(&slot.latest),
                slot.sender.as_ref().map(broadcast::Sender::subscribe),
            )
        };

        stream::unfold((Some(latest), receiver), |(first, receiver)| async move {
            if let Some(state) = first {
                return Some((state, (None, receiver)));
            }
            let mut receiver = receiver?;
            loop {
                match receiver.recv().await {
                    Ok(state) => return Some((state, (None, Some(receiver)))),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("State observer lagged, skipped {} snapshot(s)", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }

    /// Most recently published snapshot
    pub fn latest(&self) -> Arc<S> {
        Arc::clone(&self.slot().latest)
    }

    /// Number of snapshots published after the initial one
    pub fn published(&self) -> u64 {
        self.slot().published
    }

    /// Number of live observers
    pub fn observer_count(&self) -> usize {
        self.slot()
            .sender
            .as_ref()
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Stop publishing; returns `false` if the channel was already closed
    pub fn close(&self) -> bool {
        self.slot().sender.take().is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.slot().sender.is_none()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MessageOrigin;

    fn values(states: Vec<Arc<u32>>) -> Vec<u32> {
        states.into_iter().map(|s| *s).collect()
    }

    #[tokio::test]
    async fn test_inbox_creation() {
        let (sender, mut receiver) = create_inbox::<&str>();
        sender
            .send(Inbound::message(MessageOrigin::Host, "hello"))
            .unwrap();

        match receiver.recv().await {
            Some(Inbound::Message { origin, msg }) => {
                assert_eq!(origin, MessageOrigin::Host);
                assert_eq!(msg, "hello");
            }
            other => panic!("Unexpected inbound: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_late_observer_sees_latest_first() {
        let channel = create_state_channel(0u32, &ChannelConfig::default());
        channel.publish(Arc::new(1));
        channel.publish(Arc::new(2));

        let mut late = channel.subscribe();
        assert_eq!(*late.next().await.unwrap(), 2);

        channel.publish(Arc::new(3));
        assert_eq!(*late.next().await.unwrap(), 3);
        assert_eq!(channel.published(), 3);
    }

    #[tokio::test]
    async fn test_observers_get_independent_sequences() {
        let channel = create_state_channel(0u32, &ChannelConfig::default());
        let first = channel.subscribe();
        let second = channel.subscribe();
        assert_eq!(channel.observer_count(), 2);

        for value in 1..=3 {
            channel.publish(Arc::new(value));
        }
        channel.close();

        assert_eq!(values(first.collect().await), vec![0, 1, 2, 3]);
        assert_eq!(values(second.collect().await), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_closed_channel_rejects_publish() {
        let channel = create_state_channel(5u32, &ChannelConfig::default());
        assert!(channel.close());
        assert!(!channel.close());
        assert!(channel.is_closed());
        assert!(!channel.publish(Arc::new(6)));

        // A late observer still gets the last snapshot, then the stream ends
        assert_eq!(values(channel.subscribe().collect().await), vec![5]);
        assert_eq!(*channel.latest(), 5);
    }

    #[tokio::test]
    async fn test_lagging_observer_skips_overwritten_snapshots() {
        let channel = StateChannel::new(0u32, 2);
        let observer = channel.subscribe();
        for value in 1..=5 {
            channel.publish(Arc::new(value));
        }
        channel.close();

        assert_eq!(values(observer.collect().await), vec![0, 4, 5]);
    }
}
