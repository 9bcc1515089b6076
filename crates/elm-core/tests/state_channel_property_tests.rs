//! Property-based tests for the replay-latest state channel
//!
//! An observer joining at any point first sees the snapshot that was latest
//! when it joined, then later snapshots in publish order. A lagging observer
//! may lose older snapshots but never sees them out of order, and always ends
//! on the last one.

use elm_core::channel::StateChannel;
use futures::executor::block_on;
use futures::StreamExt;
use proptest::prelude::*;
use std::sync::Arc;

/// Initial state plus the snapshots to publish
fn arb_history() -> impl Strategy<Value = (u16, Vec<u16>)> {
    (any::<u16>(), prop::collection::vec(any::<u16>(), 0..40))
}

/// Publish `before`, subscribe, publish `after`, close, and collect what the
/// observer received
fn observe(initial: u16, before: &[u16], after: &[u16], buffer_size: usize) -> Vec<u16> {
    let channel = StateChannel::new(initial, buffer_size);
    for value in before {
        channel.publish(Arc::new(*value));
    }
    let observer = channel.subscribe();
    for value in after {
        channel.publish(Arc::new(*value));
    }
    channel.close();

    block_on(observer.map(|state| *state).collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Property: with room for every snapshot, a late observer sees the latest
    /// snapshot at join time followed by everything published afterwards
    #[test]
    fn late_observer_sees_latest_then_live(
        (initial, values) in arb_history(),
        split in any::<prop::sample::Index>(),
    ) {
        let join_at = split.index(values.len() + 1);
        let (before, after) = values.split_at(join_at);

        let mut expected = vec![before.last().copied().unwrap_or(initial)];
        expected.extend_from_slice(after);

        prop_assert_eq!(observe(initial, before, after, 64), expected);
    }

    /// Property: a lagging observer keeps the replayed snapshot, then only the
    /// newest snapshots the buffer still holds, in publish order
    #[test]
    fn lagging_observer_keeps_newest_in_order(
        (initial, values) in arb_history(),
        split in any::<prop::sample::Index>(),
        buffer_size in prop_oneof![Just(1usize), Just(2), Just(4)],
    ) {
        let join_at = split.index(values.len() + 1);
        let (before, after) = values.split_at(join_at);

        let kept = after.len().min(buffer_size);
        let mut expected = vec![before.last().copied().unwrap_or(initial)];
        expected.extend_from_slice(&after[after.len() - kept..]);

        prop_assert_eq!(observe(initial, before, after, buffer_size), expected);
    }

    /// Property: observers joining at the same point see identical sequences
    #[test]
    fn observers_joining_together_agree((initial, values) in arb_history()) {
        let channel = StateChannel::new(initial, 64);
        let first = channel.subscribe();
        let second = channel.subscribe();
        for value in &values {
            channel.publish(Arc::new(*value));
        }
        channel.close();

        let first: Vec<u16> = block_on(first.map(|state| *state).collect());
        let second: Vec<u16> = block_on(second.map(|state| *state).collect());
        prop_assert_eq!(first.len(), values.len() + 1);
        prop_assert_eq!(first, second);
    }
}
