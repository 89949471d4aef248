//! Event bus owned by a single instance
//!
//! Every phase transition is emitted as a named event on this channel,
//! independently of the hook-function chain. Subscribers run synchronously in
//! registration order; emission snapshots the list, so a subscriber added
//! while an event is being delivered first sees the next emission.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::component::instance::Instance;

/// Callback registered on the bus for one event name.
pub type Subscriber =
    Arc<dyn Fn(&mut Instance, &Value) -> anyhow::Result<()> + Send + Sync>;

/// Handle returned by [`EventBus::on`], used to cancel a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    id: u64,
}

/// Ordered subscriber lists keyed by event name.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: HashMap<String, Vec<(u64, Subscriber)>>,
    next_id: u64,
}

impl EventBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber; invoked in registration order on every emission
    /// of `event`.
    pub fn on(&mut self, event: impl Into<String>, subscriber: Subscriber) -> Subscription {
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers
            .entry(event.into())
            .or_default()
            .push((id, subscriber));
        Subscription { id }
    }

    /// Remove a subscription. Returns false if it was not found.
    pub fn off(&mut self, subscription: Subscription) -> bool {
        for list in self.subscribers.values_mut() {
            if let Some(position) = list.iter().position(|(id, _)| *id == subscription.id) {
                list.remove(position);
                return true;
            }
        }
        false
    }

    /// Snapshot of the subscribers for `event`, in registration order.
    pub(crate) fn subscribers(&self, event: &str) -> Vec<Subscriber> {
        self.subscribers
            .get(event)
            .map(|list| list.iter().map(|(_, s)| Arc::clone(s)).collect())
            .unwrap_or_default()
    }

    /// Number of live subscriptions for `event`.
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.subscribers.get(event).map_or(0, Vec::len)
    }
}
