//! Refresh notifier broadcasting to subscribers.

use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use super::types::{RefreshEvent, RefreshFilter, RefreshHandle, SubscriptionId};

/// Internal subscriber state.
struct Subscriber {
    filter: RefreshFilter,
    sender: Sender<RefreshEvent>,
}

impl Subscriber {
    /// Try to send an event. Returns false if the subscriber should be dropped.
    fn try_send(&self, event: RefreshEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => false,
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Fan-out of refresh signals.
pub struct RefreshNotifier {
    /// Active subscribers by ID.
    subscribers: RwLock<HashMap<SubscriptionId, Subscriber>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
}

impl RefreshNotifier {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a subscriber.
    pub fn subscribe(&self, filter: RefreshFilter) -> RefreshHandle {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(filter.buffer_size.max(1));

        self.subscribers
            .write()
            .insert(id, Subscriber { filter, sender });

        RefreshHandle { id, receiver }
    }

    /// Remove a subscriber. Its receiver disconnects once drained.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.write().remove(&id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Deliver an event to every matching subscriber, dropping the ones
    /// that are full or gone.
    pub fn notify(&self, event: RefreshEvent) {
        let mut to_remove = Vec::new();

        {
            let subs = self.subscribers.read();
            for (id, sub) in subs.iter() {
                if sub.filter.matches(&event) && !sub.try_send(event.clone()) {
                    to_remove.push(*id);
                }
            }
        }

        if !to_remove.is_empty() {
            let mut subs = self.subscribers.write();
            for id in to_remove {
                debug!(subscription = id.0, "dropping slow refresh subscriber");
                subs.remove(&id);
            }
        }
    }
}

impl Default for RefreshNotifier {
    fn default() -> Self {
        Self::new()
    }
}
