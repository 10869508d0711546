//! Multi-subscriber listener lists.
//!
//! Listeners are plain closures invoked synchronously, in registration
//! order, on the thread that publishes. The list is cloned before delivery
//! so a listener may subscribe or unsubscribe re-entrantly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::adapters::websocket::InboundMessage;
use crate::domain::foundation::ClientError;
use crate::domain::round::{OutcomeEvent, ProjectionChange, SessionSnapshot};

static NEXT_SUBSCRIPTION: AtomicU64 = AtomicU64::new(1);

/// Token returned by every `subscribe`, unique per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    fn next() -> Self {
        Self(NEXT_SUBSCRIPTION.fetch_add(1, Ordering::Relaxed))
    }
}

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Ordered list of listeners for one event type.
pub struct Listeners<T> {
    entries: RwLock<Vec<(SubscriptionId, Listener<T>)>>,
}

impl<T: 'static> Listeners<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Registers a listener.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SubscriptionId::next();
        let listener: Listener<T> = Arc::new(listener);
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((id, listener));
        id
    }

    /// Removes exactly the listener registered under `id`.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    /// Delivers a value to every listener.
    pub fn notify(&self, value: &T) {
        // Clone listeners to release the lock before invoking them
        let listeners: Vec<Listener<T>> = self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in listeners {
            listener(value);
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: 'static> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Listener lists for everything the session client publishes, apart
/// from connection state (owned by the transport channel).
#[derive(Default)]
pub struct SessionHub {
    pub snapshots: Listeners<Option<SessionSnapshot>>,
    pub outcomes: Listeners<OutcomeEvent>,
    pub errors: Listeners<ClientError>,
    pub messages: Listeners<InboundMessage>,
}

impl SessionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Republishes one projection change.
    pub fn publish(&self, change: &ProjectionChange) {
        match change {
            ProjectionChange::SnapshotChanged(snapshot) => self.snapshots.notify(snapshot),
            ProjectionChange::Outcome(outcome) => self.outcomes.notify(outcome),
            ProjectionChange::PickConfirmed(number) => {
                tracing::debug!(number, "pick confirmed");
            }
        }
    }

    /// Removes a listener from whichever list holds it.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.snapshots.unsubscribe(id)
            || self.outcomes.unsubscribe(id)
            || self.errors.unsubscribe(id)
            || self.messages.unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn listeners_are_called_in_registration_order() {
        let listeners: Listeners<u32> = Listeners::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = seen.clone();
        listeners.subscribe(move |v| s.lock().unwrap().push(("first", *v)));
        let s = seen.clone();
        listeners.subscribe(move |v| s.lock().unwrap().push(("second", *v)));

        listeners.notify(&7);

        assert_eq!(*seen.lock().unwrap(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn unsubscribe_removes_exactly_one_listener() {
        let listeners: Listeners<u32> = Listeners::new();
        let count = Arc::new(Mutex::new(0));

        let c = count.clone();
        let first = listeners.subscribe(move |_| *c.lock().unwrap() += 1);
        let c = count.clone();
        listeners.subscribe(move |_| *c.lock().unwrap() += 10);

        assert!(listeners.unsubscribe(first));
        assert!(!listeners.unsubscribe(first));
        listeners.notify(&0);

        assert_eq!(*count.lock().unwrap(), 10);
        assert_eq!(listeners.len(), 1);
    }

    #[test]
    fn listener_may_unsubscribe_itself_during_delivery() {
        let listeners: Arc<Listeners<u32>> = Arc::new(Listeners::new());
        let calls = Arc::new(Mutex::new(0));
        let own_id: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let l = listeners.clone();
        let c = calls.clone();
        let slot = own_id.clone();
        let id = listeners.subscribe(move |_| {
            *c.lock().unwrap() += 1;
            if let Some(id) = *slot.lock().unwrap() {
                l.unsubscribe(id);
            }
        });
        *own_id.lock().unwrap() = Some(id);

        listeners.notify(&1);
        listeners.notify(&2);

        assert_eq!(*calls.lock().unwrap(), 1);
        assert!(listeners.is_empty());
    }

    #[test]
    fn subscription_ids_are_unique_across_lists() {
        let a: Listeners<u32> = Listeners::new();
        let b: Listeners<String> = Listeners::new();
        assert_ne!(a.subscribe(|_| {}), b.subscribe(|_| {}));
    }

    #[test]
    fn hub_routes_changes_to_matching_lists() {
        let hub = SessionHub::new();
        let snapshots = Arc::new(Mutex::new(0));
        let outcomes = Arc::new(Mutex::new(0));

        let s = snapshots.clone();
        hub.snapshots.subscribe(move |_| *s.lock().unwrap() += 1);
        let o = outcomes.clone();
        let outcome_id = hub.outcomes.subscribe(move |_| *o.lock().unwrap() += 1);

        hub.publish(&ProjectionChange::SnapshotChanged(None));
        hub.publish(&ProjectionChange::PickConfirmed(3));
        assert!(hub.unsubscribe(outcome_id));

        assert_eq!(*snapshots.lock().unwrap(), 1);
        assert_eq!(*outcomes.lock().unwrap(), 0);
    }
}
