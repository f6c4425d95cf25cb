//! Subscription registry — event-kind to callback fan-out.
//!
//! Maps each [`EventKind`] to an ordered list of callbacks. Dispatch
//! snapshots the list before iterating, so subscribe/unsubscribe during an
//! in-flight dispatch can never corrupt the iteration. A panicking callback
//! is isolated and logged; its siblings still run and the transport stays up.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use ahash::AHashMap;
use parking_lot::Mutex;
use tc_core::{EventKind, StreamEvent};
use tracing::error;

/// Callback invoked for each event of a subscribed kind.
pub type EventCallback = dyn Fn(&StreamEvent) + Send + Sync;

struct Entry {
    id: u64,
    callback: Arc<EventCallback>,
}

/// Registry of per-kind subscriber lists.
#[derive(Default)]
pub struct SubscriptionRegistry {
    subscribers: Mutex<AHashMap<EventKind, Vec<Entry>>>,
    next_id: AtomicU64,
}

impl SubscriptionRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a callback for one event kind.
    ///
    /// Callbacks for a kind are invoked in registration order, synchronously,
    /// for each matching event. The returned handle removes exactly this
    /// registration.
    pub fn subscribe(
        self: &Arc<Self>,
        kind: EventKind,
        callback: impl Fn(&StreamEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .lock()
            .entry(kind)
            .or_default()
            .push(Entry { id, callback: Arc::new(callback) });
        Subscription {
            registry: Arc::downgrade(self),
            kind,
            id,
            released: AtomicBool::new(false),
        }
    }

    /// Dispatch one event to every subscriber of its kind.
    pub fn dispatch(&self, event: &StreamEvent) {
        let snapshot: Vec<Arc<EventCallback>> = {
            let subscribers = self.subscribers.lock();
            match subscribers.get(&event.kind()) {
                Some(entries) => entries.iter().map(|e| Arc::clone(&e.callback)).collect(),
                None => return,
            }
        };
        for callback in snapshot {
            if panic::catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                error!(kind = %event.kind(), "subscriber callback panicked; remaining subscribers still run");
            }
        }
    }

    fn unsubscribe(&self, kind: EventKind, id: u64) {
        let mut subscribers = self.subscribers.lock();
        if let Some(entries) = subscribers.get_mut(&kind) {
            entries.retain(|e| e.id != id);
            if entries.is_empty() {
                subscribers.remove(&kind);
            }
        }
    }

    /// Remove every registration (full disconnect).
    pub fn clear(&self) {
        self.subscribers.lock().clear();
    }

    /// Total registered callbacks across all kinds.
    pub fn len(&self) -> usize {
        self.subscribers.lock().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Opaque unsubscribe capability returned by
/// [`subscribe`](SubscriptionRegistry::subscribe).
///
/// Calling [`unsubscribe`](Self::unsubscribe) more than once is a no-op —
/// each handle's id is unique, so a spent handle can never remove a later
/// registration.
pub struct Subscription {
    registry: Weak<SubscriptionRegistry>,
    kind: EventKind,
    id: u64,
    released: AtomicBool,
}

impl Subscription {
    /// Remove this registration. Idempotent.
    pub fn unsubscribe(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return; // already released
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.unsubscribe(self.kind, self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tc_core::PingEvent;

    fn ping() -> StreamEvent {
        StreamEvent::Ping(PingEvent::default())
    }

    #[test]
    fn callbacks_run_in_registration_order() {
        let registry = SubscriptionRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o = Arc::clone(&order);
        let _a = registry.subscribe(EventKind::Ping, move |_| o.lock().push("a"));
        let o = Arc::clone(&order);
        let _b = registry.subscribe(EventKind::Ping, move |_| o.lock().push("b"));

        registry.dispatch(&ping());
        assert_eq!(*order.lock(), vec!["a", "b"]);
    }

    #[test]
    fn panicking_callback_does_not_starve_siblings() {
        let registry = SubscriptionRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let _bad = registry.subscribe(EventKind::Ping, |_| panic!("subscriber bug"));
        let h = Arc::clone(&hits);
        let _good = registry.subscribe(EventKind::Ping, move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        registry.dispatch(&ping());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let registry = SubscriptionRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let h = Arc::clone(&hits);
        let first = registry.subscribe(EventKind::Ping, move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        first.unsubscribe();

        // A second subscriber registered after the first was released must
        // survive a duplicate unsubscribe of the spent handle.
        let h = Arc::clone(&hits);
        let _second = registry.subscribe(EventKind::Ping, move |_| {
            h.fetch_add(10, Ordering::SeqCst);
        });
        first.unsubscribe();

        registry.dispatch(&ping());
        assert_eq!(hits.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn dispatch_only_reaches_matching_kind() {
        let registry = SubscriptionRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let h = Arc::clone(&hits);
        let _sub = registry.subscribe(EventKind::Positions, move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        registry.dispatch(&ping());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn subscribing_from_a_callback_does_not_deadlock() {
        let registry = SubscriptionRegistry::new();
        let inner = Arc::new(Mutex::new(Vec::new()));

        let reg = Arc::clone(&registry);
        let store = Arc::clone(&inner);
        let _outer = registry.subscribe(EventKind::Ping, move |_| {
            // The dispatch snapshot released the lock, so this is safe.
            store.lock().push(reg.subscribe(EventKind::Ping, |_| {}));
        });

        registry.dispatch(&ping());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn clear_releases_everything() {
        let registry = SubscriptionRegistry::new();
        let _a = registry.subscribe(EventKind::Ping, |_| {});
        let _b = registry.subscribe(EventKind::Equity, |_| {});
        assert_eq!(registry.len(), 2);

        registry.clear();
        assert!(registry.is_empty());
    }
}
