// crates/worldview-core/src/bus.rs

//! # Change Bus
//!
//! In-process publish/subscribe with zero-payload events. Writers publish a
//! topic; observers re-read whatever state they display. There is no
//! history: a subscriber only sees publishes that happen while it is
//! subscribed.

use crate::common::{SAVED_SET_KEY, TOPIC_SAVE_STATE_CHANGED, TOPIC_VIEW_COUNT_CHANGED, VIEW_COUNT_PREFIX};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tracing::trace;

type Handler = Rc<dyn Fn()>;

struct Entry {
    id: u64,
    topic: String,
    handler: Handler,
    live: Rc<Cell<bool>>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<Entry>,
}

/// Cheap to clone; clones share one handler registry.
#[derive(Clone, Default)]
pub struct ChangeBus {
    registry: Rc<RefCell<Registry>>,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `topic`. Delivery stops when the returned
    /// [`Subscription`] is cancelled or dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, topic: impl Into<String>, handler: impl Fn() + 'static) -> Subscription {
        let live = Rc::new(Cell::new(true));
        let mut reg = self.registry.borrow_mut();
        let id = reg.next_id;
        reg.next_id += 1;
        reg.entries.push(Entry {
            id,
            topic: topic.into(),
            handler: Rc::new(handler),
            live: Rc::clone(&live),
        });
        Subscription {
            registry: Rc::downgrade(&self.registry),
            id,
            live,
        }
    }

    /// Invoke every handler subscribed to `topic`, in subscription order,
    /// before returning. Returns how many handlers ran.
    ///
    /// Handlers may subscribe, cancel or publish themselves. Anything
    /// subscribed during this call is not part of this delivery; anything
    /// cancelled during it is skipped if it has not run yet.
    pub fn publish(&self, topic: &str) -> usize {
        let targets: Vec<(Handler, Rc<Cell<bool>>)> = self
            .registry
            .borrow()
            .entries
            .iter()
            .filter(|e| e.topic == topic)
            .map(|e| (Rc::clone(&e.handler), Rc::clone(&e.live)))
            .collect();

        let mut delivered = 0;
        for (handler, live) in targets {
            if live.get() {
                handler();
                delivered += 1;
            }
        }
        trace!(topic, delivered, "published");
        delivered
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.registry
            .borrow()
            .entries
            .iter()
            .filter(|e| e.topic == topic)
            .count()
    }
}

/// Handle returned by [`ChangeBus::subscribe`].
pub struct Subscription {
    registry: Weak<RefCell<Registry>>,
    id: u64,
    live: Rc<Cell<bool>>,
}

impl Subscription {
    /// Stop deliveries. Safe to call any number of times.
    pub fn cancel(&self) {
        if !self.live.replace(false) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().entries.retain(|e| e.id != self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.live.get()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

enum KeyPattern {
    Exact(String),
    Prefix(String),
}

impl KeyPattern {
    fn matches(&self, key: &str) -> bool {
        match self {
            KeyPattern::Exact(k) => k == key,
            KeyPattern::Prefix(p) => key.starts_with(p.as_str()),
        }
    }
}

/// Republishes storage-level change signals (e.g. another browser tab
/// writing the same persisted keys) as bus topics.
///
/// Platform glue feeds changed keys into [`StorageBridge::notify_key`]; the
/// bus itself never learns where the signal came from.
pub struct StorageBridge {
    bus: ChangeBus,
    routes: Vec<(KeyPattern, String)>,
}

impl StorageBridge {
    /// Bridge with no routes.
    pub fn empty(bus: ChangeBus) -> Self {
        Self {
            bus,
            routes: Vec::new(),
        }
    }

    /// `saved-set` → `save-state-changed`, `viewcount:*` → `view-count-changed`.
    pub fn new(bus: ChangeBus) -> Self {
        Self::empty(bus)
            .route_exact(SAVED_SET_KEY, TOPIC_SAVE_STATE_CHANGED)
            .route_prefix(VIEW_COUNT_PREFIX, TOPIC_VIEW_COUNT_CHANGED)
    }

    pub fn route_exact(mut self, key: impl Into<String>, topic: impl Into<String>) -> Self {
        self.routes.push((KeyPattern::Exact(key.into()), topic.into()));
        self
    }

    pub fn route_prefix(mut self, prefix: impl Into<String>, topic: impl Into<String>) -> Self {
        self.routes.push((KeyPattern::Prefix(prefix.into()), topic.into()));
        self
    }

    /// Forward an external change of `key`. `None` stands for "everything
    /// changed" (a cleared store) and publishes every routed topic.
    ///
    /// Each topic is published at most once per call. Returns the topics
    /// published.
    pub fn notify_key(&self, key: Option<&str>) -> Vec<String> {
        let mut topics: Vec<String> = Vec::new();
        for (pattern, topic) in &self.routes {
            let hit = key.map_or(true, |k| pattern.matches(k));
            if hit && !topics.contains(topic) {
                topics.push(topic.clone());
            }
        }
        for topic in &topics {
            self.bus.publish(topic);
        }
        topics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter(bus: &ChangeBus, topic: &str) -> (Rc<Cell<u32>>, Subscription) {
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let sub = bus.subscribe(topic, move || h.set(h.get() + 1));
        (hits, sub)
    }

    #[test]
    fn dispatch_follows_subscription_order() {
        let bus = ChangeBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let (a, b) = (Rc::clone(&log), Rc::clone(&log));
        let _s1 = bus.subscribe("t", move || a.borrow_mut().push(1));
        let _s2 = bus.subscribe("t", move || b.borrow_mut().push(2));
        assert_eq!(bus.publish("t"), 2);
        assert_eq!(*log.borrow(), [1, 2]);
    }

    #[test]
    fn topics_are_isolated() {
        let bus = ChangeBus::new();
        let (hits, _sub) = counter(&bus, "a");
        assert_eq!(bus.publish("b"), 0);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn cancel_is_idempotent_and_immediate() {
        let bus = ChangeBus::new();
        let (hits, sub) = counter(&bus, "t");
        bus.publish("t");
        sub.cancel();
        sub.cancel();
        bus.publish("t");
        assert_eq!(hits.get(), 1);
        assert!(!sub.is_active());
        assert_eq!(bus.subscriber_count("t"), 0);
    }

    #[test]
    fn dropping_a_subscription_unsubscribes() {
        let bus = ChangeBus::new();
        let (hits, sub) = counter(&bus, "t");
        drop(sub);
        bus.publish("t");
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn handler_cancelled_mid_dispatch_is_skipped() {
        let bus = ChangeBus::new();
        let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let v = Rc::clone(&victim);
        let _killer = bus.subscribe("t", move || {
            if let Some(s) = v.borrow().as_ref() {
                s.cancel();
            }
        });
        let (hits, sub) = counter(&bus, "t");
        *victim.borrow_mut() = Some(sub);
        assert_eq!(bus.publish("t"), 1);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn reentrant_publish_does_not_deadlock() {
        let bus = ChangeBus::new();
        let inner = bus.clone();
        let _relay = bus.subscribe("outer", move || {
            inner.publish("inner");
        });
        let (hits, _sub) = counter(&bus, "inner");
        bus.publish("outer");
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn bridge_maps_storage_keys_to_topics() {
        let bus = ChangeBus::new();
        let bridge = StorageBridge::new(bus.clone());
        let (saved, _s1) = counter(&bus, TOPIC_SAVE_STATE_CHANGED);
        let (views, _s2) = counter(&bus, TOPIC_VIEW_COUNT_CHANGED);

        assert_eq!(bridge.notify_key(Some("saved-set")), [TOPIC_SAVE_STATE_CHANGED]);
        bridge.notify_key(Some("viewcount:canada"));
        assert!(bridge.notify_key(Some("unrelated")).is_empty());
        bridge.notify_key(None);

        assert_eq!(saved.get(), 2);
        assert_eq!(views.get(), 2);
    }
}
