// crates/worldview-core/src/views.rs

//! # View Counter
//!
//! Persistent per-country visit counts that increment exactly once per
//! detail-view activation, even when the host runs the activation's setup
//! logic more than once before anything is visible.
//!
//! Each [`Activation`] owns a small gate:
//!
//! ```text
//! Uninitialized --setup()--> Armed --first DeferredVisit--> Incremented
//!        \___________________\_____________teardown()_______________--> Closed
//! ```
//!
//! `setup()` is the synchronous phase and may run any number of times; it
//! hands back a [`DeferredVisit`] for the host to schedule once setup is
//! over. Only the first deferred visit of an activation increments; the
//! rest observe `Incremented` and do nothing. A new activation of the same
//! key starts over at `Uninitialized`.
//!
//! Counts are stored by a [`ViewCountBackend`]: [`LocalViewCounts`] in the
//! client's persistent store, or `HttpViewCounts` on a counting service.

use crate::bus::ChangeBus;
use crate::common::TOPIC_VIEW_COUNT_CHANGED;
use crate::model::EntityKey;
use crate::store::{read_json, view_count_key, write_json, FallbackStore, KeyValueStore};
use async_trait::async_trait;
use std::cell::Cell;
use std::rc::Rc;
use tracing::{debug, warn};

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::{parse_count, HttpViewCounts};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Uninitialized,
    /// Setup ran; `baseline` is the count known at that point.
    Armed { baseline: u64 },
    Incremented { count: u64 },
    /// The activation was torn down; pending visits are discarded.
    Closed,
}

/// Result of running a [`DeferredVisit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitOutcome {
    /// This visit performed the activation's increment.
    Counted(u64),
    /// Another visit of the same activation got there first.
    AlreadyCounted(u64),
    /// The activation ended before the visit ran.
    Discarded,
}

impl VisitOutcome {
    pub fn count(&self) -> Option<u64> {
        match *self {
            VisitOutcome::Counted(n) | VisitOutcome::AlreadyCounted(n) => Some(n),
            VisitOutcome::Discarded => None,
        }
    }
}

/// Where view counts are kept.
///
/// Backends only store; deciding *whether* to increment is the gate's job.
/// `commit` is called at most once per activation.
#[async_trait(?Send)]
pub trait ViewCountBackend {
    /// Count known for `key` without side effects; 0 when unknown.
    fn peek(&self, key: &EntityKey) -> u64;

    /// Persist one increment of the country named `name`. `expected` is
    /// `peek + 1` as computed by the gate. Returns the count to show.
    async fn commit(&self, key: &EntityKey, name: &str, expected: u64) -> u64;

    /// True once the backend dropped to a non-durable mode.
    fn is_degraded(&self) -> bool {
        false
    }
}

#[async_trait(?Send)]
impl<T: ViewCountBackend + ?Sized> ViewCountBackend for Box<T> {
    fn peek(&self, key: &EntityKey) -> u64 {
        (**self).peek(key)
    }

    async fn commit(&self, key: &EntityKey, name: &str, expected: u64) -> u64 {
        (**self).commit(key, name, expected).await
    }

    fn is_degraded(&self) -> bool {
        (**self).is_degraded()
    }
}

/// Counts kept in the client's persistent store under `viewcount:<key>`.
/// A failing store drops to memory for the rest of the session.
pub struct LocalViewCounts {
    store: FallbackStore,
}

impl LocalViewCounts {
    pub fn new(store: Rc<dyn KeyValueStore>) -> Self {
        Self {
            store: FallbackStore::new(store, "view counts"),
        }
    }
}

#[async_trait(?Send)]
impl ViewCountBackend for LocalViewCounts {
    fn peek(&self, key: &EntityKey) -> u64 {
        match read_json::<u64, _>(&self.store, &view_count_key(key)) {
            Ok(v) => v.unwrap_or(0),
            Err(e) => {
                warn!(key = %key, error = %e, "ignoring unreadable view count");
                0
            }
        }
    }

    async fn commit(&self, key: &EntityKey, _name: &str, expected: u64) -> u64 {
        if let Err(e) = write_json(&self.store, &view_count_key(key), &expected) {
            warn!(key = %key, error = %e, "view count not written");
        }
        expected
    }

    fn is_degraded(&self) -> bool {
        self.store.is_degraded()
    }
}

struct CounterInner {
    backend: Box<dyn ViewCountBackend>,
    bus: Option<ChangeBus>,
}

/// Hands out [`Activation`]s and answers count queries.
///
/// Clones share the same backend and bus.
#[derive(Clone)]
pub struct ViewCounter {
    inner: Rc<CounterInner>,
}

impl ViewCounter {
    /// Counter over the local persistent store.
    pub fn new(store: Rc<dyn KeyValueStore>) -> Self {
        Self::with_backend(LocalViewCounts::new(store), None)
    }

    /// Local counter that announces persisted increments on `bus`
    /// (topic `view-count-changed`).
    pub fn with_bus(store: Rc<dyn KeyValueStore>, bus: ChangeBus) -> Self {
        Self::with_backend(LocalViewCounts::new(store), Some(bus))
    }

    pub fn with_backend(backend: impl ViewCountBackend + 'static, bus: Option<ChangeBus>) -> Self {
        Self {
            inner: Rc::new(CounterInner {
                backend: Box::new(backend),
                bus,
            }),
        }
    }

    /// Start a new detail-view activation for the country named `name`.
    pub fn activate(&self, name: &str) -> Activation {
        let key = EntityKey::new(name);
        debug!(key = %key, "view activation started");
        Activation {
            counter: Rc::clone(&self.inner),
            key,
            name: name.to_owned(),
            gate: Rc::new(Cell::new(GateState::Uninitialized)),
        }
    }

    /// One whole activation with the increment applied right away.
    /// Returns the new count.
    pub async fn record_visit(&self, name: &str) -> u64 {
        let activation = self.activate(name);
        let outcome = activation.setup().run().await;
        outcome.count().unwrap_or(0)
    }

    /// Known count without side effects; 0 for never-visited keys.
    pub fn current_count(&self, key: impl Into<EntityKey>) -> u64 {
        self.inner.backend.peek(&key.into())
    }

    /// True once the backend fell back to non-durable storage.
    pub fn is_degraded(&self) -> bool {
        self.inner.backend.is_degraded()
    }
}

/// One activation of a detail view. Tears itself down on drop.
pub struct Activation {
    counter: Rc<CounterInner>,
    key: EntityKey,
    name: String,
    gate: Rc<Cell<GateState>>,
}

impl Activation {
    pub fn key(&self) -> &EntityKey {
        &self.key
    }

    pub fn state(&self) -> GateState {
        self.gate.get()
    }

    /// The synchronous setup phase. Arms the gate on first call; every call
    /// returns a visit to be run after setup completes.
    pub fn setup(&self) -> DeferredVisit {
        if self.gate.get() == GateState::Uninitialized {
            let baseline = self.counter.backend.peek(&self.key);
            self.gate.set(GateState::Armed { baseline });
        }
        DeferredVisit {
            counter: Rc::clone(&self.counter),
            key: self.key.clone(),
            name: self.name.clone(),
            gate: Rc::clone(&self.gate),
        }
    }

    /// Count as last observed by this activation: the baseline while armed,
    /// the incremented value afterwards.
    pub fn observed_count(&self) -> Option<u64> {
        match self.gate.get() {
            GateState::Armed { baseline } => Some(baseline),
            GateState::Incremented { count } => Some(count),
            GateState::Uninitialized | GateState::Closed => None,
        }
    }

    pub fn teardown(&self) {
        if self.gate.replace(GateState::Closed) != GateState::Closed {
            debug!(key = %self.key, "view activation closed");
        }
    }
}

impl Drop for Activation {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// The deferred half of an activation's setup, bound to the activation
/// and key it was scheduled for. Hosts schedule [`DeferredVisit::run`] as
/// a task (`spawn_local`) once setup is over.
#[must_use = "a deferred visit does nothing until it runs"]
pub struct DeferredVisit {
    counter: Rc<CounterInner>,
    key: EntityKey,
    name: String,
    gate: Rc<Cell<GateState>>,
}

impl DeferredVisit {
    pub fn key(&self) -> &EntityKey {
        &self.key
    }

    /// Run the visit.
    ///
    /// The gate is checked and moved before the first await, so on a
    /// single-threaded executor the second of two visits always sees
    /// `Incremented`. A backend answer arriving after teardown is not
    /// written back into the gate.
    pub async fn run(self) -> VisitOutcome {
        let expected = match self.gate.get() {
            GateState::Armed { .. } => {
                let count = self.counter.backend.peek(&self.key) + 1;
                self.gate.set(GateState::Incremented { count });
                count
            }
            GateState::Incremented { count } => return VisitOutcome::AlreadyCounted(count),
            GateState::Closed => {
                debug!(key = %self.key, "discarding visit for closed activation");
                return VisitOutcome::Discarded;
            }
            // setup() always arms before handing out a visit
            GateState::Uninitialized => return VisitOutcome::Discarded,
        };

        let count = self
            .counter
            .backend
            .commit(&self.key, &self.name, expected)
            .await;
        if let GateState::Incremented { .. } = self.gate.get() {
            self.gate.set(GateState::Incremented { count });
        }
        debug!(key = %self.key, count, "view counted");
        if let Some(bus) = &self.counter.bus {
            bus.publish(TOPIC_VIEW_COUNT_CHANGED);
        }
        VisitOutcome::Counted(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::{Error, Result};
    use crate::store::MemoryStore;
    use std::cell::RefCell;

    fn counter() -> (ViewCounter, Rc<MemoryStore>) {
        let store = Rc::new(MemoryStore::new());
        (ViewCounter::new(store.clone()), store)
    }

    #[tokio::test]
    async fn duplicate_setup_counts_once() {
        let (views, store) = counter();
        store.set("viewcount:canada", "5").unwrap();

        let act = views.activate("Canada");
        let first = act.setup();
        let second = act.setup();
        assert_eq!(act.state(), GateState::Armed { baseline: 5 });

        assert_eq!(first.run().await, VisitOutcome::Counted(6));
        assert_eq!(second.run().await, VisitOutcome::AlreadyCounted(6));
        assert_eq!(views.current_count("canada"), 6);
    }

    #[tokio::test]
    async fn fresh_activation_counts_again() {
        let (views, _) = counter();
        assert_eq!(views.record_visit("Peru").await, 1);
        assert_eq!(views.record_visit("PERU").await, 2);
    }

    #[tokio::test]
    async fn teardown_discards_pending_visits() {
        let (views, _) = counter();
        let act = views.activate("Chile");
        let visit = act.setup();
        drop(act);
        assert_eq!(visit.run().await, VisitOutcome::Discarded);
        assert_eq!(views.current_count("Chile"), 0);
    }

    #[tokio::test]
    async fn corrupt_value_restarts_from_zero() {
        let (views, store) = counter();
        store.set("viewcount:chad", "\"lots\"").unwrap();
        assert_eq!(views.record_visit("Chad").await, 1);
        assert!(!views.is_degraded());
    }

    struct Broken;

    impl KeyValueStore for Broken {
        fn get(&self, _: &str) -> Result<Option<String>> {
            Err(Error::Persistence("quota exceeded".into()))
        }
        fn set(&self, _: &str, _: &str) -> Result<()> {
            Err(Error::Persistence("quota exceeded".into()))
        }
        fn remove(&self, _: &str) -> Result<()> {
            Err(Error::Persistence("quota exceeded".into()))
        }
    }

    #[tokio::test]
    async fn failing_store_keeps_counting_in_memory() {
        let views = ViewCounter::new(Rc::new(Broken));
        assert_eq!(views.record_visit("Peru").await, 1);
        assert_eq!(views.record_visit("Peru").await, 2);
        assert!(views.is_degraded());
        assert_eq!(views.current_count("peru"), 2);
    }

    #[tokio::test]
    async fn increments_are_announced() {
        let bus = ChangeBus::new();
        let views = ViewCounter::with_bus(Rc::new(MemoryStore::new()), bus.clone());
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let _sub = bus.subscribe(TOPIC_VIEW_COUNT_CHANGED, move || h.set(h.get() + 1));

        let act = views.activate("Japan");
        let (a, b) = (act.setup(), act.setup());
        let _ = (a.run().await, b.run().await);
        assert_eq!(hits.get(), 1);
    }

    /// Service-side counter answering with its own numbers.
    #[derive(Default)]
    struct Service {
        commits: RefCell<Vec<String>>,
        answer: Cell<u64>,
    }

    #[async_trait(?Send)]
    impl ViewCountBackend for Rc<Service> {
        fn peek(&self, _: &EntityKey) -> u64 {
            0
        }

        async fn commit(&self, _: &EntityKey, name: &str, _: u64) -> u64 {
            self.commits.borrow_mut().push(name.to_owned());
            self.answer.get()
        }
    }

    #[tokio::test]
    async fn backend_answer_replaces_the_local_guess() {
        let service = Rc::new(Service::default());
        service.answer.set(41);
        let views = ViewCounter::with_backend(Rc::clone(&service), None);

        let act = views.activate("Côte d'Ivoire");
        let (a, b) = (act.setup(), act.setup());
        assert_eq!(a.run().await, VisitOutcome::Counted(41));
        assert_eq!(b.run().await, VisitOutcome::AlreadyCounted(41));
        assert_eq!(act.observed_count(), Some(41));
        assert_eq!(*service.commits.borrow(), ["Côte d'Ivoire"]);
    }
}
