// crates/worldview-core/src/session.rs

//! # Session
//!
//! Wires loader, resolver, view counter, saved-state store and change bus
//! together the way a browsing host uses them: load once, open detail
//! views by typed name, keep a saved list fresh.

use crate::bus::{ChangeBus, Subscription};
use crate::common::TOPIC_SAVE_STATE_CHANGED;
use crate::error::Result;
use crate::loader::{DatasetLoader, LoadedFrom};
use crate::model::{Collection, Country};
use crate::resolver::{resolve, Resolution};
use crate::saved::{SaveBackend, SaveStateStore, Saved};
use crate::store::KeyValueStore;
use crate::views::{Activation, DeferredVisit, ViewCountBackend, ViewCounter};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tokio::sync::OnceCell;
use tracing::debug;

pub struct Session {
    loader: DatasetLoader,
    collection: OnceCell<Collection>,
    origin: Cell<Option<LoadedFrom>>,
    views: ViewCounter,
    saves: SaveStateStore,
    bus: ChangeBus,
}

impl Session {
    /// `store` keeps the view counts; `backend` the saved state.
    pub fn new(
        loader: DatasetLoader,
        store: Rc<dyn KeyValueStore>,
        backend: impl SaveBackend + 'static,
    ) -> Self {
        let bus = ChangeBus::new();
        Self::with_parts(
            loader,
            ViewCounter::with_bus(store, bus.clone()),
            SaveStateStore::new(backend, bus.clone()),
            bus,
        )
    }

    /// Session whose view counts go to `views` instead of the local store.
    pub fn with_view_backend(
        loader: DatasetLoader,
        views: impl ViewCountBackend + 'static,
        backend: impl SaveBackend + 'static,
    ) -> Self {
        let bus = ChangeBus::new();
        Self::with_parts(
            loader,
            ViewCounter::with_backend(views, Some(bus.clone())),
            SaveStateStore::new(backend, bus.clone()),
            bus,
        )
    }

    fn with_parts(
        loader: DatasetLoader,
        views: ViewCounter,
        saves: SaveStateStore,
        bus: ChangeBus,
    ) -> Self {
        Self {
            loader,
            collection: OnceCell::new(),
            origin: Cell::new(None),
            views,
            saves,
            bus,
        }
    }

    /// Session with the HTTP clients and the backends selected in
    /// `settings`.
    #[cfg(feature = "http")]
    pub fn from_settings(
        settings: &crate::config::Settings,
        store: Rc<dyn KeyValueStore>,
    ) -> Result<Self> {
        use crate::loader::RestCountriesClient;
        use crate::saved::{BackendKind, HttpSaveClient, LocalBackend, RemoteBackend};
        use crate::views::{HttpViewCounts, LocalViewCounts};

        settings.validate()?;
        let client = settings.http_client()?;
        let loader = DatasetLoader::new(RestCountriesClient::with_client(
            client.clone(),
            settings.dataset_url.clone(),
        ));

        let saves: Box<dyn SaveBackend> = match (settings.backend, settings.saves_url.as_deref()) {
            (BackendKind::Remote, Some(saves_url)) => Box::new(RemoteBackend::new(
                HttpSaveClient::with_client(client.clone(), saves_url),
                RestCountriesClient::with_client(client.clone(), settings.lookup_url.clone()),
            )),
            _ => Box::new(LocalBackend::new(Rc::clone(&store))),
        };
        let views: Box<dyn ViewCountBackend> =
            match (settings.view_backend, settings.resolved_counts_url()) {
                (BackendKind::Remote, Some(counts_url)) => {
                    Box::new(HttpViewCounts::with_client(client, counts_url))
                }
                _ => Box::new(LocalViewCounts::new(store)),
            };

        debug!(
            backend = ?settings.backend,
            view_backend = ?settings.view_backend,
            "session configured"
        );
        Ok(Self::with_view_backend(loader, views, saves))
    }

    /// Load the dataset once; later calls (and concurrent ones) share the
    /// first load.
    pub async fn load(&self) -> &Collection {
        self.collection
            .get_or_init(|| async {
                let (collection, origin) = self.loader.load_with_origin().await;
                self.origin.set(Some(origin));
                collection
            })
            .await
    }

    /// `None` until the first load finishes.
    pub fn collection(&self) -> Option<&Collection> {
        self.collection.get()
    }

    pub fn origin(&self) -> Option<LoadedFrom> {
        self.origin.get()
    }

    pub fn resolve(&self, identifier: &str) -> Resolution<'_> {
        resolve(self.collection(), identifier)
    }

    /// Resolve `identifier` and, when found, start a detail-view activation
    /// for it.
    pub fn open_detail(&self, identifier: &str) -> DetailResolution {
        match self.resolve(identifier) {
            Resolution::Pending => DetailResolution::Pending,
            Resolution::NotFound => DetailResolution::NotFound,
            Resolution::Found(country) => DetailResolution::Found(DetailView {
                activation: self.views.activate(country.name()),
                country: country.clone(),
                saves: self.saves.clone(),
                saved: Cell::new(None),
                open: Cell::new(true),
            }),
        }
    }

    pub fn saved_list(&self) -> SavedList {
        SavedList::new(self.saves.clone())
    }

    pub fn views(&self) -> &ViewCounter {
        &self.views
    }

    pub fn saves(&self) -> &SaveStateStore {
        &self.saves
    }

    pub fn bus(&self) -> &ChangeBus {
        &self.bus
    }
}

pub enum DetailResolution {
    Pending,
    NotFound,
    Found(DetailView),
}

/// State behind one open detail page.
///
/// Async results (saved-flag reads, saves) that come back after
/// [`DetailView::close`] are not applied to the view.
pub struct DetailView {
    country: Country,
    activation: Activation,
    saves: SaveStateStore,
    saved: Cell<Option<bool>>,
    open: Cell<bool>,
}

impl DetailView {
    pub fn country(&self) -> &Country {
        &self.country
    }

    /// Setup phase of the page; schedule the returned visit afterwards.
    pub fn setup(&self) -> DeferredVisit {
        self.activation.setup()
    }

    /// View count as this page knows it; `None` before setup.
    pub fn view_count(&self) -> Option<u64> {
        self.activation.observed_count()
    }

    /// Saved flag as last read; `None` until [`DetailView::refresh_saved`]
    /// or a save completes.
    pub fn is_saved(&self) -> Option<bool> {
        self.saved.get()
    }

    pub fn is_open(&self) -> bool {
        self.open.get()
    }

    pub async fn refresh_saved(&self) -> bool {
        let saved = self.saves.is_saved(&self.country).await;
        if self.open.get() {
            self.saved.set(Some(saved));
        }
        saved
    }

    /// Save the page's country. The outcome is returned even if the page
    /// closed meanwhile; only the page's own flag is left alone then.
    pub async fn save(&self) -> Result<Saved> {
        let result = self.saves.save(&self.country).await;
        if result.is_ok() && self.open.get() {
            self.saved.set(Some(true));
        }
        result
    }

    pub fn close(&self) {
        self.open.set(false);
        self.activation.teardown();
    }
}

impl Drop for DetailView {
    fn drop(&mut self) {
        self.close();
    }
}

/// Observer of the saved list. Marks itself stale on every
/// `save-state-changed`; the host re-reads with [`SavedList::refresh`].
pub struct SavedList {
    saves: SaveStateStore,
    state: Rc<ListState>,
    _subscription: Subscription,
}

struct ListState {
    stale: Cell<bool>,
    generation: Cell<u64>,
    items: RefCell<Vec<Country>>,
    notify: RefCell<Option<Box<dyn Fn()>>>,
}

impl SavedList {
    pub fn new(saves: SaveStateStore) -> Self {
        let state = Rc::new(ListState {
            stale: Cell::new(true),
            generation: Cell::new(0),
            items: RefCell::new(Vec::new()),
            notify: RefCell::new(None),
        });
        let watcher = Rc::clone(&state);
        let subscription = saves.bus().subscribe(TOPIC_SAVE_STATE_CHANGED, move || {
            watcher.stale.set(true);
            if let Some(notify) = watcher.notify.borrow().as_ref() {
                notify();
            }
        });
        Self {
            saves,
            state,
            _subscription: subscription,
        }
    }

    /// Call `notify` whenever the list goes stale, e.g. to schedule a
    /// refresh.
    pub fn on_stale(&self, notify: impl Fn() + 'static) {
        *self.state.notify.borrow_mut() = Some(Box::new(notify));
    }

    pub fn is_stale(&self) -> bool {
        self.state.stale.get()
    }

    /// Re-read the saved countries. When refreshes overlap, the one started
    /// last wins regardless of completion order.
    pub async fn refresh(&self) -> Vec<Country> {
        let generation = self.state.generation.get() + 1;
        self.state.generation.set(generation);
        self.state.stale.set(false);

        let items = self.saves.list_saved().await;
        if self.state.generation.get() == generation {
            *self.state.items.borrow_mut() = items.clone();
        }
        items
    }

    pub fn items(&self) -> Vec<Country> {
        self.state.items.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::snapshot;
    use crate::saved::LocalBackend;
    use crate::store::MemoryStore;
    use crate::traits::DatasetSource;
    use crate::views::VisitOutcome;
    use async_trait::async_trait;

    struct Unreachable;

    #[async_trait(?Send)]
    impl DatasetSource for Unreachable {
        async fn fetch_all(&self) -> Result<Vec<Country>> {
            Err(crate::error::Error::EmptyPayload)
        }
    }

    fn session() -> Session {
        let store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
        let loader = DatasetLoader::new(Unreachable).with_fallback(snapshot().to_vec());
        Session::new(loader, Rc::clone(&store), LocalBackend::new(store))
    }

    #[tokio::test]
    async fn detail_is_pending_until_loaded() {
        let s = session();
        assert!(matches!(s.open_detail("Canada"), DetailResolution::Pending));

        s.load().await;
        assert_eq!(s.origin(), Some(LoadedFrom::Fallback));
        assert!(matches!(s.open_detail("canada"), DetailResolution::Found(_)));
        assert!(matches!(s.open_detail("Wakanda"), DetailResolution::NotFound));
    }

    #[tokio::test]
    async fn closed_view_ignores_late_save_result() {
        let s = session();
        s.load().await;
        let DetailResolution::Found(view) = s.open_detail("France") else {
            panic!("France is in the snapshot");
        };

        let visit = view.setup();
        assert_eq!(visit.run().await.count(), Some(1));
        assert_eq!(view.view_count(), Some(1));

        view.close();
        let saved = view.save().await.unwrap();
        assert!(saved.newly_saved);
        assert_eq!(view.is_saved(), None);
        assert!(s.saves().is_saved(view.country()).await);
    }

    /// Counting service that answers with a fixed total.
    struct Hosted(u64);

    #[async_trait(?Send)]
    impl ViewCountBackend for Hosted {
        fn peek(&self, _key: &crate::model::EntityKey) -> u64 {
            0
        }

        async fn commit(&self, _key: &crate::model::EntityKey, _name: &str, _expected: u64) -> u64 {
            self.0
        }
    }

    #[tokio::test]
    async fn detail_view_shows_the_service_count() {
        let store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
        let loader = DatasetLoader::new(Unreachable).with_fallback(snapshot().to_vec());
        let s = Session::with_view_backend(loader, Hosted(230), LocalBackend::new(store));
        s.load().await;
        let DetailResolution::Found(view) = s.open_detail("japan") else {
            panic!("Japan is in the snapshot");
        };

        assert_eq!(view.setup().run().await.count(), Some(230));
        assert_eq!(view.view_count(), Some(230));
        assert_eq!(view.setup().run().await, VisitOutcome::AlreadyCounted(230));
    }

    #[tokio::test]
    async fn saved_list_goes_stale_on_save() {
        let s = session();
        s.load().await;
        let list = s.saved_list();
        assert!(list.refresh().await.is_empty());
        assert!(!list.is_stale());

        let pinged = Rc::new(Cell::new(false));
        let p = Rc::clone(&pinged);
        list.on_stale(move || p.set(true));

        let peru = Country::new("Peru");
        s.saves().save(&peru).await.unwrap();
        assert!(list.is_stale());
        assert!(pinged.get());

        let names: Vec<_> = list.refresh().await.into_iter().map(|c| c.name).collect();
        assert_eq!(names, ["Peru"]);
        assert_eq!(list.items().len(), 1);
    }
}
