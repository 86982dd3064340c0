//! Loading, resolving and counting visits the way a browsing host drives
//! a session.

use async_trait::async_trait;
use rstest::{fixture, rstest};
use std::rc::Rc;
use tokio::task::{spawn_local, LocalSet};
use worldview_core::{
    Country, DatasetLoader, DatasetSource, DetailResolution, KeyValueStore, LoadedFrom,
    MemoryStore, Resolution, Result, Session, VisitOutcome,
};
use worldview_core::saved::LocalBackend;

/// Source answering with a fixed list, or failing when `None`.
struct Canned(Option<Vec<Country>>);

#[async_trait(?Send)]
impl DatasetSource for Canned {
    async fn fetch_all(&self) -> Result<Vec<Country>> {
        match &self.0 {
            Some(countries) => Ok(countries.clone()),
            None => Err(worldview_core::Error::Status {
                url: "https://countries.invalid/all".into(),
                status: 503,
            }),
        }
    }
}

fn session_with(source: Canned, store: Rc<MemoryStore>) -> Session {
    let store: Rc<dyn KeyValueStore> = store;
    Session::new(
        DatasetLoader::new(source),
        Rc::clone(&store),
        LocalBackend::new(store),
    )
}

#[fixture]
fn store() -> Rc<MemoryStore> {
    Rc::new(MemoryStore::new())
}

#[fixture]
fn remote_session(store: Rc<MemoryStore>) -> Session {
    session_with(
        Canned(Some(vec![
            Country::new("France").with_capital("Paris"),
            Country::new("Brazil"),
            Country::new("Canada").with_capital("Ottawa"),
        ])),
        store,
    )
}

#[rstest]
#[tokio::test]
async fn remote_load_is_sorted(remote_session: Session) {
    let names: Vec<_> = remote_session
        .load()
        .await
        .iter()
        .map(|c| c.name.clone())
        .collect();
    assert_eq!(names, ["Brazil", "Canada", "France"]);
    assert_eq!(remote_session.origin(), Some(LoadedFrom::Remote));
}

#[rstest]
#[case::failing(Canned(None))]
#[case::empty(Canned(Some(Vec::new())))]
#[tokio::test]
async fn unusable_remote_falls_back(#[case] source: Canned, store: Rc<MemoryStore>) {
    let session = session_with(source, store);
    let collection = session.load().await;
    assert!(!collection.is_empty());
    assert_eq!(session.origin(), Some(LoadedFrom::Fallback));

    let names: Vec<_> = collection.iter().map(|c| c.name.as_str()).collect();
    let mut sorted = names.clone();
    sorted.sort_by_key(|n| worldview_core::text::fold_key(n));
    assert_eq!(names, sorted);
}

#[rstest]
#[tokio::test]
async fn resolution_distinguishes_pending_from_missing(remote_session: Session) {
    assert_eq!(remote_session.resolve("Canada"), Resolution::Pending);

    remote_session.load().await;
    let found = remote_session.resolve("canada").found().cloned();
    assert_eq!(found.as_ref().and_then(Country::capital), Some("Ottawa"));
    assert_eq!(remote_session.resolve("Atlantis"), Resolution::NotFound);
    assert_eq!(remote_session.resolve("Can"), Resolution::NotFound);
}

#[rstest]
#[tokio::test]
async fn load_runs_once(remote_session: Session) {
    let first = remote_session.load().await;
    let second = remote_session.load().await;
    assert!(std::ptr::eq(first, second));
}

#[rstest]
#[tokio::test]
async fn each_activation_counts_once(store: Rc<MemoryStore>) {
    store.set("viewcount:canada", "5").unwrap();
    let session = session_with(Canned(Some(vec![Country::new("Canada")])), Rc::clone(&store));
    session.load().await;

    LocalSet::new()
        .run_until(async {
            let DetailResolution::Found(view) = session.open_detail("Canada") else {
                panic!("Canada should resolve");
            };
            // setup runs twice before the page settles
            let a = spawn_local(view.setup().run());
            let b = spawn_local(view.setup().run());
            let outcomes = [a.await.unwrap(), b.await.unwrap()];
            assert!(outcomes.contains(&VisitOutcome::Counted(6)));
            assert!(outcomes.contains(&VisitOutcome::AlreadyCounted(6)));
            assert_eq!(view.view_count(), Some(6));
            view.close();

            let DetailResolution::Found(again) = session.open_detail("CANADA") else {
                panic!("Canada should resolve");
            };
            let outcome = spawn_local(again.setup().run()).await.unwrap();
            assert_eq!(outcome, VisitOutcome::Counted(7));
        })
        .await;

    assert_eq!(store.get("viewcount:canada").unwrap().as_deref(), Some("7"));
}

#[rstest]
#[tokio::test]
async fn visit_scheduled_after_close_is_dropped(store: Rc<MemoryStore>) {
    let session = session_with(Canned(Some(vec![Country::new("Chile")])), store);
    session.load().await;

    LocalSet::new()
        .run_until(async {
            let DetailResolution::Found(view) = session.open_detail("Chile") else {
                panic!("Chile should resolve");
            };
            let pending = spawn_local(view.setup().run());
            drop(view);
            assert_eq!(pending.await.unwrap(), VisitOutcome::Discarded);
        })
        .await;

    assert_eq!(session.views().current_count("Chile"), 0);
}
