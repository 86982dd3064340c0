//! worldview-wasm: WebAssembly bindings for worldview-core
//!
//! Runs a browsing session inside the page: the dataset is fetched once
//! (bundled snapshot as fallback), view counts and local saves live in
//! `localStorage`, and changes made by other tabs arrive through the
//! browser `storage` event.
//!
//! What it provides
//! ----------------
//! - `configure({ backend, saves_url, dataset_url, view_backend, counts_url })`
//!   (optional, before use)
//! - `load_countries()`: sorted country list
//! - `open_country(name)` / `close_country()`: one detail page at a time;
//!   opening counts a visit
//! - `save_country(name)`, `unsave_country(name)`, `saved_countries()`
//! - `view_count(name)`
//! - `subscribe(topic, callback)` for `save-state-changed` and
//!   `view-count-changed`
//!
//! Quick start (browser)
//! ---------------------
//! ```javascript
//! import init, { load_countries, open_country, subscribe } from 'worldview-wasm';
//!
//! async function main() {
//!   await init();
//!   const countries = await load_countries();
//!   subscribe('save-state-changed', () => refreshSavedList());
//!   const page = await open_country('canada');
//!   if (page.status === 'found') console.log(page.country.name, page.views);
//! }
//! main();
//! ```
//!
//! Notes
//! -----
//! - All async exports return Promises; failures reject with a string.
//! - Numbers that may exceed 2^53 never occur for view counts in practice;
//!   they are handed over as JS numbers.

mod storage;

pub use storage::LocalStorageStore;

use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use std::cell::RefCell;
use std::fmt::Display;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::StorageEvent;

use worldview_core::{
    Country, DetailResolution, DetailView, KeyValueStore, MemoryStore, Session, Settings,
    StorageBridge, Subscription, VisitOutcome,
};

/// Everything the page keeps alive between calls.
struct Host {
    session: Session,
    open: RefCell<Option<Rc<DetailView>>>,
    subscriptions: RefCell<Vec<Subscription>>,
    _storage_listener: Option<Closure<dyn FnMut(StorageEvent)>>,
}

thread_local! {
    static SETTINGS: RefCell<Settings> = RefCell::new(Settings::default());
    static HOST: RefCell<Option<Rc<Host>>> = const { RefCell::new(None) };
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    web_sys::console::log_1(&"Initializing worldview WASM module...".into());
}

fn to_js(e: impl Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn build_host() -> Result<Host, JsValue> {
    let settings = SETTINGS.with(|s| s.borrow().clone());
    let store: Rc<dyn KeyValueStore> = match LocalStorageStore::from_window() {
        Some(store) => Rc::new(store),
        None => {
            web_sys::console::warn_1(&"localStorage unavailable, state is kept in memory".into());
            Rc::new(MemoryStore::new())
        }
    };
    let session = Session::from_settings(&settings, store).map_err(to_js)?;

    let bridge = StorageBridge::new(session.bus().clone());
    let listener = Closure::<dyn FnMut(StorageEvent)>::new(move |ev: StorageEvent| {
        bridge.notify_key(ev.key().as_deref());
    });
    let attached = web_sys::window().is_some_and(|w| {
        w.add_event_listener_with_callback("storage", listener.as_ref().unchecked_ref())
            .is_ok()
    });

    Ok(Host {
        session,
        open: RefCell::new(None),
        subscriptions: RefCell::new(Vec::new()),
        _storage_listener: attached.then_some(listener),
    })
}

fn host() -> Result<Rc<Host>, JsValue> {
    if let Some(host) = HOST.with(|h| h.borrow().clone()) {
        return Ok(host);
    }
    let host = Rc::new(build_host()?);
    HOST.with(|h| *h.borrow_mut() = Some(Rc::clone(&host)));
    Ok(host)
}

/// Let already-queued microtasks (scheduled visits) run.
async fn yield_now() {
    let _ = JsFuture::from(js_sys::Promise::resolve(&JsValue::NULL)).await;
}

/* --------------------------------------------------------------------------
   Setup
-------------------------------------------------------------------------- */

/// Replace the settings and start a fresh session on next use. Accepts a
/// partial object; missing fields keep their defaults.
#[wasm_bindgen]
pub fn configure(settings: JsValue) -> Result<(), JsValue> {
    let settings: Settings = from_value(settings).map_err(to_js)?;
    settings.validate().map_err(to_js)?;
    SETTINGS.with(|s| *s.borrow_mut() = settings);
    if let Some(old) = HOST.with(|h| h.borrow_mut().take()) {
        if let Some(view) = old.open.borrow_mut().take() {
            view.close();
        }
    }
    Ok(())
}

/// Call `callback` on every publish of `topic` for the rest of the session.
#[wasm_bindgen]
pub fn subscribe(topic: String, callback: js_sys::Function) -> Result<(), JsValue> {
    let host = host()?;
    let sub = host.session.bus().subscribe(topic, move || {
        if let Err(e) = callback.call0(&JsValue::NULL) {
            web_sys::console::error_1(&e);
        }
    });
    host.subscriptions.borrow_mut().push(sub);
    Ok(())
}

/* --------------------------------------------------------------------------
   Countries
-------------------------------------------------------------------------- */

#[wasm_bindgen]
pub async fn load_countries() -> Result<JsValue, JsValue> {
    let host = host()?;
    let collection = host.session.load().await;
    to_value(collection.as_slice()).map_err(to_js)
}

#[derive(Serialize)]
struct DetailPage<'a> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    country: Option<&'a Country>,
    saved: bool,
    views: u64,
}

impl DetailPage<'_> {
    fn missing(status: &'static str) -> Self {
        Self {
            status,
            country: None,
            saved: false,
            views: 0,
        }
    }
}

/// Open the detail page for `name`, closing the previous one. Resolves to
/// `{ status: "found" | "not_found" | "pending", country?, saved, views }`.
#[wasm_bindgen]
pub async fn open_country(name: String) -> Result<JsValue, JsValue> {
    let host = host()?;
    host.session.load().await;

    let view = match host.session.open_detail(&name) {
        DetailResolution::Found(view) => Rc::new(view),
        DetailResolution::NotFound => return to_value(&DetailPage::missing("not_found")).map_err(to_js),
        DetailResolution::Pending => return to_value(&DetailPage::missing("pending")).map_err(to_js),
    };
    if let Some(previous) = host.open.borrow_mut().replace(Rc::clone(&view)) {
        previous.close();
    }

    let visit = view.setup();
    wasm_bindgen_futures::spawn_local(async move {
        if let VisitOutcome::Discarded = visit.run().await {
            web_sys::console::debug_1(&"visit discarded, page closed before it ran".into());
        }
    });
    yield_now().await;
    let saved = view.refresh_saved().await;

    let page = DetailPage {
        status: "found",
        country: Some(view.country()),
        saved,
        views: view.view_count().unwrap_or(0),
    };
    to_value(&page).map_err(to_js)
}

#[wasm_bindgen]
pub fn close_country() -> Result<(), JsValue> {
    let host = host()?;
    if let Some(view) = host.open.borrow_mut().take() {
        view.close();
    }
    Ok(())
}

#[wasm_bindgen]
pub fn view_count(name: String) -> Result<f64, JsValue> {
    let host = host()?;
    Ok(host.session.views().current_count(name.as_str()) as f64)
}

/* --------------------------------------------------------------------------
   Saved countries
-------------------------------------------------------------------------- */

fn open_view_for(host: &Host, name: &str) -> Option<Rc<DetailView>> {
    host.open
        .borrow()
        .as_ref()
        .filter(|v| v.is_open() && worldview_core::text::equals_folded(v.country().name(), name))
        .cloned()
}

/// Resolves to `true` when the country was newly saved, `false` when it
/// already was. Rejects when the save request failed.
#[wasm_bindgen]
pub async fn save_country(name: String) -> Result<bool, JsValue> {
    let host = host()?;
    if let Some(view) = open_view_for(&host, &name) {
        return view.save().await.map(|s| s.newly_saved).map_err(to_js);
    }

    host.session.load().await;
    let country = host
        .session
        .resolve(&name)
        .found()
        .cloned()
        .ok_or_else(|| to_js(format!("no country named {name}")))?;
    host.session
        .saves()
        .save(&country)
        .await
        .map(|s| s.newly_saved)
        .map_err(to_js)
}

#[wasm_bindgen]
pub async fn unsave_country(name: String) -> Result<bool, JsValue> {
    let host = host()?;
    host.session.load().await;
    let country = host
        .session
        .resolve(&name)
        .found()
        .cloned()
        .unwrap_or_else(|| Country::new(name.trim()));
    host.session.saves().unsave(&country).await.map_err(to_js)
}

#[wasm_bindgen]
pub async fn saved_countries() -> Result<JsValue, JsValue> {
    let host = host()?;
    let saved = host.session.saves().list_saved().await;
    to_value(&saved).map_err(to_js)
}
