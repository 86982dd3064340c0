#![cfg(target_arch = "wasm32")]

use wasm_bindgen_test::*;
use worldview_core::KeyValueStore;

use worldview_wasm::{close_country, view_count, LocalStorageStore};

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn local_storage_round_trips_values() {
    let store = LocalStorageStore::from_window().expect("browser tests have localStorage");
    store.set("smoke:key", "42").unwrap();
    assert_eq!(store.get("smoke:key").unwrap().as_deref(), Some("42"));
    store.remove("smoke:key").unwrap();
    assert_eq!(store.get("smoke:key").unwrap(), None);
}

#[wasm_bindgen_test]
fn counts_start_at_zero() {
    assert_eq!(view_count("Never Visited Land".into()).unwrap(), 0.0);
    assert!(close_country().is_ok());
}

#[wasm_bindgen_test]
async fn fallback_or_remote_countries_load() {
    let countries = worldview_wasm::load_countries().await.unwrap();
    assert!(js_sys::Array::is_array(&countries));
    assert!(js_sys::Array::from(&countries).length() > 0);
}
