//! `window.localStorage` as a [`KeyValueStore`].

use wasm_bindgen::JsValue;
use web_sys::Storage;
use worldview_core::{Error, KeyValueStore, Result};

pub struct LocalStorageStore {
    storage: Storage,
}

impl LocalStorageStore {
    /// `None` when there is no window or storage is disabled (private
    /// browsing modes, sandboxed frames).
    pub fn from_window() -> Option<Self> {
        let storage = web_sys::window()?.local_storage().ok()??;
        Some(Self { storage })
    }
}

fn unavailable(e: JsValue) -> Error {
    Error::Persistence(e.as_string().unwrap_or_else(|| format!("{e:?}")))
}

impl KeyValueStore for LocalStorageStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.storage.get_item(key).map_err(unavailable)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.storage.set_item(key, value).map_err(unavailable)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.storage.remove_item(key).map_err(unavailable)
    }
}
