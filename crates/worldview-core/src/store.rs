// crates/worldview-core/src/store.rs

//! # Persistent Store
//!
//! Durable client-side key-value storage behind [`KeyValueStore`]. Keys are
//! namespaced strings (`viewcount:<key>`, `saved-set`); values are JSON.

use crate::common::VIEW_COUNT_PREFIX;
use crate::error::Result;
use crate::model::EntityKey;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::warn;

#[cfg(feature = "fs")]
mod file;

#[cfg(feature = "fs")]
pub use file::FileStore;

/// String key-value storage scoped to one client.
///
/// Methods take `&self`; implementations use interior mutability, as the
/// whole core runs on one thread.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for std::rc::Rc<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }
    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// Volatile store. Used by tests and as the degraded mode of the counters.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Wraps a durable store and switches to memory for the rest of the
/// session the first time the durable store fails.
///
/// Reads and writes through this wrapper never report persistence errors.
pub struct FallbackStore {
    primary: Rc<dyn KeyValueStore>,
    memory: MemoryStore,
    degraded: Cell<bool>,
    label: &'static str,
}

impl FallbackStore {
    /// `label` names the state being kept, for the degrade warning.
    pub fn new(primary: Rc<dyn KeyValueStore>, label: &'static str) -> Self {
        Self {
            primary,
            memory: MemoryStore::new(),
            degraded: Cell::new(false),
            label,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.get()
    }

    fn degrade(&self, e: &crate::error::Error) {
        if !self.degraded.replace(true) {
            warn!(state = self.label, error = %e, "persistent store unavailable, keeping state in memory");
        }
    }
}

impl KeyValueStore for FallbackStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        if !self.degraded.get() {
            match self.primary.get(key) {
                Ok(v) => return Ok(v),
                Err(e) => self.degrade(&e),
            }
        }
        self.memory.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if !self.degraded.get() {
            match self.primary.set(key, value) {
                Ok(()) => return Ok(()),
                Err(e) => self.degrade(&e),
            }
        }
        self.memory.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        if !self.degraded.get() {
            match self.primary.remove(key) {
                Ok(()) => return Ok(()),
                Err(e) => self.degrade(&e),
            }
        }
        self.memory.remove(key)
    }
}

/// Read and decode a JSON value; a missing key is `Ok(None)`.
pub fn read_json<T, S>(store: &S, key: &str) -> Result<Option<T>>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub fn write_json<T, S>(store: &S, key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}

/// `viewcount:<entity key>`
pub fn view_count_key(key: &EntityKey) -> String {
    format!("{VIEW_COUNT_PREFIX}{key}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_helpers_round_through_the_store() {
        let store = MemoryStore::new();
        assert_eq!(read_json::<u64, _>(&store, "n").unwrap(), None);
        write_json(&store, "n", &41u64).unwrap();
        assert_eq!(read_json::<u64, _>(&store, "n").unwrap(), Some(41));
        store.remove("n").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn garbage_values_surface_as_json_errors() {
        let store = MemoryStore::new();
        store.set("n", "not json").unwrap();
        assert!(read_json::<u64, _>(&store, "n").is_err());
    }

    struct Broken;

    impl KeyValueStore for Broken {
        fn get(&self, _: &str) -> Result<Option<String>> {
            Err(crate::error::Error::Persistence("blocked".into()))
        }
        fn set(&self, _: &str, _: &str) -> Result<()> {
            Err(crate::error::Error::Persistence("blocked".into()))
        }
        fn remove(&self, _: &str) -> Result<()> {
            Err(crate::error::Error::Persistence("blocked".into()))
        }
    }

    #[test]
    fn fallback_store_switches_to_memory() {
        let store = FallbackStore::new(Rc::new(Broken), "test");
        assert_eq!(store.get("k").unwrap(), None);
        assert!(store.is_degraded());
        store.set("k", "1").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn view_count_keys_are_namespaced_and_folded() {
        assert_eq!(view_count_key(&EntityKey::new("Åland Islands")), "viewcount:aland islands");
    }
}
