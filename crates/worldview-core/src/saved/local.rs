// crates/worldview-core/src/saved/local.rs
use super::{SaveBackend, Saved};
use crate::common::SAVED_SET_KEY;
use crate::error::Result;
use crate::model::{Country, EntityKey};
use crate::store::{read_json, write_json, FallbackStore, KeyValueStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tracing::warn;

/// One entry of the `saved-set` record: the key plus the country as it
/// looked when saved, so the saved list renders without a refetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRecord {
    pub key: EntityKey,
    pub country: Country,
}

impl SaveRecord {
    fn matches(&self, country: &Country) -> bool {
        self.key == country.key() || self.country.same_as(country)
    }
}

/// Saved set kept in the client's persistent store.
///
/// Everything happens synchronously; the async signatures only exist to
/// share [`SaveBackend`] with the remote variant. A failing store drops to
/// in-memory for the rest of the session.
pub struct LocalBackend {
    store: FallbackStore,
}

impl LocalBackend {
    pub fn new(store: Rc<dyn KeyValueStore>) -> Self {
        Self {
            store: FallbackStore::new(store, "saved countries"),
        }
    }

    fn records(&self) -> Vec<SaveRecord> {
        match read_json::<Vec<SaveRecord>, _>(&self.store, SAVED_SET_KEY) {
            Ok(records) => records.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "unreadable saved set, treating it as empty");
                Vec::new()
            }
        }
    }

    fn write_records(&self, records: &[SaveRecord]) -> Result<()> {
        write_json(&self.store, SAVED_SET_KEY, records)
    }
}

#[async_trait(?Send)]
impl SaveBackend for LocalBackend {
    async fn is_saved(&self, country: &Country) -> bool {
        self.records().iter().any(|r| r.matches(country))
    }

    async fn save(&self, country: &Country) -> Result<Saved> {
        let mut records = self.records();
        if records.iter().any(|r| r.matches(country)) {
            return Ok(Saved { newly_saved: false });
        }
        records.push(SaveRecord {
            key: country.key(),
            country: country.clone(),
        });
        self.write_records(&records)?;
        Ok(Saved { newly_saved: true })
    }

    async fn unsave(&self, country: &Country) -> Result<bool> {
        let mut records = self.records();
        let before = records.len();
        records.retain(|r| !r.matches(country));
        if records.len() == before {
            return Ok(false);
        }
        self.write_records(&records)?;
        Ok(true)
    }

    async fn list_saved(&self) -> Vec<Country> {
        self.records().into_iter().map(|r| r.country).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn canada() -> Country {
        Country::new("Canada").with_capital("Ottawa").with_code("CAN")
    }

    #[tokio::test]
    async fn saving_twice_keeps_one_record() {
        let store = Rc::new(MemoryStore::new());
        let backend = LocalBackend::new(store.clone());

        assert_eq!(backend.save(&canada()).await.unwrap(), Saved { newly_saved: true });
        assert_eq!(backend.save(&canada()).await.unwrap(), Saved { newly_saved: false });

        let records: Vec<SaveRecord> = read_json(&*store, SAVED_SET_KEY).unwrap().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key.as_str(), "canada");
        assert!(backend.is_saved(&Country::new("CANADA")).await);
    }

    #[tokio::test]
    async fn unsave_removes_only_the_match() {
        let backend = LocalBackend::new(Rc::new(MemoryStore::new()));
        backend.save(&canada()).await.unwrap();
        backend.save(&Country::new("France")).await.unwrap();

        assert!(backend.unsave(&canada()).await.unwrap());
        assert!(!backend.unsave(&canada()).await.unwrap());

        let names: Vec<_> = backend.list_saved().await.into_iter().map(|c| c.name).collect();
        assert_eq!(names, ["France"]);
    }

    #[tokio::test]
    async fn corrupt_saved_set_reads_as_empty() {
        let store = Rc::new(MemoryStore::new());
        store.set(SAVED_SET_KEY, "{]").unwrap();
        let backend = LocalBackend::new(store);
        assert!(backend.list_saved().await.is_empty());
        assert!(!backend.is_saved(&canada()).await);
    }
}
