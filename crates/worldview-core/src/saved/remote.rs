// crates/worldview-core/src/saved/remote.rs
use super::{SaveBackend, Saved};
use crate::error::{Error, Result};
use crate::model::{Country, EntityKey};
use crate::text::fold_key;
use crate::traits::EntityLookup;
use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashSet;
use tracing::{debug, warn};

/// One item of the remote saved list.
///
/// Services answer with bare names or small records; the name lives under
/// whichever of `country_name`, `country` or `name` is present.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SavedRef {
    Name(String),
    Record {
        #[serde(default)]
        country_name: Option<String>,
        #[serde(default)]
        country: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },
    Other(Value),
}

impl SavedRef {
    pub fn identifier(&self) -> Option<&str> {
        let id = match self {
            SavedRef::Name(n) => Some(n.as_str()),
            SavedRef::Record {
                country_name,
                country,
                name,
            } => country_name
                .as_deref()
                .or(country.as_deref())
                .or(name.as_deref()),
            SavedRef::Other(_) => None,
        };
        id.map(str::trim).filter(|s| !s.is_empty())
    }

    /// Decode a saved-list body: an array, or `{ "countries": [...] }`.
    /// Anything else is an empty list.
    pub fn parse_list(payload: Value) -> Vec<SavedRef> {
        let items = match payload {
            Value::Array(items) => items,
            Value::Object(mut obj) => match obj.remove("countries") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };
        items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect()
    }
}

/// The bare remote save service. Knows countries only by display name.
#[async_trait(?Send)]
pub trait RemoteSaves {
    async fn save(&self, name: &str) -> Result<()>;
    async fn unsave(&self, name: &str) -> Result<()>;
    async fn list(&self) -> Result<Vec<SavedRef>>;
}

#[async_trait(?Send)]
impl<T: RemoteSaves + ?Sized> RemoteSaves for std::rc::Rc<T> {
    async fn save(&self, name: &str) -> Result<()> {
        (**self).save(name).await
    }

    async fn unsave(&self, name: &str) -> Result<()> {
        (**self).unsave(name).await
    }

    async fn list(&self) -> Result<Vec<SavedRef>> {
        (**self).list().await
    }
}

/// [`SaveBackend`] over a [`RemoteSaves`] client, adding idempotent saves
/// and the enrichment of listed names through an [`EntityLookup`].
pub struct RemoteBackend<C, L> {
    client: C,
    lookup: L,
    // keys with a save between its duplicate check and the POST
    in_flight: RefCell<HashSet<EntityKey>>,
}

/// Holds a key in the in-flight set until dropped.
struct InFlight<'a> {
    keys: &'a RefCell<HashSet<EntityKey>>,
    key: EntityKey,
}

impl<'a> InFlight<'a> {
    fn claim(keys: &'a RefCell<HashSet<EntityKey>>, key: EntityKey) -> Option<Self> {
        keys.borrow_mut()
            .insert(key.clone())
            .then_some(Self { keys, key })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.keys.borrow_mut().remove(&self.key);
    }
}

impl<C: RemoteSaves, L: EntityLookup> RemoteBackend<C, L> {
    pub fn new(client: C, lookup: L) -> Self {
        Self {
            client,
            lookup,
            in_flight: RefCell::new(HashSet::new()),
        }
    }

    /// Saved names in service order, first occurrence of each folded name
    /// kept.
    async fn identifiers(&self) -> Result<Vec<String>> {
        let refs = self.client.list().await?;
        let mut seen = HashSet::with_capacity(refs.len());
        let mut out = Vec::with_capacity(refs.len());
        for r in &refs {
            let Some(id) = r.identifier() else {
                debug!(item = ?r, "skipping saved entry without a name");
                continue;
            };
            if seen.insert(fold_key(id)) {
                out.push(id.to_owned());
            }
        }
        Ok(out)
    }

    /// Look every name up concurrently. Output order is input order; a
    /// failed or empty lookup leaves a placeholder at its position.
    pub async fn enrich(&self, names: &[String]) -> Vec<Country> {
        join_all(names.iter().map(|name| async move {
            match self.lookup.lookup_by_name(name).await {
                Ok(Some(country)) => country,
                Ok(None) => {
                    debug!(name = name.as_str(), "no details for saved country, using placeholder");
                    Country::placeholder(name.as_str())
                }
                Err(e) => {
                    warn!(name = name.as_str(), error = %e, "detail lookup failed, using placeholder");
                    Country::placeholder(name.as_str())
                }
            }
        }))
        .await
    }
}

fn as_save_failure(e: Error) -> Error {
    match e {
        Error::SaveRequestFailed(_) => e,
        other => Error::SaveRequestFailed(other.to_string()),
    }
}

#[async_trait(?Send)]
impl<C: RemoteSaves, L: EntityLookup> SaveBackend for RemoteBackend<C, L> {
    async fn is_saved(&self, country: &Country) -> bool {
        match self.identifiers().await {
            Ok(ids) => {
                let key = country.key();
                ids.iter().any(|id| fold_key(id) == key.as_str())
            }
            Err(e) => {
                warn!(error = %e, "saved list unavailable, reporting not saved");
                false
            }
        }
    }

    async fn save(&self, country: &Country) -> Result<Saved> {
        // A second save of the same country while the first is pending
        // would pass the list check too; it reports "already saved".
        let Some(_claim) = InFlight::claim(&self.in_flight, country.key()) else {
            debug!(name = country.name(), "save already in flight");
            return Ok(Saved { newly_saved: false });
        };
        match self.identifiers().await {
            Ok(ids) if ids.iter().any(|id| fold_key(id) == country.key().as_str()) => {
                return Ok(Saved { newly_saved: false });
            }
            Ok(_) => {}
            // The list is only a duplicate check; the save itself decides.
            Err(e) => debug!(error = %e, "saved list unavailable before save"),
        }
        self.client
            .save(country.name())
            .await
            .map_err(as_save_failure)?;
        Ok(Saved { newly_saved: true })
    }

    async fn unsave(&self, country: &Country) -> Result<bool> {
        if let Ok(ids) = self.identifiers().await {
            if !ids.iter().any(|id| fold_key(id) == country.key().as_str()) {
                return Ok(false);
            }
        }
        self.client
            .unsave(country.name())
            .await
            .map_err(as_save_failure)?;
        Ok(true)
    }

    async fn list_saved(&self) -> Vec<Country> {
        match self.identifiers().await {
            Ok(ids) => self.enrich(&ids).await,
            Err(e) => {
                warn!(error = %e, "saved list unavailable, showing none");
                Vec::new()
            }
        }
    }
}
