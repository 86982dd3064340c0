// crates/worldview-core/src/saved.rs

//! # Saved State
//!
//! The per-country "saved" flag, kept by exactly one of two backends picked
//! at deployment time:
//!
//! - [`LocalBackend`]: a record set in the client's persistent store.
//! - [`RemoteBackend`]: a remote save service, decorated with an enrichment
//!   step that turns the service's bare identifiers into full countries.
//!
//! [`SaveStateStore`] fronts either backend and announces every successful
//! change on the [`ChangeBus`].

use crate::bus::ChangeBus;
use crate::common::TOPIC_SAVE_STATE_CHANGED;
use crate::error::Result;
use crate::model::Country;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tracing::{debug, info, warn};

#[cfg(feature = "http")]
mod http;
mod local;
mod remote;

#[cfg(feature = "http")]
pub use http::HttpSaveClient;
pub use local::{LocalBackend, SaveRecord};
pub use remote::{RemoteBackend, RemoteSaves, SavedRef};

/// Successful save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Saved {
    /// `false` when the country was already saved and nothing changed.
    pub newly_saved: bool,
}

/// Which backend a deployment keeps saved state (and view counts) in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Local,
    Remote,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(BackendKind::Local),
            "remote" => Ok(BackendKind::Remote),
            other => Err(format!("unknown backend '{other}' (expected 'local' or 'remote')")),
        }
    }
}

/// Storage contract shared by both backends.
///
/// `save` is idempotent per country. Reads are advisory: a backend that
/// cannot answer reports "not saved" / an empty list and logs, while write
/// failures are returned.
#[async_trait(?Send)]
pub trait SaveBackend {
    async fn is_saved(&self, country: &Country) -> bool;
    async fn save(&self, country: &Country) -> Result<Saved>;
    /// `Ok(true)` when something was removed.
    async fn unsave(&self, country: &Country) -> Result<bool>;
    async fn list_saved(&self) -> Vec<Country>;
}

#[async_trait(?Send)]
impl<T: SaveBackend + ?Sized> SaveBackend for Box<T> {
    async fn is_saved(&self, country: &Country) -> bool {
        (**self).is_saved(country).await
    }

    async fn save(&self, country: &Country) -> Result<Saved> {
        (**self).save(country).await
    }

    async fn unsave(&self, country: &Country) -> Result<bool> {
        (**self).unsave(country).await
    }

    async fn list_saved(&self) -> Vec<Country> {
        (**self).list_saved().await
    }
}

/// Front for the configured backend. Clones share the backend and bus.
#[derive(Clone)]
pub struct SaveStateStore {
    backend: Rc<dyn SaveBackend>,
    bus: ChangeBus,
}

impl SaveStateStore {
    pub fn new(backend: impl SaveBackend + 'static, bus: ChangeBus) -> Self {
        Self {
            backend: Rc::new(backend),
            bus,
        }
    }

    pub fn bus(&self) -> &ChangeBus {
        &self.bus
    }

    pub async fn is_saved(&self, country: &Country) -> bool {
        self.backend.is_saved(country).await
    }

    /// Save `country`. Every `Ok` publishes `save-state-changed` once; an
    /// `Err` publishes nothing and leaves the saved state as it was.
    pub async fn save(&self, country: &Country) -> Result<Saved> {
        match self.backend.save(country).await {
            Ok(saved) => {
                info!(country = country.name(), newly_saved = saved.newly_saved, "country saved");
                self.bus.publish(TOPIC_SAVE_STATE_CHANGED);
                Ok(saved)
            }
            Err(e) => {
                warn!(country = country.name(), error = %e, "save failed");
                Err(e)
            }
        }
    }

    /// Remove `country`. Publishes only when something was removed.
    pub async fn unsave(&self, country: &Country) -> Result<bool> {
        let removed = self.backend.unsave(country).await?;
        if removed {
            debug!(country = country.name(), "country unsaved");
            self.bus.publish(TOPIC_SAVE_STATE_CHANGED);
        }
        Ok(removed)
    }

    pub async fn list_saved(&self) -> Vec<Country> {
        self.backend.list_saved().await
    }
}
