// crates/worldview-core/src/loader.rs

//! # Dataset Loader
//!
//! Acquires the session's country list: one request to the configured
//! [`DatasetSource`], and on any failure the bundled snapshot. Either way
//! the caller gets a sorted, non-empty [`Collection`] and never an error.

use crate::model::{Collection, Country};
use crate::traits::DatasetSource;
use tracing::{debug, info, warn};

#[cfg(feature = "http")]
mod rest;
mod snapshot;

#[cfg(feature = "http")]
pub use rest::{RestCountriesClient, REST_COUNTRIES_URL};
pub use snapshot::snapshot;

/// Which path produced a loaded collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadedFrom {
    Remote,
    Fallback,
}

pub struct DatasetLoader {
    source: Box<dyn DatasetSource>,
    fallback: Option<Vec<Country>>,
}

impl DatasetLoader {
    /// Loader falling back to the bundled snapshot.
    pub fn new(source: impl DatasetSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            fallback: None,
        }
    }

    /// Replace the bundled snapshot with a caller-supplied fallback.
    pub fn with_fallback(mut self, fallback: Vec<Country>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub async fn load(&self) -> Collection {
        self.load_with_origin().await.0
    }

    /// Like [`DatasetLoader::load`], also reporting where the data came from.
    ///
    /// A single failed attempt goes straight to the fallback: no retry, no
    /// merging of partial results.
    pub async fn load_with_origin(&self) -> (Collection, LoadedFrom) {
        match self.source.fetch_all().await {
            Ok(countries) if !countries.is_empty() => {
                info!(count = countries.len(), "loaded dataset from remote source");
                (Collection::from_unsorted(countries), LoadedFrom::Remote)
            }
            Ok(_) => {
                warn!("remote dataset was empty, using fallback snapshot");
                (self.fallback_collection(), LoadedFrom::Fallback)
            }
            Err(e) => {
                warn!(error = %e, "remote dataset unavailable, using fallback snapshot");
                (self.fallback_collection(), LoadedFrom::Fallback)
            }
        }
    }

    fn fallback_collection(&self) -> Collection {
        let countries = match &self.fallback {
            Some(custom) => custom.clone(),
            None => snapshot().to_vec(),
        };
        debug!(count = countries.len(), "sorting fallback snapshot");
        Collection::from_unsorted(countries)
    }
}

/// The bundled snapshot, sorted the same way a remote load would be.
pub fn load_fallback() -> Collection {
    Collection::from_unsorted(snapshot().to_vec())
}
