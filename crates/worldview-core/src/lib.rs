// crates/worldview-core/src/lib.rs

pub mod bus;
pub mod common;
pub mod config;
pub mod error;
pub mod loader; // dataset acquisition + bundled snapshot
pub mod model;
pub mod resolver;
pub mod saved;
pub mod session;
pub mod store;
pub mod text;
pub mod traits;
pub mod views;

// Re-exports
pub use crate::error::{Error, Result};
pub use bus::{ChangeBus, StorageBridge, Subscription};
pub use config::Settings;
pub use loader::{load_fallback, DatasetLoader, LoadedFrom};
pub use model::{Collection, Country, EntityKey};
pub use resolver::{resolve, Resolution};
pub use saved::{BackendKind, SaveBackend, SaveStateStore, Saved};
pub use session::{DetailResolution, DetailView, SavedList, Session};
pub use store::{KeyValueStore, MemoryStore};
pub use traits::{DatasetSource, EntityLookup};
pub use views::{
    Activation, DeferredVisit, LocalViewCounts, ViewCountBackend, ViewCounter, VisitOutcome,
};

#[cfg(feature = "fs")]
pub use store::FileStore;
#[cfg(feature = "http")]
pub use loader::RestCountriesClient;
#[cfg(feature = "http")]
pub use views::HttpViewCounts;
