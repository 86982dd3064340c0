//! worldview-rs
//!
//! Umbrella crate over [`worldview_core`], used by the demos.

pub use worldview_core::*;

pub mod prelude {
    pub use worldview_core::{
        ChangeBus, Collection, Country, DatasetLoader, DatasetSource, DetailResolution,
        DetailView, Error, KeyValueStore, LoadedFrom, MemoryStore, Resolution, Result,
        SaveStateStore, SavedList, Session, Settings, VisitOutcome,
    };
    pub use worldview_core::saved::LocalBackend;
}
