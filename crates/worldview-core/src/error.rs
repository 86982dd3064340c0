// crates/worldview-core/src/error.rs
use thiserror::Error;

/// Errors produced by the worldview core.
///
/// Most of these never reach an end user: read paths (dataset load,
/// enrichment lookups, saved-state reads) recover locally and only log.
/// [`Error::SaveRequestFailed`] and [`Error::Persistence`] on an explicit
/// save or unsave are the ones hosts are expected to show.
#[derive(Debug, Error)]
pub enum Error {
    #[cfg(feature = "http")]
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("remote payload contained no usable entries")]
    EmptyPayload,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("persistent store unavailable: {0}")]
    Persistence(String),

    #[error("save request failed: {0}")]
    SaveRequestFailed(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True for failures of a best-effort fetch (dataset, lookup, saved
    /// list). Callers recover from these with a fallback or placeholder.
    pub fn is_transient(&self) -> bool {
        match self {
            #[cfg(feature = "http")]
            Error::Http(_) => true,
            Error::Status { .. } | Error::Json(_) | Error::EmptyPayload => true,
            _ => false,
        }
    }

    /// True when the local persistent store could not be read or written.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Persistence(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
