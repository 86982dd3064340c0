// crates/worldview-core/src/config.rs
use crate::error::{Error, Result};
use crate::saved::BackendKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default dataset / lookup service.
pub const DEFAULT_DATASET_URL: &str = "https://restcountries.com/v3.1";

/// Deployment settings for a session.
///
/// Hosts fill this from their own surface (CLI flags and environment, JS
/// arguments); the core only validates and consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the bulk dataset service.
    pub dataset_url: String,
    /// Base URL for by-name detail lookups (enrichment of remote saves).
    pub lookup_url: String,
    /// Base URL of the remote save service; required for [`BackendKind::Remote`].
    pub saves_url: Option<String>,
    pub backend: BackendKind,
    /// Base URL of the view-count service; falls back to `saves_url`.
    pub counts_url: Option<String>,
    /// Where view counts are kept.
    pub view_backend: BackendKind,
    /// Where native hosts keep persistent state.
    pub data_dir: Option<PathBuf>,
    /// Per-request timeout for native HTTP clients.
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dataset_url: DEFAULT_DATASET_URL.to_owned(),
            lookup_url: DEFAULT_DATASET_URL.to_owned(),
            saves_url: None,
            backend: BackendKind::Local,
            counts_url: None,
            view_backend: BackendKind::Local,
            data_dir: None,
            timeout_secs: 10,
        }
    }
}

impl Settings {
    /// Check the combination before a session is built.
    pub fn validate(&self) -> Result<()> {
        if self.dataset_url.trim().is_empty() {
            return Err(Error::Config("dataset URL is empty".into()));
        }
        if self.backend == BackendKind::Remote
            && self.saves_url.as_deref().map_or(true, |u| u.trim().is_empty())
        {
            return Err(Error::Config(
                "remote backend selected but no saves URL configured".into(),
            ));
        }
        if self.view_backend == BackendKind::Remote && self.resolved_counts_url().is_none() {
            return Err(Error::Config(
                "remote view counts selected but no counts URL configured".into(),
            ));
        }
        Ok(())
    }

    /// Base URL for view counts: `counts_url`, else `saves_url`.
    pub fn resolved_counts_url(&self) -> Option<&str> {
        self.counts_url
            .as_deref()
            .or(self.saves_url.as_deref())
            .filter(|u| !u.trim().is_empty())
    }

    /// Configured data directory, else the platform default.
    #[cfg(feature = "fs")]
    pub fn resolved_data_dir(&self) -> Option<PathBuf> {
        self.data_dir
            .clone()
            .or_else(crate::store::FileStore::default_dir)
    }

    /// Shared HTTP client honoring `timeout_secs` where the platform
    /// supports it.
    #[cfg(feature = "http")]
    pub fn http_client(&self) -> Result<reqwest::Client> {
        let builder = reqwest::Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(std::time::Duration::from_secs(self.timeout_secs));
        Ok(builder.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_backend_needs_a_saves_url() {
        let mut s = Settings {
            backend: BackendKind::Remote,
            ..Settings::default()
        };
        assert!(matches!(s.validate(), Err(Error::Config(_))));
        s.saves_url = Some("http://localhost:3000".into());
        assert!(s.validate().is_ok());
    }

    #[test]
    fn remote_view_counts_fall_back_to_the_saves_url() {
        let mut s = Settings {
            view_backend: BackendKind::Remote,
            ..Settings::default()
        };
        assert!(matches!(s.validate(), Err(Error::Config(_))));

        s.saves_url = Some("http://saves.local".into());
        assert_eq!(s.resolved_counts_url(), Some("http://saves.local"));
        assert!(s.validate().is_ok());

        s.counts_url = Some("http://counts.local".into());
        assert_eq!(s.resolved_counts_url(), Some("http://counts.local"));
    }

    #[test]
    fn partial_documents_fill_defaults() {
        let s: Settings = serde_json::from_str(r#"{ "backend": "remote" }"#).unwrap();
        assert_eq!(s.backend, BackendKind::Remote);
        assert_eq!(s.dataset_url, DEFAULT_DATASET_URL);
        assert_eq!(s.view_backend, BackendKind::Local);
    }
}
