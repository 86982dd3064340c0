// crates/worldview-core/src/loader/rest.rs
use crate::error::{Error, Result};
use crate::model::{parse_payload, Country};
use crate::traits::{DatasetSource, EntityLookup};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::Value;
use tracing::debug;

/// Public REST Countries endpoint the browser reads from by default.
pub const REST_COUNTRIES_URL: &str = "https://restcountries.com/v3.1";

// Only what the core consumes; the full records are large.
const FIELDS: &str = "name,flags,population,region,capital,cca3";

/// Async client for a REST Countries compatible service.
///
/// Serves both the bulk dataset ([`DatasetSource`]) and the by-name detail
/// lookup used to enrich remotely saved identifiers ([`EntityLookup`]).
#[derive(Clone, Debug)]
pub struct RestCountriesClient {
    client: reqwest::Client,
    base_url: String,
}

impl RestCountriesClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("invalid dataset URL {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("dataset URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET returning the decoded body, or `None` on 404.
    async fn get_json(&self, url: Url) -> Result<Option<Value>> {
        debug!(%url, "GET");
        let resp = self.client.get(url.clone()).send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(Some(resp.json::<Value>().await?))
    }
}

impl Default for RestCountriesClient {
    fn default() -> Self {
        Self::new(REST_COUNTRIES_URL)
    }
}

#[async_trait(?Send)]
impl DatasetSource for RestCountriesClient {
    async fn fetch_all(&self) -> Result<Vec<Country>> {
        let mut url = self.endpoint(&["all"])?;
        url.query_pairs_mut().append_pair("fields", FIELDS);

        match self.get_json(url).await? {
            Some(payload) => parse_payload(payload),
            None => Err(Error::EmptyPayload),
        }
    }
}

#[async_trait(?Send)]
impl EntityLookup for RestCountriesClient {
    async fn lookup_by_name(&self, name: &str) -> Result<Option<Country>> {
        let mut url = self.endpoint(&["name", name])?;
        url.query_pairs_mut().append_pair("fullText", "true");

        let Some(payload) = self.get_json(url).await? else {
            return Ok(None);
        };
        match parse_payload(payload) {
            Ok(found) => Ok(found.into_iter().next()),
            Err(Error::EmptyPayload) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
