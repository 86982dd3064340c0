// crates/worldview-core/src/saved/http.rs
use super::remote::{RemoteSaves, SavedRef};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

/// Async client for the saved-countries service.
///
/// Endpoints, relative to the base URL:
/// - `POST /api/save-one-country` with `{ "country_name": ... }`
/// - `POST /api/unsave-one-country` with `{ "country_name": ... }`
/// - `GET /api/get-all-saved-countries`
#[derive(Clone, Debug)]
pub struct HttpSaveClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSaveClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{path}", self.base_url)
    }

    async fn post_name(&self, path: &str, name: &str) -> Result<()> {
        let url = self.url(path);
        debug!(%url, name, "POST");
        let resp = self
            .client
            .post(&url)
            .json(&json!({ "country_name": name }))
            .send()
            .await
            .map_err(|e| Error::SaveRequestFailed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::SaveRequestFailed(format!(
                "{url} answered {}",
                status.as_u16()
            )));
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl RemoteSaves for HttpSaveClient {
    async fn save(&self, name: &str) -> Result<()> {
        self.post_name("save-one-country", name).await
    }

    async fn unsave(&self, name: &str) -> Result<()> {
        self.post_name("unsave-one-country", name).await
    }

    async fn list(&self) -> Result<Vec<SavedRef>> {
        let url = self.url("get-all-saved-countries");
        debug!(%url, "GET");
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status {
                url,
                status: status.as_u16(),
            });
        }
        let body: Value = resp.json().await?;
        Ok(SavedRef::parse_list(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_hang_off_the_api_prefix() {
        let c = HttpSaveClient::new("http://localhost:3000/");
        assert_eq!(
            c.url("get-all-saved-countries"),
            "http://localhost:3000/api/get-all-saved-countries"
        );
    }
}
