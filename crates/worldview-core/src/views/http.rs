// crates/worldview-core/src/views/http.rs
use super::ViewCountBackend;
use crate::model::EntityKey;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use tracing::{debug, warn};

/// View counts kept by a counting service.
///
/// `POST {base}/api/update-one-country-count` with `{ "country_name": ... }`
/// increments on the service and answers with the new count. There is no
/// read endpoint, so [`ViewCountBackend::peek`] reports the last answer
/// seen in this session.
pub struct HttpViewCounts {
    client: reqwest::Client,
    base_url: String,
    last: RefCell<HashMap<EntityKey, u64>>,
}

impl HttpViewCounts {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            last: RefCell::new(HashMap::new()),
        }
    }

    fn url(&self) -> String {
        format!("{}/api/update-one-country-count", self.base_url)
    }

    async fn post(&self, name: &str) -> crate::error::Result<String> {
        let url = self.url();
        debug!(%url, name, "POST");
        let resp = self
            .client
            .post(&url)
            .json(&json!({ "country_name": name }))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(crate::error::Error::Status {
                url,
                status: status.as_u16(),
            });
        }
        Ok(resp.text().await?)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CountReply {
    Count {
        count: Value,
    },
    NewCount {
        #[serde(rename = "newCount")]
        new_count: Value,
    },
    Bare(Value),
}

fn number_of(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

/// Decode a count reply: `{ "count": n }`, `{ "newCount": n }`, a bare
/// number (JSON or plain text). Anything else is 0.
pub fn parse_count(body: &str) -> u64 {
    let value = match serde_json::from_str::<CountReply>(body) {
        Ok(CountReply::Count { count }) => number_of(&count),
        Ok(CountReply::NewCount { new_count }) => number_of(&new_count),
        Ok(CountReply::Bare(v)) => number_of(&v),
        Err(_) => body.trim().parse::<u64>().ok(),
    };
    value.unwrap_or(0)
}

#[async_trait(?Send)]
impl ViewCountBackend for HttpViewCounts {
    fn peek(&self, key: &EntityKey) -> u64 {
        self.last.borrow().get(key).copied().unwrap_or(0)
    }

    async fn commit(&self, key: &EntityKey, name: &str, _expected: u64) -> u64 {
        let count = match self.post(name).await {
            Ok(body) => parse_count(&body),
            Err(e) => {
                warn!(name, error = %e, "view count update failed, showing 0");
                0
            }
        };
        self.last.borrow_mut().insert(key.clone(), count);
        count
    }
}
