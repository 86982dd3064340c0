// crates/worldview-core/src/model/raw.rs
use super::Country;
use crate::error::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Name as delivered: a bare string, or `{ "common": "...", ... }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NameRaw {
    Plain(String),
    Nested { common: String },
}

/// Capital as delivered: a single string or a list (first entry wins).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CapitalRaw {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Default, Deserialize)]
struct FlagsRaw {
    #[serde(default)]
    png: Option<String>,
    #[serde(default)]
    svg: Option<String>,
}

/// Raw country structure as it comes from the dataset service or the
/// bundled snapshot.
///
/// Every field except the name is optional, and odd shapes for the
/// optional ones (a population of `"No data"`, say) are dropped instead
/// of failing the item.
#[derive(Debug, Deserialize)]
pub struct CountryRaw {
    name: NameRaw,
    #[serde(default)]
    capital: Option<CapitalRaw>,
    #[serde(default)]
    region: Option<Value>,
    #[serde(default)]
    population: Option<Value>,
    #[serde(default)]
    flags: Option<FlagsRaw>,
    #[serde(default)]
    cca3: Option<String>,
    #[serde(default)]
    cca2: Option<String>,
}

impl CountryRaw {
    /// `None` when the item has no usable display name.
    pub fn into_country(self) -> Option<Country> {
        let name = match self.name {
            NameRaw::Plain(s) | NameRaw::Nested { common: s } => s.trim().to_owned(),
        };
        if name.is_empty() {
            return None;
        }

        let capital = match self.capital {
            Some(CapitalRaw::One(s)) => Some(s),
            Some(CapitalRaw::Many(v)) => v.into_iter().next(),
            None => None,
        }
        .filter(|s| !s.trim().is_empty());

        let region = self
            .region
            .and_then(|v| v.as_str().map(str::to_owned))
            .filter(|s| !s.trim().is_empty());

        let flags = self.flags.unwrap_or_default();

        Some(Country {
            name,
            capital,
            region,
            population: self.population.and_then(|v| v.as_u64()),
            flag: flags.png.or(flags.svg).filter(|s| !s.is_empty()),
            code: self.cca3.or(self.cca2).filter(|s| !s.is_empty()),
        })
    }
}

/// Decode a dataset payload.
///
/// The payload must be a JSON array. Items are decoded one by one and
/// unusable ones are skipped, so a single odd record does not cost the
/// whole dataset. A payload that yields nothing is
/// [`Error::EmptyPayload`].
pub fn parse_payload(payload: Value) -> Result<Vec<Country>> {
    let items: Vec<Value> = serde_json::from_value(payload)?;
    let total = items.len();

    let countries: Vec<Country> = items
        .into_iter()
        .enumerate()
        .filter_map(|(idx, item)| match serde_json::from_value::<CountryRaw>(item) {
            Ok(raw) => raw.into_country().or_else(|| {
                warn!(index = idx, "skipping dataset entry without a name");
                None
            }),
            Err(e) => {
                warn!(index = idx, error = %e, "skipping malformed dataset entry");
                None
            }
        })
        .collect();

    debug!(total, usable = countries.len(), "decoded dataset payload");

    if countries.is_empty() {
        return Err(Error::EmptyPayload);
    }
    Ok(countries)
}
