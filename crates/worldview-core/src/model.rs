// crates/worldview-core/src/model.rs
use crate::text::fold_key;
use crate::traits::NameMatch;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod raw;

pub use raw::{parse_payload, CountryRaw};

/// A country as the browser works with it.
///
/// Constructed by the loader from the remote payload or the bundled
/// snapshot and never mutated afterwards. Only `name` is required; the
/// remaining fields are whatever the source happened to provide.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub name: String,
    #[serde(default)]
    pub capital: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub population: Option<u64>,
    /// Flag image URI.
    #[serde(default)]
    pub flag: Option<String>,
    /// Stable short code (cca3 / cca2) when the source has one.
    #[serde(default)]
    pub code: Option<String>,
}

impl Country {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capital: None,
            region: None,
            population: None,
            flag: None,
            code: None,
        }
    }

    /// Stand-in for a saved identifier whose details could not be looked
    /// up. Everything except the name stays absent.
    pub fn placeholder(name: impl Into<String>) -> Self {
        Self::new(name)
    }

    pub fn with_capital(mut self, capital: impl Into<String>) -> Self {
        self.capital = Some(capital.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_population(mut self, population: u64) -> Self {
        self.population = Some(population);
        self
    }

    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flag = Some(flag.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capital(&self) -> Option<&str> {
        self.capital.as_deref()
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn population(&self) -> Option<u64> {
        self.population
    }

    pub fn flag(&self) -> Option<&str> {
        self.flag.as_deref()
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Key used for persisted per-country state.
    pub fn key(&self) -> EntityKey {
        EntityKey::new(&self.name)
    }

    /// Logical identity: short codes decide when both sides carry one,
    /// otherwise the folded display names do.
    pub fn same_as(&self, other: &Country) -> bool {
        match (&self.code, &other.code) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => self.is_named(&other.name),
        }
    }
}

impl NameMatch for Country {
    fn name_str(&self) -> &str {
        &self.name
    }
}

/// Normalized key derived from a display name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(String);

impl EntityKey {
    pub fn new(display_name: &str) -> Self {
        Self(fold_key(display_name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<&Country> for EntityKey {
    fn from(c: &Country) -> Self {
        c.key()
    }
}

/// The session's country list, sorted by display name.
///
/// Ordering compares folded names only (case and accent insensitive). The
/// sort is stable, so names that fold to the same key keep the order the
/// source delivered them in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection {
    countries: Vec<Country>,
}

impl Collection {
    pub fn from_unsorted(mut countries: Vec<Country>) -> Self {
        countries.sort_by_cached_key(|c| fold_key(&c.name));
        Self { countries }
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Country> {
        self.countries.iter()
    }

    pub fn as_slice(&self) -> &[Country] {
        &self.countries
    }

    /// Exact folded-name match.
    pub fn find_by_name(&self, name: &str) -> Option<&Country> {
        let q = fold_key(name);
        self.countries.iter().find(|c| fold_key(&c.name) == q)
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Country;
    type IntoIter = std::slice::Iter<'a, Country>;

    fn into_iter(self) -> Self::IntoIter {
        self.countries.iter()
    }
}
