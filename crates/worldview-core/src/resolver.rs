// crates/worldview-core/src/resolver.rs
use crate::model::{Collection, Country};
use crate::text::fold_key;

/// Outcome of resolving a typed identifier against the session's countries.
///
/// `Pending` (nothing loaded yet) and `NotFound` (loaded, no match) are
/// different states and hosts render them differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    Pending,
    NotFound,
    Found(&'a Country),
}

impl<'a> Resolution<'a> {
    pub fn found(self) -> Option<&'a Country> {
        match self {
            Resolution::Found(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Resolution::Pending)
    }
}

/// Find the country whose display name equals `identifier` after folding
/// (case and diacritics). Exact match only; no prefix or fuzzy matching.
///
/// A missing or empty collection is [`Resolution::Pending`].
///
/// ```rust
/// use worldview_core::model::{Collection, Country};
/// use worldview_core::resolver::{resolve, Resolution};
///
/// let c = Collection::from_unsorted(vec![Country::new("Canada")]);
/// assert!(matches!(resolve(Some(&c), "canada"), Resolution::Found(_)));
/// assert_eq!(resolve(Some(&c), "Atlantis"), Resolution::NotFound);
/// assert_eq!(resolve(None, "canada"), Resolution::Pending);
/// ```
pub fn resolve<'a>(collection: Option<&'a Collection>, identifier: &str) -> Resolution<'a> {
    let Some(collection) = collection.filter(|c| !c.is_empty()) else {
        return Resolution::Pending;
    };
    let q = fold_key(identifier);
    if q.is_empty() {
        return Resolution::NotFound;
    }
    collection
        .iter()
        .find(|c| fold_key(&c.name) == q)
        .map_or(Resolution::NotFound, Resolution::Found)
}
