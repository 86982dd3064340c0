// crates/worldview-core/src/traits.rs
use crate::error::Result;
use crate::model::{Collection, Country};
use crate::text::fold_key;
use async_trait::async_trait;

/// Name-based matching helpers for types that expose a canonical display name.
///
/// Comparisons go through [`fold_key`], so they ignore case and diacritics.
///
/// # Examples
/// ```rust
/// use worldview_core::traits::NameMatch;
///
/// struct Place(&'static str);
/// impl NameMatch for Place {
///     fn name_str(&self) -> &str { self.0 }
/// }
///
/// assert!(Place("Åland Islands").is_named("aland islands"));
/// assert!(!Place("Canada").is_named("Can"));
/// ```
pub trait NameMatch {
    /// Returns the canonical display name used for matching.
    fn name_str(&self) -> &str;

    /// Exact comparison on the folded form.
    #[inline]
    fn is_named(&self, q: &str) -> bool {
        fold_key(self.name_str()) == fold_key(q)
    }
}

/// Where the full country list comes from.
///
/// One call per session; implementations should not retry on their own.
#[async_trait(?Send)]
pub trait DatasetSource {
    async fn fetch_all(&self) -> Result<Vec<Country>>;
}

/// Detail lookup of a single country by exact display name.
///
/// `Ok(None)` means the service answered and knows no such country, which
/// is a normal outcome and not an error.
#[async_trait(?Send)]
pub trait EntityLookup {
    async fn lookup_by_name(&self, name: &str) -> Result<Option<Country>>;
}

#[async_trait(?Send)]
impl EntityLookup for Collection {
    async fn lookup_by_name(&self, name: &str) -> Result<Option<Country>> {
        Ok(self.find_by_name(name).cloned())
    }
}

#[async_trait(?Send)]
impl<T: DatasetSource + ?Sized> DatasetSource for std::rc::Rc<T> {
    async fn fetch_all(&self) -> Result<Vec<Country>> {
        (**self).fetch_all().await
    }
}

#[async_trait(?Send)]
impl<T: EntityLookup + ?Sized> EntityLookup for std::rc::Rc<T> {
    async fn lookup_by_name(&self, name: &str) -> Result<Option<Country>> {
        (**self).lookup_by_name(name).await
    }
}
