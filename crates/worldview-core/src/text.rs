// crates/worldview-core/src/text.rs

/// Convert a string into a folded key suitable for indexing and comparison.
///
/// This performs:
/// 1\) Transliterate Unicode → ASCII (e.g. `Åland` -> `Aland`)
/// 2\) Normalize to lowercase
/// 3\) Trim surrounding whitespace
///
/// # Examples
///
/// ```rust
/// use worldview_core::text::fold_key;
///
/// assert_eq!(fold_key("  Åland Islands "), "aland islands");
/// assert_eq!(fold_key("CANADA"), "canada");
/// ```
pub fn fold_key(s: &str) -> String {
    deunicode::deunicode(s.trim()).to_lowercase()
}

/// Compares two strings for equality after Unicode folding and normalization.
///
/// ```rust
/// use worldview_core::text::equals_folded;
///
/// assert!(equals_folded("Côte d'Ivoire", "cote d'ivoire"));
/// assert!(!equals_folded("Canada", "Canad"));
/// ```
pub fn equals_folded(a: &str, b: &str) -> bool {
    fold_key(a) == fold_key(b)
}
