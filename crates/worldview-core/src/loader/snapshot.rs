// crates/worldview-core/src/loader/snapshot.rs
use crate::error::Error;
use crate::model::{parse_payload, Country};
use once_cell::sync::Lazy;
use tracing::error;

// Embedded at compile time so the fallback works with no network and no
// data directory at runtime.
static SNAPSHOT_JSON: &str = include_str!("../../data/fallback_countries.json");

// Single in-process copy so the snapshot is only decoded once.
static SNAPSHOT: Lazy<Vec<Country>> = Lazy::new(|| {
    match serde_json::from_str(SNAPSHOT_JSON)
        .map_err(Error::from)
        .and_then(parse_payload)
    {
        Ok(countries) => countries,
        Err(e) => {
            error!(error = %e, "bundled fallback snapshot is unreadable");
            Vec::new()
        }
    }
});

/// The bundled countries, in file order.
pub fn snapshot() -> &'static [Country] {
    &SNAPSHOT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_snapshot_decodes() {
        let all = snapshot();
        assert!(!all.is_empty());
        assert!(all.iter().all(|c| !c.name().is_empty()));
        let antarctica = all.iter().find(|c| c.name() == "Antarctica").unwrap();
        assert_eq!(antarctica.capital(), None);
    }
}
