// crates/worldview-core/src/store/file.rs
use super::KeyValueStore;
use crate::error::{Error, Result};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Durable store kept as one JSON object on disk.
///
/// Reads are served from memory; every write rewrites the file through a
/// sibling temp file and a rename, so a crash leaves either the old or the
/// new state behind.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RefCell<BTreeMap<String, String>>,
}

impl FileStore {
    pub const FILE_NAME: &'static str = "state.json";

    /// Open (or lazily create) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(Error::Io(e)),
        };
        debug!(path = %path.display(), keys = entries.len(), "opened file store");
        Ok(Self {
            path,
            entries: RefCell::new(entries),
        })
    }

    /// Open `state.json` inside `dir`, creating the directory if needed.
    pub fn open_in(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        Self::open(dir.join(Self::FILE_NAME))
    }

    /// `<platform data dir>/worldview`, if the platform has one.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("worldview"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let raw = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let mut next = self.entries.borrow().clone();
        apply(&mut next);
        self.flush(&next)?;
        *self.entries.borrow_mut() = next;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|m| {
            m.insert(key.to_owned(), value.to_owned());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        if !self.entries.borrow().contains_key(key) {
            return Ok(());
        }
        self.update(|m| {
            m.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStore::open_in(dir.path()).unwrap();
            store.set("viewcount:canada", "5").unwrap();
            store.set("saved-set", "[]").unwrap();
            store.remove("saved-set").unwrap();
        }
        let store = FileStore::open_in(dir.path()).unwrap();
        assert_eq!(store.get("viewcount:canada").unwrap().as_deref(), Some("5"));
        assert_eq!(store.get("saved-set").unwrap(), None);
    }

    #[test]
    fn failed_write_leaves_memory_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("missing").join("state.json")).unwrap();
        assert!(store.set("k", "v").is_err());
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ nope").unwrap();
        assert!(matches!(FileStore::open(&path), Err(Error::Json(_))));
    }
}
