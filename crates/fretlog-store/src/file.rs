//! File-backed store
//!
//! A single JSON object of key → text. Every operation reads the file
//! afresh and every write replaces it atomically (write to a sibling temp
//! file, then rename), so readers never see a half-written store.

use crate::error::StoreError;
use crate::kv::KeyValueStore;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Store persisted as one JSON file
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Store at `path`; the file is created on first write
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Backing file
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(StoreError::io_error(&self.path, e)),
        };
        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&text).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(entries).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, text).map_err(|e| StoreError::io_error(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| StoreError::io_error(&self.path, e))?;
        tracing::debug!(path = %self.path.display(), keys = entries.len(), "store file written");
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock();
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io_error(&self.path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("store.json"));
        assert_eq!(store.get("anything").unwrap(), None);
        store.clear().unwrap();
    }

    #[test]
    fn writes_are_visible_to_a_second_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let a = FileStore::new(&path);
        a.set("guitarTrackerData", r#"{"version":6}"#).unwrap();
        let b = FileStore::new(&path);
        assert_eq!(
            b.get("guitarTrackerData").unwrap().as_deref(),
            Some(r#"{"version":6}"#)
        );
        b.remove("guitarTrackerData").unwrap();
        assert_eq!(a.get("guitarTrackerData").unwrap(), None);
        assert!(!dir.path().join("store.tmp").exists());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "[1,2,3]").unwrap();
        let store = FileStore::new(&path);
        assert!(matches!(store.get("k"), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn clear_deletes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = FileStore::new(&path);
        store.set("k", "v").unwrap();
        store.clear().unwrap();
        assert!(!path.exists());
    }
}
