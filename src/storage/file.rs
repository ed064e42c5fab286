//! Persistent store backed by a single JSON file.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{KeyValueStore, StorageError};
use crate::observability::metrics;

/// A write-through store: every mutation rewrites the backing file.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`, loading existing contents if present.
    ///
    /// A file that cannot be decoded is treated as empty so a corrupted store
    /// never prevents startup; the next write replaces it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let mut entries = HashMap::new();

        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            match serde_json::from_reader::<_, HashMap<String, String>>(reader) {
                Ok(map) => {
                    entries = map;
                    tracing::info!(path = ?path, keys = entries.len(), "Loaded persistent store");
                }
                Err(e) => {
                    metrics::record_storage_failure("load");
                    tracing::error!(path = ?path, error = %e, "Persistent store is malformed, starting empty");
                }
            }
        }

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        let tmp = self.path.with_extension("tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer(&mut writer, entries)?;
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().map_err(|_| StorageError::Unavailable)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Unavailable)?;
        let previous = entries.insert(key.to_string(), value.to_string());

        if let Err(e) = self.persist(&entries) {
            // Keep memory and disk in agreement.
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Unavailable)?;
        if let Some(old) = entries.remove(key) {
            if let Err(e) = self.persist(&entries) {
                entries.insert(key.to_string(), old);
                return Err(e);
            }
        }
        Ok(())
    }

    fn size_bytes(&self) -> Result<usize, StorageError> {
        let entries = self.entries.lock().map_err(|_| StorageError::Unavailable)?;
        Ok(entries.iter().map(|(k, v)| k.len() + v.len()).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("trustgate-{}-{}.json", name, uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_persistence() {
        let path = temp_path("persist");

        let store = FileStore::open(&path).unwrap();
        store.set("greeting", "hello").unwrap();
        drop(store);

        let loaded = FileStore::open(&path).unwrap();
        assert_eq!(loaded.get("greeting").unwrap().as_deref(), Some("hello"));

        loaded.remove("greeting").unwrap();
        let reloaded = FileStore::open(&path).unwrap();
        assert!(reloaded.get("greeting").unwrap().is_none());

        std::fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_malformed_file_starts_empty() {
        let path = temp_path("malformed");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert!(store.get("anything").unwrap().is_none());
        assert_eq!(store.size_bytes().unwrap(), 0);

        store.set("k", "v").unwrap();
        let reloaded = FileStore::open(&path).unwrap();
        assert_eq!(reloaded.get("k").unwrap().as_deref(), Some("v"));

        std::fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let dir = std::env::temp_dir().join(format!("trustgate-missing-{}", uuid::Uuid::new_v4()));
        let store = FileStore::open(dir.join("store.json")).unwrap();

        // Parent directory does not exist, so the write fails.
        assert!(store.set("k", "v").is_err());
        assert!(store.get("k").unwrap().is_none());
    }
}
