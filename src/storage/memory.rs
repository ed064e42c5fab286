//! In-memory store used for session-scoped state and in tests.

use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{KeyValueStore, StorageError};

/// A concurrent in-memory store.
///
/// An optional byte quota mirrors the limits browsers put on web storage, and
/// the store can be switched off to simulate storage being disabled.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<DashMap<String, String>>,
    quota: Option<usize>,
    disabled: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Create an empty, unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that rejects writes beyond `quota` bytes.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            quota: Some(quota),
            ..Self::default()
        }
    }

    /// Make every subsequent operation fail with `Unavailable`.
    pub fn disable(&self) {
        self.disabled.store(true, Ordering::SeqCst);
    }

    pub fn enable(&self) {
        self.disabled.store(false, Ordering::SeqCst);
    }

    /// Drop everything, as when the browser clears session storage.
    pub fn clear(&self) {
        self.inner.clear();
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.disabled.load(Ordering::SeqCst) {
            Err(StorageError::Unavailable)
        } else {
            Ok(())
        }
    }

    fn used_bytes(&self) -> usize {
        self.inner
            .iter()
            .map(|r| r.key().len() + r.value().len())
            .sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check_available()?;
        Ok(self.inner.get(key).map(|r| r.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_available()?;

        if let Some(quota) = self.quota {
            // One pass, so the replaced entry is measured in the same snapshot.
            let others: usize = self
                .inner
                .iter()
                .filter(|r| r.key() != key)
                .map(|r| r.key().len() + r.value().len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded { needed, quota });
            }
        }

        self.inner.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check_available()?;
        self.inner.remove(key);
        Ok(())
    }

    fn size_bytes(&self) -> Result<usize, StorageError> {
        self.check_available()?;
        Ok(self.used_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        let store = MemoryStore::new();
        assert!(store.get("a").unwrap().is_none());

        store.set("a", "one").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("one"));
        assert_eq!(store.size_bytes().unwrap(), 4);

        store.remove("a").unwrap();
        assert!(store.get("a").unwrap().is_none());
    }

    #[test]
    fn test_quota_counts_replaced_value_once() {
        let store = MemoryStore::with_quota(10);
        store.set("k", "123456789").unwrap();
        // Overwriting the same key must not double count the old value.
        store.set("k", "987654321").unwrap();

        let err = store.set("k2", "x").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { quota: 10, .. }));
    }

    #[test]
    fn test_shrinking_a_key_under_quota() {
        let store = MemoryStore::with_quota(12);
        store.set("a", "0123456789").unwrap();
        store.set("a", "x").unwrap();
        assert_eq!(store.size_bytes().unwrap(), 2);

        // Freed space is available to other keys.
        store.set("b", "012345678").unwrap();
        assert_eq!(store.size_bytes().unwrap(), 12);
        assert!(store.set("a", "xy").is_err());
        assert_eq!(store.get("a").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn test_disabled_store_fails_every_operation() {
        let store = MemoryStore::new();
        store.set("a", "1").unwrap();
        store.disable();

        assert!(matches!(store.get("a"), Err(StorageError::Unavailable)));
        assert!(matches!(store.set("a", "2"), Err(StorageError::Unavailable)));

        store.enable();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
    }
}
