//! Durable key-value storage used for sessions and downloads.
//!
//! Keys are independent: nothing here is transactional across keys.

mod file;

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::Result;

pub use file::FileStore;

/// Minimal string key-value contract.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Read a JSON value stored under `key`.
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Store `value` as JSON under `key`.
pub fn save_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let serialized = serde_json::to_string(value)?;
    store.set(key, &serialized)
}

/// Process-memory store; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_roundtrip_and_remove() {
        let store = MemoryStore::default();
        assert_eq!(store.get("session").unwrap(), None);

        store.set("session", "abc").unwrap();
        assert_eq!(store.get("session").unwrap().as_deref(), Some("abc"));

        store.remove("session").unwrap();
        store.remove("session").unwrap();
        assert_eq!(store.get("session").unwrap(), None);
    }

    #[test]
    fn json_helpers_report_bad_payloads() {
        let store = MemoryStore::default();
        store.set("downloads", "not json").unwrap();
        let error = load_json::<Vec<u32>>(&store, "downloads").unwrap_err();
        assert!(matches!(error, crate::Error::Serialization(_)));

        save_json(&store, "downloads", &vec![1_u32, 2]).unwrap();
        assert_eq!(
            load_json::<Vec<u32>>(&store, "downloads").unwrap(),
            Some(vec![1, 2])
        );
    }
}
