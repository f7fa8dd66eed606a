//! In-memory store backend.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};

use crate::error::PersistenceError;

use super::traits::{SessionStore, StoreChange};

const CHANGE_CAPACITY: usize = 256;

/// In-memory key/value store. Suitable for tests and for wiring several
/// simulated browsing contexts inside one process.
pub struct MemoryStore {
    entries: RwLock<HashMap<String, serde_json::Value>>,
    changes: broadcast::Sender<StoreChange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            entries: RwLock::new(HashMap::new()),
            changes,
        }
    }

    fn notify(&self, key: &str, value: Option<serde_json::Value>) {
        // No watchers is fine.
        let _ = self.changes.send(StoreChange {
            key: key.to_string(),
            value,
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn put(&self, key: &str, value: serde_json::Value) -> Result<(), PersistenceError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.clone());
        self.notify(key, Some(value));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, PersistenceError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        let removed = self.entries.write().await.remove(key);
        if removed.is_some() {
            self.notify(key, None);
        }
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, PersistenceError> {
        Ok(self
            .entries
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn watch(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn put_get_remove_round_trip() {
        let store = MemoryStore::new();
        store.put("a/b", json!({"x": 1})).await.unwrap();
        assert_eq!(store.get("a/b").await.unwrap(), Some(json!({"x": 1})));

        store.remove("a/b").await.unwrap();
        assert_eq!(store.get("a/b").await.unwrap(), None);
        // Removing again is a no-op.
        store.remove("a/b").await.unwrap();
    }

    #[tokio::test]
    async fn prefix_listing() {
        let store = MemoryStore::new();
        store.put("wizard/bus/1", json!(1)).await.unwrap();
        store.put("wizard/bus/2", json!(2)).await.unwrap();
        store.put("wizard/session/current", json!(3)).await.unwrap();

        let mut keys = store.keys_with_prefix("wizard/bus/").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["wizard/bus/1", "wizard/bus/2"]);
    }

    #[tokio::test]
    async fn watch_observes_writes_and_removals() {
        let store = MemoryStore::new();
        let mut rx = store.watch();

        store.put("k", json!("v")).await.unwrap();
        let change = rx.recv().await.unwrap();
        assert_eq!(change.key, "k");
        assert_eq!(change.value, Some(json!("v")));

        store.remove("k").await.unwrap();
        let change = rx.recv().await.unwrap();
        assert_eq!(change.key, "k");
        assert!(change.value.is_none());
    }
}
