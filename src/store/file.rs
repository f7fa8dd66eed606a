//! JSON-file store backend — the "survives a page reload" persistence tier.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};

use crate::error::PersistenceError;

use super::traits::{SessionStore, StoreChange};

const CHANGE_CAPACITY: usize = 256;

/// File-backed key/value store. The whole map is rewritten on every
/// mutation; fine at the scale of a handful of session snapshots.
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, serde_json::Value>>,
    changes: broadcast::Sender<StoreChange>,
}

impl FileStore {
    /// Open the store at `path`, loading any existing contents. A corrupt
    /// file is treated as empty rather than as a fatal condition.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e,
                        "store file is corrupt, starting empty");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Ok(Self {
            path,
            entries: RwLock::new(entries),
            changes,
        })
    }

    async fn flush(
        &self,
        entries: &HashMap<String, serde_json::Value>,
    ) -> Result<(), PersistenceError> {
        let bytes = serde_json::to_vec_pretty(entries)?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }

    fn notify(&self, key: &str, value: Option<serde_json::Value>) {
        let _ = self.changes.send(StoreChange {
            key: key.to_string(),
            value,
        });
    }
}

#[async_trait]
impl SessionStore for FileStore {
    async fn put(&self, key: &str, value: serde_json::Value) -> Result<(), PersistenceError> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value.clone());
        self.flush(&entries).await?;
        drop(entries);
        self.notify(key, Some(value));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, PersistenceError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        let mut entries = self.entries.write().await;
        if entries.remove(key).is_some() {
            self.flush(&entries).await?;
            drop(entries);
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
    async fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = FileStore::open(&path).await.unwrap();
        store
            .put("wizard/session/current", json!({"current_step": 3}))
            .await
            .unwrap();
        drop(store);

        let reopened = FileStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.get("wizard/session/current").await.unwrap(),
            Some(json!({"current_step": 3}))
        );
    }

    #[tokio::test]
    async fn corrupt_file_is_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let store = FileStore::open(&path).await.unwrap();
        assert_eq!(store.get("anything").await.unwrap(), None);
    }

    #[tokio::test]
    async fn remove_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = FileStore::open(&path).await.unwrap();
        store.put("k", json!(1)).await.unwrap();
        store.remove("k").await.unwrap();
        drop(store);

        let reopened = FileStore::open(&path).await.unwrap();
        assert_eq!(reopened.get("k").await.unwrap(), None);
    }
}
