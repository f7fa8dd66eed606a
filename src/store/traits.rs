//! `SessionStore` trait — async key/value persistence with change
//! notifications.
//!
//! The store holds session snapshots and transient cross-tab envelope slots.
//! `watch()` is the analogue of a storage change event: every write and
//! removal is broadcast to all watchers, including the writer itself.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::PersistenceError;

/// A change observed in the store.
#[derive(Debug, Clone)]
pub struct StoreChange {
    pub key: String,
    /// The new value, or `None` for a removal.
    pub value: Option<serde_json::Value>,
}

/// Backend-agnostic key/value store for session snapshots and bus slots.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Write a value under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: serde_json::Value) -> Result<(), PersistenceError>;

    /// Read the value under `key`.
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, PersistenceError>;

    /// Remove the value under `key`. Removing an absent key is a no-op.
    async fn remove(&self, key: &str) -> Result<(), PersistenceError>;

    /// List keys starting with `prefix`.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, PersistenceError>;

    /// Subscribe to change notifications.
    fn watch(&self) -> broadcast::Receiver<StoreChange>;
}
