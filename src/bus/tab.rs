//! Cross-tab transport — envelopes ride the shared session store.
//!
//! Each publish writes the envelope under a uniquely-keyed bus slot; other
//! tabs observe the write through the store's change feed. Slots are
//! removed after a TTL so the store does not accumulate stale traffic.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::bus::envelope::MessageEnvelope;
use crate::bus::transport::Transport;
use crate::error::TransportError;
use crate::store::{SessionStore, keys};

const NAME: &str = "cross-tab";

pub struct CrossTabTransport {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
    incoming: Mutex<Option<mpsc::UnboundedReceiver<MessageEnvelope>>>,
}

impl CrossTabTransport {
    pub fn new(store: Arc<dyn SessionStore>, ttl: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut changes = store.watch();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => {
                        if !change.key.starts_with(keys::BUS_PREFIX) {
                            continue;
                        }
                        // Removals (TTL cleanup) also arrive here.
                        let Some(value) = change.value else { continue };
                        match serde_json::from_value::<MessageEnvelope>(value) {
                            Ok(envelope) => {
                                if tx.send(envelope).is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                tracing::warn!(key = change.key, error = %e,
                                    "ignoring malformed cross-tab envelope");
                            }
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "cross-tab watcher lagged, changes dropped");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Self {
            store,
            ttl,
            incoming: Mutex::new(Some(rx)),
        }
    }
}

#[async_trait]
impl Transport for CrossTabTransport {
    fn name(&self) -> &'static str {
        NAME
    }

    fn durable_only(&self) -> bool {
        true
    }

    async fn publish(&self, envelope: &MessageEnvelope) -> Result<(), TransportError> {
        let key = keys::bus_slot();
        let value = serde_json::to_value(envelope).map_err(|e| TransportError::Publish {
            name: NAME,
            reason: e.to_string(),
        })?;
        self.store
            .put(&key, value)
            .await
            .map_err(|e| TransportError::Publish {
                name: NAME,
                reason: e.to_string(),
            })?;

        let store = Arc::clone(&self.store);
        let ttl = self.ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Err(e) = store.remove(&key).await {
                tracing::warn!(key, error = %e, "failed to expire cross-tab slot");
            }
        });
        Ok(())
    }

    fn take_incoming(&self) -> Option<mpsc::UnboundedReceiver<MessageEnvelope>> {
        self.incoming.lock().ok()?.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::envelope::MessageType;
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn envelope(source: &str) -> MessageEnvelope {
        MessageEnvelope {
            kind: MessageType::AnswerSaved,
            data: serde_json::json!({"question_id": "s1q0"}),
            timestamp: Utc::now(),
            source: source.into(),
            persistent: true,
        }
    }

    #[tokio::test]
    async fn publish_reaches_other_tab_through_the_store() {
        let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
        let a = CrossTabTransport::new(Arc::clone(&store), Duration::from_secs(60));
        let b = CrossTabTransport::new(Arc::clone(&store), Duration::from_secs(60));
        let mut rx = b.take_incoming().unwrap();

        a.publish(&envelope("wizard")).await.unwrap();
        let received = rx.recv().await.unwrap();
        assert_eq!(received.kind, MessageType::AnswerSaved);
        assert_eq!(received.source, "wizard");
    }

    #[tokio::test]
    async fn slots_expire_after_the_ttl() {
        let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
        let t = CrossTabTransport::new(Arc::clone(&store), Duration::from_millis(50));

        t.publish(&envelope("wizard")).await.unwrap();
        assert_eq!(
            store.keys_with_prefix(keys::BUS_PREFIX).await.unwrap().len(),
            1
        );

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(
            store
                .keys_with_prefix(keys::BUS_PREFIX)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn non_envelope_store_writes_are_ignored() {
        let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
        let t = CrossTabTransport::new(Arc::clone(&store), Duration::from_secs(60));
        let mut rx = t.take_incoming().unwrap();

        store
            .put("wizard/session/current", serde_json::json!({"x": 1}))
            .await
            .unwrap();
        store
            .put(&keys::bus_slot(), serde_json::json!("not an envelope"))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }
}
