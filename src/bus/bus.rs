//! The message bus — fan-out over transports, dispatch to handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::bus::envelope::{MessageEnvelope, MessageType};
use crate::bus::transport::Transport;
use crate::error::Error;

/// Per-send options.
#[derive(Debug, Clone, Copy)]
pub struct SendOptions {
    /// Non-persistent sends skip durable transports (the shared store).
    pub persistent: bool,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self { persistent: true }
    }
}

/// Receives envelopes of one message type.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, envelope: MessageEnvelope) -> Result<(), Error>;
}

/// One context's bus instance.
///
/// Exactly one handler per message type: registering again replaces the
/// previous handler. Envelopes whose source tag matches this bus are
/// dropped before dispatch so a context never reacts to its own traffic.
pub struct MessageBus {
    source_tag: String,
    transports: Vec<Arc<dyn Transport>>,
    handlers: RwLock<HashMap<MessageType, Arc<dyn MessageHandler>>>,
}

impl MessageBus {
    pub fn new(source_tag: impl Into<String>, transports: Vec<Arc<dyn Transport>>) -> Self {
        Self {
            source_tag: source_tag.into(),
            transports,
            handlers: RwLock::new(HashMap::new()),
        }
    }

    pub fn source_tag(&self) -> &str {
        &self.source_tag
    }

    /// Take over each transport's incoming stream and start dispatching.
    /// Call once after all transports are wired up.
    pub fn start(self: &Arc<Self>) {
        for transport in &self.transports {
            let Some(mut rx) = transport.take_incoming() else {
                tracing::warn!(
                    transport = transport.name(),
                    "incoming stream already taken, skipping"
                );
                continue;
            };
            let bus = Arc::clone(self);
            let name = transport.name();
            tokio::spawn(async move {
                while let Some(envelope) = rx.recv().await {
                    bus.process_message(name, envelope).await;
                }
                tracing::debug!(transport = name, "incoming stream ended");
            });
        }
    }

    /// Register the handler for a message type, replacing any previous one.
    pub async fn register_handler(&self, kind: MessageType, handler: Arc<dyn MessageHandler>) {
        let previous = self.handlers.write().await.insert(kind, handler);
        if previous.is_some() {
            tracing::debug!(%kind, "message handler replaced");
        }
    }

    pub async fn unregister_handler(&self, kind: MessageType) {
        self.handlers.write().await.remove(&kind);
    }

    /// Build an envelope and publish it on every eligible transport.
    /// Individual transport failures are logged; the send itself does not
    /// fail as long as the bus exists.
    pub async fn send(
        &self,
        kind: MessageType,
        data: serde_json::Value,
        options: SendOptions,
    ) -> MessageEnvelope {
        let envelope = MessageEnvelope {
            kind,
            data,
            timestamp: Utc::now(),
            source: self.source_tag.clone(),
            persistent: options.persistent,
        };
        for transport in &self.transports {
            if !envelope.persistent && transport.durable_only() {
                continue;
            }
            if let Err(e) = transport.publish(&envelope).await {
                tracing::warn!(transport = transport.name(), %kind, error = %e,
                    "transport publish failed");
            }
        }
        envelope
    }

    async fn process_message(&self, transport: &'static str, envelope: MessageEnvelope) {
        if envelope.source == self.source_tag {
            tracing::trace!(%transport, kind = %envelope.kind, "dropping own message");
            return;
        }
        let handler = self.handlers.read().await.get(&envelope.kind).cloned();
        match handler {
            Some(handler) => {
                let kind = envelope.kind;
                if let Err(e) = handler.handle(envelope).await {
                    tracing::warn!(%transport, %kind, error = %e, "message handler failed");
                }
            }
            None => {
                tracing::warn!(%transport, kind = %envelope.kind,
                    "no handler registered, message dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::local::{PageChannel, SamePageTransport};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Counter(AtomicUsize);

    #[async_trait]
    impl MessageHandler for Counter {
        async fn handle(&self, _: MessageEnvelope) -> Result<(), Error> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn bus_on(page: &PageChannel, tag: &str) -> Arc<MessageBus> {
        let bus = Arc::new(MessageBus::new(
            tag,
            vec![Arc::new(SamePageTransport::new(page)) as Arc<dyn Transport>],
        ));
        bus.start();
        bus
    }

    #[tokio::test]
    async fn own_messages_are_never_dispatched() {
        let page = PageChannel::new();
        let bus = bus_on(&page, "wizard");
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        bus.register_handler(MessageType::StatusUpdate, counter.clone())
            .await;

        bus.send(
            MessageType::StatusUpdate,
            serde_json::json!({}),
            SendOptions::default(),
        )
        .await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn messages_reach_the_other_context_once() {
        let page = PageChannel::new();
        let wizard = bus_on(&page, "wizard");
        let chat = bus_on(&page, "chat");
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        chat.register_handler(MessageType::StepChanged, counter.clone())
            .await;

        wizard
            .send(
                MessageType::StepChanged,
                serde_json::json!({"step": 2}),
                SendOptions::default(),
            )
            .await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn registering_again_replaces_the_handler() {
        let page = PageChannel::new();
        let wizard = bus_on(&page, "wizard");
        let chat = bus_on(&page, "chat");
        let first = Arc::new(Counter(AtomicUsize::new(0)));
        let second = Arc::new(Counter(AtomicUsize::new(0)));
        chat.register_handler(MessageType::HelpRequest, first.clone())
            .await;
        chat.register_handler(MessageType::HelpRequest, second.clone())
            .await;

        wizard
            .send(
                MessageType::HelpRequest,
                serde_json::json!({}),
                SendOptions::default(),
            )
            .await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(first.0.load(Ordering::SeqCst), 0);
        assert_eq!(second.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unhandled_messages_are_dropped_quietly() {
        let page = PageChannel::new();
        let wizard = bus_on(&page, "wizard");
        let _chat = bus_on(&page, "chat");

        // No handler registered anywhere; must not panic.
        wizard
            .send(
                MessageType::ErrorNotification,
                serde_json::json!({"message": "boom"}),
                SendOptions::default(),
            )
            .await;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
