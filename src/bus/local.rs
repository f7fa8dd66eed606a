//! Same-page transport — contexts sharing one process-local channel.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use crate::bus::envelope::MessageEnvelope;
use crate::bus::transport::Transport;
use crate::error::TransportError;

const PAGE_CAPACITY: usize = 256;

/// Shared broadcast channel standing in for a page. Every
/// `SamePageTransport` built from the same `PageChannel` sees every
/// envelope published to it, including its own (the bus drops self-echoes
/// by source tag).
#[derive(Clone)]
pub struct PageChannel {
    tx: broadcast::Sender<MessageEnvelope>,
}

impl PageChannel {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(PAGE_CAPACITY);
        Self { tx }
    }

    fn send(&self, envelope: MessageEnvelope) {
        // No other contexts on the page is fine.
        let _ = self.tx.send(envelope);
    }

    fn subscribe(&self) -> broadcast::Receiver<MessageEnvelope> {
        self.tx.subscribe()
    }
}

impl Default for PageChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Transport binding one context to a `PageChannel`.
pub struct SamePageTransport {
    page: PageChannel,
    incoming: Mutex<Option<mpsc::UnboundedReceiver<MessageEnvelope>>>,
}

impl SamePageTransport {
    pub fn new(page: &PageChannel) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut feed = page.subscribe();
        tokio::spawn(async move {
            loop {
                match feed.recv().await {
                    Ok(envelope) => {
                        if tx.send(envelope).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "same-page transport lagged, messages dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Self {
            page: page.clone(),
            incoming: Mutex::new(Some(rx)),
        }
    }
}

#[async_trait]
impl Transport for SamePageTransport {
    fn name(&self) -> &'static str {
        "same-page"
    }

    async fn publish(&self, envelope: &MessageEnvelope) -> Result<(), TransportError> {
        self.page.send(envelope.clone());
        Ok(())
    }

    fn take_incoming(&self) -> Option<mpsc::UnboundedReceiver<MessageEnvelope>> {
        self.incoming.lock().ok()?.take()
    }
}
