//! Cross-frame transport — a point-to-point pair of channels between a
//! host context and an embedded one.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::bus::envelope::MessageEnvelope;
use crate::bus::transport::Transport;
use crate::error::TransportError;

const NAME: &str = "cross-frame";

/// One end of a host/embedded pair. Everything published on one end
/// arrives only at the other.
pub struct CrossFrameTransport {
    outgoing: mpsc::UnboundedSender<MessageEnvelope>,
    incoming: Mutex<Option<mpsc::UnboundedReceiver<MessageEnvelope>>>,
}

impl CrossFrameTransport {
    /// Build both ends of the link.
    pub fn pair() -> (Self, Self) {
        let (host_tx, embedded_rx) = mpsc::unbounded_channel();
        let (embedded_tx, host_rx) = mpsc::unbounded_channel();
        (
            Self {
                outgoing: host_tx,
                incoming: Mutex::new(Some(host_rx)),
            },
            Self {
                outgoing: embedded_tx,
                incoming: Mutex::new(Some(embedded_rx)),
            },
        )
    }
}

#[async_trait]
impl Transport for CrossFrameTransport {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn publish(&self, envelope: &MessageEnvelope) -> Result<(), TransportError> {
        self.outgoing
            .send(envelope.clone())
            .map_err(|_| TransportError::ChannelClosed { name: NAME })
    }

    fn take_incoming(&self) -> Option<mpsc::UnboundedReceiver<MessageEnvelope>> {
        self.incoming.lock().ok()?.take()
    }
}
