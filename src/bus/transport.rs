//! Delivery channel port.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::bus::envelope::MessageEnvelope;
use crate::error::TransportError;

/// A bidirectional delivery channel between contexts.
///
/// Publishing is fire-and-forget from the bus's point of view: a failure
/// is reported but the bus keeps trying its other transports. Incoming
/// envelopes arrive on a receiver the bus takes ownership of at startup.
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &'static str;

    /// Durable transports are skipped for non-persistent envelopes.
    fn durable_only(&self) -> bool {
        false
    }

    async fn publish(&self, envelope: &MessageEnvelope) -> Result<(), TransportError>;

    /// Hand over the incoming stream. Yields `Some` exactly once.
    fn take_incoming(&self) -> Option<mpsc::UnboundedReceiver<MessageEnvelope>>;
}
