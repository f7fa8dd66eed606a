//! Cross-context message bus.
//!
//! One `MessageBus` instance per context (wizard page, chat panel, another
//! tab). Instances exchange `MessageEnvelope`s over whichever transports
//! they are constructed with; each envelope carries the sender's source
//! tag so a context never processes its own messages.

pub mod bus;
pub mod envelope;
pub mod frame;
pub mod local;
pub mod tab;
pub mod transport;

pub use bus::{MessageBus, MessageHandler, SendOptions};
pub use envelope::{MessageEnvelope, MessageType};
pub use frame::CrossFrameTransport;
pub use local::{PageChannel, SamePageTransport};
pub use tab::CrossTabTransport;
pub use transport::Transport;
