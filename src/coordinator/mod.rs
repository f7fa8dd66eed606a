//! Integration layer between the wizard engine, the message bus, and the
//! avatar collaborator.

pub mod coordinator;
pub mod guidance;
pub mod intent;

pub use coordinator::IntegrationCoordinator;
pub use intent::{NavAction, VoiceIntent, classify};
