//! Error types for the compliance wizard.

/// Top-level error type for the wizard core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Catalog and framework configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown framework: {0}")]
    UnknownFramework(String),

    #[error("Malformed catalog entry for {framework}: {reason}")]
    MalformedCatalog { framework: String, reason: String },
}

/// Step navigation errors.
#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    #[error("No assessment session is active")]
    NoActiveSession,

    #[error("The assessment is already completed")]
    AssessmentCompleted,

    #[error("Step {requested} is out of range (1..={total})")]
    StepOutOfRange { requested: u32, total: u32 },

    #[error("Step skipping to {requested} is not allowed (current step {current})")]
    SkipNotAllowed { requested: u32, current: u32 },
}

/// Session store errors. A corrupt snapshot is treated as "no saved
/// session" by callers, not as a fatal condition.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Corrupt snapshot: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Delivery channel errors. A failing transport is logged and the
/// remaining transports are still attempted.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Transport {name} is unavailable")]
    Unavailable { name: &'static str },

    #[error("Transport {name} channel closed")]
    ChannelClosed { name: &'static str },

    #[error("Transport {name} failed to publish: {reason}")]
    Publish { name: &'static str, reason: String },
}
