//! Persistence layer — key/value session store port and backends.

pub mod file;
pub mod memory;
pub mod traits;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use traits::{SessionStore, StoreChange};

/// Logical key layout for the shared store.
pub mod keys {
    use uuid::Uuid;

    /// The "current session" slot.
    pub const CURRENT_SESSION: &str = "wizard/session/current";

    /// Prefix for per-framework session slots.
    pub const SESSION_PREFIX: &str = "wizard/session/";

    /// Prefix for cross-tab bus envelope slots.
    pub const BUS_PREFIX: &str = "wizard/bus/";

    /// The per-framework session slot.
    pub fn framework_session(framework_id: &str) -> String {
        format!("{SESSION_PREFIX}{framework_id}")
    }

    /// A uniquely-keyed cross-tab envelope slot.
    pub fn bus_slot() -> String {
        format!("{}{}", BUS_PREFIX, Uuid::new_v4())
    }
}
