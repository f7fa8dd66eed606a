//! Configuration types.

use std::time::Duration;

/// Wizard core configuration.
#[derive(Debug, Clone)]
pub struct WizardConfig {
    /// Maximum accepted length for a free-text answer, in characters.
    pub max_answer_len: usize,
    /// Time-to-live for cross-tab envelope slots in the shared store.
    pub cross_tab_ttl: Duration,
    /// Interval between periodic context-sync publications.
    pub context_sync_interval: Duration,
    /// Upper bound on a voice listen operation before it resolves to
    /// "no result".
    pub voice_listen_timeout: Duration,
    /// How long the avatar holds the concerned mood before returning to idle.
    pub concerned_hold: Duration,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            max_answer_len: 4000,
            cross_tab_ttl: Duration::from_secs(60),
            context_sync_interval: Duration::from_secs(5),
            voice_listen_timeout: Duration::from_secs(10),
            concerned_hold: Duration::from_secs(4),
        }
    }
}
