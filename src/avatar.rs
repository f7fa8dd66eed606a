//! Avatar collaborator — a mood state machine observers can subscribe to.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast};

const TRANSITION_CAPACITY: usize = 64;

/// Expressive state of the avatar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvatarMood {
    Idle,
    Speaking,
    Listening,
    Thinking,
    Celebrating,
    Concerned,
}

/// A mood change, broadcast to every subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvatarTransition {
    pub from: AvatarMood,
    pub to: AvatarMood,
}

/// The avatar. Mood changes are broadcast; any number of observers
/// (renderers, tests) may subscribe without displacing each other.
pub struct Avatar {
    mood: RwLock<AvatarMood>,
    transitions: broadcast::Sender<AvatarTransition>,
    concerned_hold: Duration,
}

impl Avatar {
    pub fn new(concerned_hold: Duration) -> Self {
        let (transitions, _) = broadcast::channel(TRANSITION_CAPACITY);
        Self {
            mood: RwLock::new(AvatarMood::Idle),
            transitions,
            concerned_hold,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AvatarTransition> {
        self.transitions.subscribe()
    }

    pub async fn mood(&self) -> AvatarMood {
        *self.mood.read().await
    }

    pub async fn set_mood(&self, to: AvatarMood) {
        let mut mood = self.mood.write().await;
        let from = *mood;
        if from == to {
            return;
        }
        *mood = to;
        drop(mood);
        tracing::trace!(?from, ?to, "avatar mood changed");
        let _ = self.transitions.send(AvatarTransition { from, to });
    }

    pub async fn speech_started(&self) {
        self.set_mood(AvatarMood::Speaking).await;
    }

    pub async fn speech_ended(&self) {
        self.set_mood(AvatarMood::Idle).await;
    }

    pub async fn listening_started(&self) {
        self.set_mood(AvatarMood::Listening).await;
    }

    pub async fn listening_ended(&self) {
        self.set_mood(AvatarMood::Idle).await;
    }

    pub async fn thinking(&self) {
        self.set_mood(AvatarMood::Thinking).await;
    }

    pub async fn celebrate(&self) {
        self.set_mood(AvatarMood::Celebrating).await;
    }

    /// Show concern, then return to idle after the hold interval unless
    /// something else changed the mood in the meantime.
    pub async fn express_concern(self: &Arc<Self>) {
        self.set_mood(AvatarMood::Concerned).await;
        let avatar = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(avatar.concerned_hold).await;
            let mut mood = avatar.mood.write().await;
            if *mood == AvatarMood::Concerned {
                *mood = AvatarMood::Idle;
                drop(mood);
                let _ = avatar.transitions.send(AvatarTransition {
                    from: AvatarMood::Concerned,
                    to: AvatarMood::Idle,
                });
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transitions_are_broadcast() {
        let avatar = Avatar::new(Duration::from_secs(4));
        let mut rx = avatar.subscribe();

        avatar.speech_started().await;
        let t = rx.recv().await.unwrap();
        assert_eq!(t.from, AvatarMood::Idle);
        assert_eq!(t.to, AvatarMood::Speaking);

        avatar.speech_ended().await;
        let t = rx.recv().await.unwrap();
        assert_eq!(t.to, AvatarMood::Idle);
    }

    #[tokio::test]
    async fn setting_the_same_mood_is_silent() {
        let avatar = Avatar::new(Duration::from_secs(4));
        let mut rx = avatar.subscribe();
        avatar.set_mood(AvatarMood::Idle).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn concern_returns_to_idle_after_the_hold() {
        let avatar = Arc::new(Avatar::new(Duration::from_millis(30)));
        avatar.express_concern().await;
        assert_eq!(avatar.mood().await, AvatarMood::Concerned);

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(avatar.mood().await, AvatarMood::Idle);
    }

    #[tokio::test]
    async fn concern_timeout_yields_to_newer_moods() {
        let avatar = Arc::new(Avatar::new(Duration::from_millis(30)));
        avatar.express_concern().await;
        avatar.celebrate().await;

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(avatar.mood().await, AvatarMood::Celebrating);
    }
}
