//! Integration coordinator — wires the wizard engine, the message bus,
//! and the avatar together.
//!
//! Outbound: engine events become bus messages with guidance text
//! attached. Inbound: chat-side requests (navigation, help, explanation,
//! voice, suggestions) are applied to the engine and answered with
//! status updates.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast, mpsc};

use crate::avatar::Avatar;
use crate::bus::{MessageBus, MessageEnvelope, MessageHandler, MessageType, SendOptions};
use crate::config::WizardConfig;
use crate::error::Error;
use crate::wizard::{StepOutcome, WizardEngine, WizardEvent};

use super::guidance;
use super::intent::{self, NavAction, VoiceIntent};

/// Progress marks announced once per session.
const MILESTONES: [u8; 4] = [25, 50, 75, 90];

/// Inbound message types the coordinator answers.
const INBOUND: [MessageType; 5] = [
    MessageType::NavigationRequest,
    MessageType::HelpRequest,
    MessageType::ExplanationRequest,
    MessageType::VoiceInput,
    MessageType::SuggestionSelected,
];

pub struct IntegrationCoordinator {
    engine: Arc<RwLock<WizardEngine>>,
    bus: Arc<MessageBus>,
    avatar: Arc<Avatar>,
    config: WizardConfig,
}

impl IntegrationCoordinator {
    pub fn new(
        engine: Arc<RwLock<WizardEngine>>,
        bus: Arc<MessageBus>,
        avatar: Arc<Avatar>,
        config: WizardConfig,
    ) -> Self {
        Self {
            engine,
            bus,
            avatar,
            config,
        }
    }

    pub fn engine(&self) -> &Arc<RwLock<WizardEngine>> {
        &self.engine
    }

    pub fn avatar(&self) -> &Arc<Avatar> {
        &self.avatar
    }

    /// Register inbound handlers, start relaying engine events, and start
    /// the periodic context sync. Call once after construction.
    pub async fn start(self: &Arc<Self>) {
        let handler: Arc<dyn MessageHandler> = Arc::new(InboundHandler {
            coordinator: Arc::clone(self),
        });
        for kind in INBOUND {
            self.bus.register_handler(kind, Arc::clone(&handler)).await;
        }

        let mut events = self.engine.read().await.subscribe();
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => coordinator.handle_engine_event(event).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "engine event relay lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        self.spawn_context_sync();
    }

    // ── Outbound: engine events to the bus ──────────────────────────

    async fn handle_engine_event(&self, event: WizardEvent) {
        match event {
            WizardEvent::FrameworkSelected {
                framework_id,
                name,
                total_steps,
            } => {
                self.avatar.speech_started().await;
                let text = guidance::welcome(&framework_id, &name, total_steps);
                self.bus
                    .send(
                        MessageType::FrameworkSelected,
                        serde_json::json!({
                            "framework_id": framework_id,
                            "framework_name": name,
                            "total_steps": total_steps,
                            "guidance": text,
                        }),
                        SendOptions::default(),
                    )
                    .await;
                self.avatar.speech_ended().await;
            }
            WizardEvent::StepChanged {
                step,
                total_steps,
                info,
            } => {
                let framework_id = {
                    let engine = self.engine.read().await;
                    engine
                        .session()
                        .map(|s| s.framework_id.clone())
                        .unwrap_or_default()
                };
                let title = info
                    .as_ref()
                    .map(|i| i.title.clone())
                    .unwrap_or_else(|| format!("Step {step}"));
                let text = guidance::step_guidance(&framework_id, step, total_steps, &title);
                self.bus
                    .send(
                        MessageType::StepChanged,
                        serde_json::json!({
                            "step": step,
                            "total_steps": total_steps,
                            "info": serde_json::to_value(&info).unwrap_or_default(),
                            "guidance": text,
                        }),
                        SendOptions::default(),
                    )
                    .await;
            }
            WizardEvent::ProgressUpdated { previous, percent } => {
                self.bus
                    .send(
                        MessageType::ProgressUpdated,
                        serde_json::json!({
                            "previous": previous,
                            "progress": percent,
                        }),
                        SendOptions::default(),
                    )
                    .await;
                self.announce_milestones(previous, percent).await;
            }
            WizardEvent::ValidationFailed { step, issues } => {
                self.bus
                    .send(
                        MessageType::ValidationError,
                        serde_json::json!({
                            "step": step,
                            "issues": serde_json::to_value(&issues).unwrap_or_default(),
                        }),
                        SendOptions::default(),
                    )
                    .await;
                self.avatar.express_concern().await;
            }
            WizardEvent::AssessmentComplete(results) => {
                self.avatar.celebrate().await;
                let text = guidance::completion(
                    &results.framework_name,
                    results.answered_questions,
                    results.total_questions,
                );
                self.bus
                    .send(
                        MessageType::AssessmentComplete,
                        serde_json::json!({
                            "results": serde_json::to_value(&results).unwrap_or_default(),
                            "guidance": text,
                        }),
                        SendOptions::default(),
                    )
                    .await;
            }
        }
    }

    /// Announce milestones crossed by a progress change, once per session.
    async fn announce_milestones(&self, previous: f64, percent: f64) {
        for milestone in MILESTONES {
            let mark = milestone as f64;
            if previous < mark && percent >= mark {
                let newly = self.engine.write().await.mark_milestone(milestone).await;
                if newly {
                    self.bus
                        .send(
                            MessageType::StatusUpdate,
                            serde_json::json!({
                                "category": "milestone",
                                "milestone": milestone,
                                "message": guidance::milestone_message(milestone),
                            }),
                            SendOptions::default(),
                        )
                        .await;
                }
            }
        }
    }

    // ── Inbound: requests from other contexts ───────────────────────

    async fn handle_navigation(&self, action: NavAction) {
        let (success, message) = self.apply_navigation(action).await;
        self.respond("navigation", success, &message).await;
    }

    async fn apply_navigation(&self, action: NavAction) -> (bool, String) {
        match action {
            NavAction::Next => {
                let outcome = self.engine.write().await.next_step(false).await;
                match outcome {
                    Ok(StepOutcome::Advanced { step, .. }) => {
                        (true, format!("Moved to step {step}."))
                    }
                    Ok(StepOutcome::Blocked { issues }) => {
                        let detail = issues
                            .iter()
                            .filter(|i| i.blocking)
                            .map(|i| i.message.as_str())
                            .collect::<Vec<_>>()
                            .join("; ");
                        (false, format!("Can't move on yet: {detail}"))
                    }
                    Ok(StepOutcome::Completed(_)) => {
                        (true, "That was the last step. Assessment complete!".into())
                    }
                    Err(e) => (false, format!("Can't move to the next step: {e}")),
                }
            }
            NavAction::Previous => {
                if self.engine.write().await.previous_step() {
                    let step = {
                        let engine = self.engine.read().await;
                        engine.session().map(|s| s.current_step).unwrap_or(1)
                    };
                    (true, format!("Moved back to step {step}."))
                } else {
                    (false, "Already at the first step.".into())
                }
            }
            NavAction::Goto(step) => {
                match self.engine.write().await.go_to_step(step, false) {
                    Ok(()) => (true, format!("Moved to step {step}.")),
                    Err(e) => (false, format!("Can't navigate to step {step}: {e}")),
                }
            }
        }
    }

    async fn handle_help(&self, topic: Option<&str>) {
        self.avatar.thinking().await;
        let text = guidance::help_text(topic);
        self.respond("help", true, &text).await;
        self.avatar.speech_ended().await;
    }

    async fn handle_explanation(&self, concept: &str) {
        self.avatar.thinking().await;
        let text = guidance::explanation(concept);
        self.respond("explanation", true, &text).await;
        self.avatar.speech_ended().await;
    }

    async fn handle_suggestion(&self, suggestion: &str) {
        let text = guidance::suggestion_response(suggestion);
        self.respond("suggestion", true, &text).await;
    }

    async fn handle_voice(&self, transcript: &str) {
        match intent::classify(transcript) {
            VoiceIntent::Navigation(action) => self.handle_navigation(action).await,
            VoiceIntent::Help { topic } => self.handle_help(topic.as_deref()).await,
            VoiceIntent::Explanation { concept } => self.handle_explanation(&concept).await,
            VoiceIntent::General(text) => {
                self.respond("voice", true, &format!("I heard: {text}")).await;
            }
        }
    }

    /// Wait for one transcript from a capture channel, with the avatar in
    /// the listening mood. Returns None when the listen window times out.
    pub async fn listen(&self, transcripts: &mut mpsc::Receiver<String>) -> Option<String> {
        self.avatar.listening_started().await;
        let result =
            tokio::time::timeout(self.config.voice_listen_timeout, transcripts.recv()).await;
        self.avatar.listening_ended().await;
        match result {
            Ok(transcript) => transcript,
            Err(_) => {
                tracing::debug!("voice listen window timed out");
                None
            }
        }
    }

    async fn respond(&self, category: &str, success: bool, message: &str) {
        self.bus
            .send(
                MessageType::StatusUpdate,
                serde_json::json!({
                    "category": category,
                    "success": success,
                    "message": message,
                }),
                SendOptions::default(),
            )
            .await;
    }

    // ── Context sync ────────────────────────────────────────────────

    /// Publish the engine state snapshot. Sent non-persistent: sync
    /// traffic stays off durable transports.
    pub async fn sync_context(&self) {
        let state = self.engine.read().await.context_state();
        self.bus
            .send(
                MessageType::ContextSync,
                serde_json::to_value(&state).unwrap_or_default(),
                SendOptions { persistent: false },
            )
            .await;
    }

    fn spawn_context_sync(self: &Arc<Self>) {
        let coordinator = Arc::clone(self);
        let period = self.config.context_sync_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick fires immediately; skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                coordinator.sync_context().await;
            }
        });
    }
}

struct InboundHandler {
    coordinator: Arc<IntegrationCoordinator>,
}

#[async_trait]
impl MessageHandler for InboundHandler {
    async fn handle(&self, envelope: MessageEnvelope) -> Result<(), Error> {
        let c = &self.coordinator;
        match envelope.kind {
            MessageType::NavigationRequest => {
                let action = envelope.data.get("action").and_then(|v| v.as_str());
                let step = envelope
                    .data
                    .get("step")
                    .and_then(|v| v.as_u64())
                    .map(|n| n as u32);
                match (action, step) {
                    (Some("next"), _) => c.handle_navigation(NavAction::Next).await,
                    (Some("previous"), _) => c.handle_navigation(NavAction::Previous).await,
                    (Some("goto"), Some(n)) => c.handle_navigation(NavAction::Goto(n)).await,
                    _ => {
                        c.respond("navigation", false, "I didn't understand that request.")
                            .await;
                    }
                }
            }
            MessageType::HelpRequest => {
                let topic = envelope.data.get("topic").and_then(|v| v.as_str());
                c.handle_help(topic).await;
            }
            MessageType::ExplanationRequest => {
                let concept = envelope
                    .data
                    .get("concept")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                c.handle_explanation(concept).await;
            }
            MessageType::VoiceInput => {
                let transcript = envelope
                    .data
                    .get("transcript")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                c.handle_voice(transcript).await;
            }
            MessageType::SuggestionSelected => {
                let suggestion = envelope
                    .data
                    .get("suggestion")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                c.handle_suggestion(suggestion).await;
            }
            other => {
                tracing::debug!(kind = %other, "inbound handler got an unexpected type");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::avatar::AvatarMood;
    use crate::bus::{PageChannel, SamePageTransport, Transport};
    use crate::catalog::{
        Framework, FrameworkCatalog, Question, QuestionKind, StepDefinition, WizardSettings,
    };
    use crate::store::MemoryStore;

    fn tiny_framework() -> Framework {
        Framework {
            id: "gdpr".into(),
            name: "GDPR Compliance".into(),
            short_name: "GDPR".into(),
            description: String::new(),
            settings: WizardSettings {
                allow_step_skipping: true,
                auto_save: true,
            },
            steps: (1..=4u32)
                .map(|number| StepDefinition {
                    number,
                    title: format!("Step {number}"),
                    description: String::new(),
                    questions: vec![Question {
                        id: format!("s{number}q0"),
                        text: "?".into(),
                        kind: QuestionKind::Text,
                        required: false,
                        options: vec![],
                    }],
                })
                .collect(),
        }
    }

    async fn coordinator() -> Arc<IntegrationCoordinator> {
        let engine = Arc::new(RwLock::new(WizardEngine::new(
            FrameworkCatalog::new(vec![tiny_framework()]),
            Arc::new(MemoryStore::new()),
            WizardConfig::default(),
        )));
        let page = PageChannel::new();
        let bus = Arc::new(MessageBus::new(
            "wizard",
            vec![Arc::new(SamePageTransport::new(&page)) as Arc<dyn Transport>],
        ));
        bus.start();
        let avatar = Arc::new(Avatar::new(Duration::from_millis(30)));
        let c = Arc::new(IntegrationCoordinator::new(
            engine,
            bus,
            avatar,
            WizardConfig::default(),
        ));
        c.start().await;
        c
    }

    #[tokio::test]
    async fn navigation_next_advances_the_engine() {
        let c = coordinator().await;
        c.engine().write().await.select_framework("gdpr").unwrap();

        c.handle_navigation(NavAction::Next).await;
        assert_eq!(
            c.engine().read().await.session().unwrap().current_step,
            2
        );
    }

    #[tokio::test]
    async fn previous_at_first_step_reports_failure() {
        let c = coordinator().await;
        c.engine().write().await.select_framework("gdpr").unwrap();

        let (success, message) = c.apply_navigation(NavAction::Previous).await;
        assert!(!success);
        assert_eq!(message, "Already at the first step.");
    }

    #[tokio::test]
    async fn goto_out_of_range_reports_failure() {
        let c = coordinator().await;
        c.engine().write().await.select_framework("gdpr").unwrap();

        let (success, message) = c.apply_navigation(NavAction::Goto(99)).await;
        assert!(!success);
        assert!(message.contains("99"));
        assert_eq!(
            c.engine().read().await.session().unwrap().current_step,
            1
        );
    }

    #[tokio::test]
    async fn listen_times_out_without_a_transcript() {
        let engine = Arc::new(RwLock::new(WizardEngine::new(
            FrameworkCatalog::new(vec![tiny_framework()]),
            Arc::new(MemoryStore::new()),
            WizardConfig::default(),
        )));
        let page = PageChannel::new();
        let bus = Arc::new(MessageBus::new(
            "wizard",
            vec![Arc::new(SamePageTransport::new(&page)) as Arc<dyn Transport>],
        ));
        bus.start();
        let avatar = Arc::new(Avatar::new(Duration::from_millis(30)));
        let config = WizardConfig {
            voice_listen_timeout: Duration::from_millis(40),
            ..WizardConfig::default()
        };
        let c = Arc::new(IntegrationCoordinator::new(engine, bus, avatar, config));
        c.start().await;

        let (_tx, mut rx) = mpsc::channel::<String>(1);
        assert!(c.listen(&mut rx).await.is_none());
        assert_eq!(c.avatar().mood().await, AvatarMood::Idle);
    }
}
