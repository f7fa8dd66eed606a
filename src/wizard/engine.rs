//! `WizardEngine` — owns the active assessment session.
//!
//! All mutation is synchronous and atomic from the caller's point of view;
//! asynchrony exists only at the persistence edge. Persistence failures
//! during autosave and step advancement are background failures: logged,
//! never surfaced to the caller. Explicit save/load calls return their
//! errors.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::catalog::{FrameworkCatalog, StepDefinition, StepInfo, WizardSettings};
use crate::config::WizardConfig;
use crate::error::{ConfigError, Error, NavigationError, PersistenceError};
use crate::store::{SessionStore, keys};

use super::events::{AssessmentResults, WizardEvent};
use super::session::{AnswerValue, AssessmentSession, SessionStatus};
use super::validate::{ValidationIssue, validate_step};

/// Progress is capped below 100 while in progress; 100 is reserved for
/// completed assessments.
const IN_PROGRESS_CAP: f64 = 95.0;

const EVENT_CAPACITY: usize = 64;

/// Outcome of a forward step.
#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// Advanced to `step`; non-blocking validation findings ride along.
    Advanced {
        step: u32,
        warnings: Vec<ValidationIssue>,
    },
    /// Refused by a blocking validation rule; state unchanged.
    Blocked { issues: Vec<ValidationIssue> },
    /// The session was on its last step and is now completed.
    Completed(AssessmentResults),
}

/// Serializable snapshot of the engine state, used for context sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardContext {
    pub framework_id: Option<String>,
    pub framework_name: Option<String>,
    pub status: SessionStatus,
    pub current_step: u32,
    pub total_steps: u32,
    pub progress: f64,
    pub answered_questions: usize,
    pub total_questions: usize,
    pub session_id: Option<Uuid>,
}

/// The wizard session state machine.
pub struct WizardEngine {
    catalog: FrameworkCatalog,
    store: Arc<dyn SessionStore>,
    config: WizardConfig,
    session: Option<AssessmentSession>,
    events: broadcast::Sender<WizardEvent>,
}

impl WizardEngine {
    pub fn new(
        catalog: FrameworkCatalog,
        store: Arc<dyn SessionStore>,
        config: WizardConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            catalog,
            store,
            config,
            session: None,
            events,
        }
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<WizardEvent> {
        self.events.subscribe()
    }

    pub fn catalog(&self) -> &FrameworkCatalog {
        &self.catalog
    }

    pub fn session(&self) -> Option<&AssessmentSession> {
        self.session.as_ref()
    }

    pub fn status(&self) -> SessionStatus {
        self.session
            .as_ref()
            .map(|s| s.status)
            .unwrap_or(SessionStatus::Unselected)
    }

    // ── Framework selection ─────────────────────────────────────────

    /// Start a fresh session for `framework_id`, superseding any active one.
    pub fn select_framework(&mut self, framework_id: &str) -> Result<(), Error> {
        let framework = self
            .catalog
            .get(framework_id)
            .ok_or_else(|| ConfigError::UnknownFramework(framework_id.to_string()))?;
        let session = AssessmentSession::new(framework_id, framework.total_steps());
        let name = framework.name.clone();
        let total_steps = framework.total_steps();
        self.session = Some(session);
        tracing::info!(framework = framework_id, total_steps, "framework selected");
        self.emit(WizardEvent::FrameworkSelected {
            framework_id: framework_id.to_string(),
            name,
            total_steps,
        });
        Ok(())
    }

    /// Drop the active session and return to the unselected state.
    pub fn reset(&mut self) {
        self.session = None;
        tracing::debug!("wizard reset to initial state");
    }

    // ── Answers ─────────────────────────────────────────────────────

    /// Idempotent upsert of an answer. Persists immediately when the
    /// framework has autosave enabled. Returns the new progress percentage.
    pub async fn save_answer(
        &mut self,
        question_id: &str,
        value: impl Into<AnswerValue>,
    ) -> Result<f64, Error> {
        if self.session.is_none() {
            return Err(NavigationError::NoActiveSession.into());
        }
        let previous = self.progress_percent();
        let autosave = self.settings().auto_save;
        if let Some(session) = self.session.as_mut() {
            session.answers.insert(question_id.to_string(), value.into());
            session.last_saved = Utc::now();
        }
        if autosave {
            if let Err(e) = self.persist().await {
                tracing::warn!(error = %e, "autosave after answer failed");
            }
        }
        let percent = self.progress_percent();
        self.emit(WizardEvent::ProgressUpdated { previous, percent });
        Ok(percent)
    }

    pub fn answer(&self, question_id: &str) -> Option<&AnswerValue> {
        self.session.as_ref()?.answers.get(question_id)
    }

    // ── Navigation ──────────────────────────────────────────────────

    /// Advance one step, or complete the assessment from the last step.
    pub async fn next_step(&mut self, skip_validation: bool) -> Result<StepOutcome, Error> {
        let (current, total, status) = {
            let s = self
                .session
                .as_ref()
                .ok_or(NavigationError::NoActiveSession)?;
            (s.current_step, s.total_steps, s.status)
        };
        if status == SessionStatus::Completed {
            return Err(NavigationError::AssessmentCompleted.into());
        }

        let issues = if skip_validation {
            Vec::new()
        } else {
            self.validate_current_step()
        };
        if issues.iter().any(|i| i.blocking) {
            self.emit(WizardEvent::ValidationFailed {
                step: current,
                issues: issues.clone(),
            });
            return Ok(StepOutcome::Blocked { issues });
        }

        if current >= total {
            return self.complete_assessment().await.map(StepOutcome::Completed);
        }

        let previous = self.progress_percent();
        if let Some(session) = self.session.as_mut() {
            session.current_step += 1;
            session.last_saved = Utc::now();
        }
        if let Err(e) = self.persist().await {
            tracing::warn!(error = %e, "autosave after step advance failed");
        }
        let step = current + 1;
        tracing::debug!(step, total, "advanced to next step");
        self.emit(WizardEvent::StepChanged {
            step,
            total_steps: total,
            info: self.current_step_info(),
        });
        self.emit(WizardEvent::ProgressUpdated {
            previous,
            percent: self.progress_percent(),
        });
        Ok(StepOutcome::Advanced {
            step,
            warnings: issues,
        })
    }

    /// Go back one step. No validation is required to move backward.
    /// Returns false without mutation when already on the first step.
    pub fn previous_step(&mut self) -> bool {
        match self.session.as_ref() {
            Some(s) if s.status != SessionStatus::Completed && s.current_step > 1 => {}
            _ => return false,
        }
        let previous = self.progress_percent();
        let (step, total) = match self.session.as_mut() {
            Some(session) => {
                session.current_step -= 1;
                (session.current_step, session.total_steps)
            }
            None => return false,
        };
        tracing::debug!(step, total, "moved back one step");
        self.emit(WizardEvent::StepChanged {
            step,
            total_steps: total,
            info: self.current_step_info(),
        });
        self.emit(WizardEvent::ProgressUpdated {
            previous,
            percent: self.progress_percent(),
        });
        true
    }

    /// Jump to a specific step. Refused (not clamped) when out of range or
    /// when the framework disallows skipping ahead.
    pub fn go_to_step(&mut self, step: u32, skip_validation: bool) -> Result<(), Error> {
        let (current, total) = {
            let s = self
                .session
                .as_ref()
                .ok_or(NavigationError::NoActiveSession)?;
            (s.current_step, s.total_steps)
        };
        if step < 1 || step > total {
            return Err(NavigationError::StepOutOfRange {
                requested: step,
                total,
            }
            .into());
        }
        if !skip_validation && !self.settings().allow_step_skipping && step > current + 1 {
            return Err(NavigationError::SkipNotAllowed {
                requested: step,
                current,
            }
            .into());
        }
        let previous = self.progress_percent();
        if let Some(session) = self.session.as_mut() {
            session.current_step = step;
        }
        tracing::debug!(step, total, "jumped to step");
        self.emit(WizardEvent::StepChanged {
            step,
            total_steps: total,
            info: self.current_step_info(),
        });
        self.emit(WizardEvent::ProgressUpdated {
            previous,
            percent: self.progress_percent(),
        });
        Ok(())
    }

    // ── Progress and validation ─────────────────────────────────────

    /// Progress percentage. Capped at 95 while in progress; exactly 100
    /// only once the assessment is completed.
    pub fn progress_percent(&self) -> f64 {
        let Some(session) = self.session.as_ref() else {
            return 0.0;
        };
        match session.status {
            SessionStatus::Completed => 100.0,
            _ => {
                if session.total_steps == 0 {
                    return 0.0;
                }
                let steps_done = (session.current_step - 1) as f64;
                let fraction = self.current_step_completion();
                let percent =
                    (steps_done + fraction) / session.total_steps as f64 * 100.0;
                percent.clamp(0.0, IN_PROGRESS_CAP)
            }
        }
    }

    /// Fraction of the current step's questions answered (1.0 for a step
    /// with no questions).
    fn current_step_completion(&self) -> f64 {
        let Some(session) = self.session.as_ref() else {
            return 0.0;
        };
        let Some(step) = self.step_definition(session.current_step) else {
            return 1.0;
        };
        if step.questions.is_empty() {
            return 1.0;
        }
        let answered = step
            .questions
            .iter()
            .filter(|q| {
                session
                    .answers
                    .get(&q.id)
                    .is_some_and(|a| !a.is_empty())
            })
            .count();
        answered as f64 / step.questions.len() as f64
    }

    /// Run the wired-up validation rules against the current step.
    pub fn validate_current_step(&self) -> Vec<ValidationIssue> {
        let Some(session) = self.session.as_ref() else {
            return Vec::new();
        };
        match self.step_definition(session.current_step) {
            Some(step) => validate_step(step, &session.answers, self.config.max_answer_len),
            None => Vec::new(),
        }
    }

    /// Compute final statistics and transition to `Completed`. Answers are
    /// left untouched.
    pub async fn complete_assessment(&mut self) -> Result<AssessmentResults, Error> {
        let session = self
            .session
            .as_ref()
            .ok_or(NavigationError::NoActiveSession)?;
        let framework = self
            .catalog
            .get(&session.framework_id)
            .ok_or_else(|| ConfigError::UnknownFramework(session.framework_id.clone()))?;

        let finished_at = Utc::now();
        let total_questions = framework.total_questions();
        let answered_questions = session.answered_count();
        let completion_percentage = if total_questions == 0 {
            0
        } else {
            (answered_questions as f64 / total_questions as f64 * 100.0).round() as u32
        };
        let results = AssessmentResults {
            framework_id: session.framework_id.clone(),
            framework_name: framework.name.clone(),
            session_id: session.session_id,
            started_at: session.start_time,
            finished_at,
            elapsed_seconds: (finished_at - session.start_time).num_seconds(),
            total_steps: session.total_steps,
            total_questions,
            answered_questions,
            completion_percentage,
        };

        if let Some(session) = self.session.as_mut() {
            session.status = SessionStatus::Completed;
            session.last_saved = finished_at;
        }
        if let Err(e) = self.persist().await {
            tracing::warn!(error = %e, "failed to persist completed session");
        }
        tracing::info!(
            framework = %results.framework_id,
            answered = answered_questions,
            total = total_questions,
            "assessment completed"
        );
        self.emit(WizardEvent::AssessmentComplete(results.clone()));
        Ok(results)
    }

    // ── Persistence ─────────────────────────────────────────────────

    /// Write the active session to both the current slot and its
    /// per-framework slot.
    pub async fn save_progress(&mut self) -> Result<(), Error> {
        if self.session.is_none() {
            return Err(NavigationError::NoActiveSession.into());
        }
        if let Some(session) = self.session.as_mut() {
            session.last_saved = Utc::now();
        }
        self.persist().await.map_err(Error::from)
    }

    async fn persist(&self) -> Result<(), PersistenceError> {
        let Some(session) = self.session.as_ref() else {
            return Ok(());
        };
        let snapshot = serde_json::to_value(session)?;
        self.store
            .put(keys::CURRENT_SESSION, snapshot.clone())
            .await?;
        self.store
            .put(&keys::framework_session(&session.framework_id), snapshot)
            .await?;
        Ok(())
    }

    /// Restore a persisted session. Returns false when no usable snapshot
    /// exists (absent or corrupt). Fails without touching state when the
    /// snapshot references a framework no longer in the catalog.
    pub async fn load_progress(&mut self, framework_id: Option<&str>) -> Result<bool, Error> {
        let key = match framework_id {
            Some(id) => keys::framework_session(id),
            None => keys::CURRENT_SESSION.to_string(),
        };
        let value = match self.store.get(&key).await {
            Ok(Some(v)) => v,
            Ok(None) => {
                tracing::debug!(key, "no saved progress found");
                return Ok(false);
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "saved progress is unreadable");
                return Ok(false);
            }
        };
        let snapshot: AssessmentSession = match serde_json::from_value(value) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(key, error = %e, "saved progress is corrupt, ignoring");
                return Ok(false);
            }
        };
        if !self.catalog.contains(&snapshot.framework_id) {
            return Err(ConfigError::UnknownFramework(snapshot.framework_id).into());
        }
        if snapshot.total_steps > 0
            && (snapshot.current_step < 1 || snapshot.current_step > snapshot.total_steps)
        {
            tracing::warn!(
                key,
                step = snapshot.current_step,
                total = snapshot.total_steps,
                "saved progress has an out-of-range step, ignoring"
            );
            return Ok(false);
        }
        tracing::info!(framework = %snapshot.framework_id, step = snapshot.current_step,
            "progress restored");
        self.session = Some(snapshot);
        Ok(true)
    }

    /// Remove persisted snapshots. With a framework id, clears that slot
    /// only; otherwise clears the current slot and every per-framework
    /// slot. The in-memory session is dropped when it is covered by the
    /// clear.
    pub async fn clear_progress(
        &mut self,
        framework_id: Option<&str>,
    ) -> Result<(), PersistenceError> {
        match framework_id {
            Some(id) => {
                self.store.remove(&keys::framework_session(id)).await?;
                if self
                    .session
                    .as_ref()
                    .is_some_and(|s| s.framework_id == id)
                {
                    self.session = None;
                }
            }
            None => {
                self.store.remove(keys::CURRENT_SESSION).await?;
                let ids: Vec<String> = self.catalog.ids().map(String::from).collect();
                for id in ids {
                    self.store.remove(&keys::framework_session(&id)).await?;
                }
                self.session = None;
            }
        }
        tracing::debug!("saved progress cleared");
        Ok(())
    }

    // ── Milestones ──────────────────────────────────────────────────

    /// Mark a progress milestone as announced. True the first time only;
    /// the marker persists with the session.
    pub async fn mark_milestone(&mut self, percent: u8) -> bool {
        let newly = match self.session.as_mut() {
            Some(session) => session.mark_milestone(percent),
            None => false,
        };
        if newly {
            if let Err(e) = self.persist().await {
                tracing::warn!(error = %e, "failed to persist milestone marker");
            }
        }
        newly
    }

    // ── Introspection ───────────────────────────────────────────────

    pub fn current_step_info(&self) -> Option<StepInfo> {
        let session = self.session.as_ref()?;
        self.step_definition(session.current_step).map(|s| s.info())
    }

    pub fn step_definition(&self, step: u32) -> Option<&StepDefinition> {
        let session = self.session.as_ref()?;
        self.catalog.get(&session.framework_id)?.step(step)
    }

    /// Snapshot of the engine state for context synchronization.
    pub fn context_state(&self) -> WizardContext {
        let framework = self
            .session
            .as_ref()
            .and_then(|s| self.catalog.get(&s.framework_id));
        WizardContext {
            framework_id: self.session.as_ref().map(|s| s.framework_id.clone()),
            framework_name: framework.map(|f| f.name.clone()),
            status: self.status(),
            current_step: self.session.as_ref().map(|s| s.current_step).unwrap_or(0),
            total_steps: self.session.as_ref().map(|s| s.total_steps).unwrap_or(0),
            progress: self.progress_percent(),
            answered_questions: self
                .session
                .as_ref()
                .map(|s| s.answered_count())
                .unwrap_or(0),
            total_questions: framework.map(|f| f.total_questions()).unwrap_or(0),
            session_id: self.session.as_ref().map(|s| s.session_id),
        }
    }

    fn settings(&self) -> WizardSettings {
        self.session
            .as_ref()
            .and_then(|s| self.catalog.get(&s.framework_id))
            .map(|f| f.settings)
            .unwrap_or_default()
    }

    fn emit(&self, event: WizardEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
