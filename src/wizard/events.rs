//! Lifecycle events emitted by the wizard engine.
//!
//! Events go out on a broadcast channel, so any number of subscribers
//! (integration coordinator, UI, tests) can observe transitions without
//! displacing each other.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::StepInfo;

use super::validate::ValidationIssue;

/// Final statistics computed when an assessment completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResults {
    pub framework_id: String,
    pub framework_name: String,
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_seconds: i64,
    pub total_steps: u32,
    pub total_questions: usize,
    pub answered_questions: usize,
    /// Share of questions answered, rounded to whole percent.
    pub completion_percentage: u32,
}

/// A state transition in the wizard engine.
#[derive(Debug, Clone)]
pub enum WizardEvent {
    FrameworkSelected {
        framework_id: String,
        name: String,
        total_steps: u32,
    },
    StepChanged {
        step: u32,
        total_steps: u32,
        info: Option<StepInfo>,
    },
    ProgressUpdated {
        /// Progress before the mutation that triggered this event.
        previous: f64,
        percent: f64,
    },
    ValidationFailed {
        step: u32,
        issues: Vec<ValidationIssue>,
    },
    AssessmentComplete(AssessmentResults),
}
