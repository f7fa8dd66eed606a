//! Assessment session record — one user's run through a selected framework.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Unselected,
    InProgress,
    Completed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unselected => "unselected",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// A recorded answer: free text, or a list for multi-select questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    Multi(Vec<String>),
}

impl AnswerValue {
    /// Whether the answer counts as "given" for progress purposes.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(t) => t.trim().is_empty(),
            Self::Multi(v) => v.is_empty(),
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for AnswerValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<String>> for AnswerValue {
    fn from(v: Vec<String>) -> Self {
        Self::Multi(v)
    }
}

/// The mutable session record, persisted as a snapshot per framework.
///
/// Invariant: `1 <= current_step <= total_steps` whenever `total_steps > 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentSession {
    pub session_id: Uuid,
    pub framework_id: String,
    pub current_step: u32,
    pub total_steps: u32,
    pub answers: HashMap<String, AnswerValue>,
    pub status: SessionStatus,
    pub start_time: DateTime<Utc>,
    pub last_saved: DateTime<Utc>,
    /// Progress milestones already announced for this session. Kept on the
    /// session record so announcements do not repeat after a reload.
    #[serde(default)]
    pub milestones_notified: BTreeSet<u8>,
}

impl AssessmentSession {
    pub fn new(framework_id: &str, total_steps: u32) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4(),
            framework_id: framework_id.to_string(),
            current_step: 1,
            total_steps,
            answers: HashMap::new(),
            status: SessionStatus::InProgress,
            start_time: now,
            last_saved: now,
            milestones_notified: BTreeSet::new(),
        }
    }

    /// Number of non-empty answers.
    pub fn answered_count(&self) -> usize {
        self.answers.values().filter(|a| !a.is_empty()).count()
    }

    /// Record a milestone as announced. Returns true the first time only.
    pub fn mark_milestone(&mut self, percent: u8) -> bool {
        self.milestones_notified.insert(percent)
    }
}
