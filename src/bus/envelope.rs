//! Wire format for bus messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The closed set of message types the bus carries. Unknown types fail
/// deserialization at the transport edge instead of reaching handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    StepChanged,
    ProgressUpdated,
    FrameworkSelected,
    AnswerSaved,
    ValidationError,
    AssessmentComplete,
    HelpRequest,
    NavigationRequest,
    ExplanationRequest,
    VoiceInput,
    SuggestionSelected,
    ContextSync,
    ErrorNotification,
    StatusUpdate,
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::StepChanged => "step_changed",
            Self::ProgressUpdated => "progress_updated",
            Self::FrameworkSelected => "framework_selected",
            Self::AnswerSaved => "answer_saved",
            Self::ValidationError => "validation_error",
            Self::AssessmentComplete => "assessment_complete",
            Self::HelpRequest => "help_request",
            Self::NavigationRequest => "navigation_request",
            Self::ExplanationRequest => "explanation_request",
            Self::VoiceInput => "voice_input",
            Self::SuggestionSelected => "suggestion_selected",
            Self::ContextSync => "context_sync",
            Self::ErrorNotification => "error_notification",
            Self::StatusUpdate => "status_update",
        };
        write!(f, "{s}")
    }
}

fn default_persistent() -> bool {
    true
}

/// One message on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    /// Source tag of the sending context, used for self-echo suppression.
    pub source: String,
    /// Non-persistent messages skip durable transports. High-frequency
    /// traffic like context sync stays off the shared store this way.
    #[serde(default = "default_persistent")]
    pub persistent: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_are_snake_case_on_the_wire() {
        let json = serde_json::to_value(MessageType::StepChanged).unwrap();
        assert_eq!(json, serde_json::json!("step_changed"));
        assert_eq!(MessageType::StepChanged.to_string(), "step_changed");
    }

    #[test]
    fn unknown_type_is_rejected() {
        let result: Result<MessageType, _> =
            serde_json::from_value(serde_json::json!("chat_response"));
        assert!(result.is_err());
    }

    #[test]
    fn persistent_defaults_to_true() {
        let envelope: MessageEnvelope = serde_json::from_value(serde_json::json!({
            "type": "status_update",
            "data": {"message": "hi"},
            "timestamp": Utc::now(),
            "source": "wizard",
        }))
        .unwrap();
        assert!(envelope.persistent);
    }
}
