//! Step validation rules.
//!
//! Validation is deliberately permissive: required-question metadata is
//! carried but does not block navigation. The only blocking rule currently
//! wired up is the text-answer length bound.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::catalog::StepDefinition;

use super::session::AnswerValue;

/// The rule a validation issue comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "rule")]
pub enum ValidationRule {
    AnswerTooLong { length: usize, max: usize },
    RequiredUnanswered,
}

/// One validation finding for a question on the current step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub question_id: String,
    #[serde(flatten)]
    pub rule: ValidationRule,
    /// Whether this issue refuses a forward step.
    pub blocking: bool,
    pub message: String,
}

/// Validate the answers recorded for one step.
pub fn validate_step(
    step: &StepDefinition,
    answers: &HashMap<String, AnswerValue>,
    max_answer_len: usize,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for question in &step.questions {
        match answers.get(&question.id) {
            Some(AnswerValue::Text(text)) => {
                let length = text.chars().count();
                if length > max_answer_len {
                    issues.push(ValidationIssue {
                        question_id: question.id.clone(),
                        rule: ValidationRule::AnswerTooLong {
                            length,
                            max: max_answer_len,
                        },
                        blocking: true,
                        message: format!(
                            "Answer is too long ({length} characters, limit {max_answer_len})"
                        ),
                    });
                }
            }
            Some(AnswerValue::Multi(_)) => {}
            None => {
                if question.required {
                    // Declared but unenforced: surfaced, never blocking.
                    issues.push(ValidationIssue {
                        question_id: question.id.clone(),
                        rule: ValidationRule::RequiredUnanswered,
                        blocking: false,
                        message: "This question has not been answered yet".to_string(),
                    });
                }
            }
        }
    }
    issues
}
