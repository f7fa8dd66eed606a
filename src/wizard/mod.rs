//! Wizard state machine — session record, step navigation, progress, and
//! persistence round trips.

pub mod engine;
pub mod events;
pub mod session;
pub mod validate;

pub use engine::{StepOutcome, WizardContext, WizardEngine};
pub use events::{AssessmentResults, WizardEvent};
pub use session::{AnswerValue, AssessmentSession, SessionStatus};
pub use validate::{ValidationIssue, ValidationRule};
