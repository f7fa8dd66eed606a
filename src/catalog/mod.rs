//! Framework catalog — read-only definitions of assessment frameworks,
//! their steps, and their questions.

pub mod loader;
pub mod model;

pub use loader::builtin_frameworks;
pub use model::{
    Framework, FrameworkCatalog, FrameworkSpec, Question, QuestionKind, StepDefinition, StepInfo,
    WizardSettings,
};
