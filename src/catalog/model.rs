//! Catalog data model.

use serde::{Deserialize, Serialize};

/// Wizard behavior settings declared per framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardSettings {
    /// Whether the user may jump more than one step ahead.
    pub allow_step_skipping: bool,
    /// Whether answers and step changes persist immediately.
    pub auto_save: bool,
}

impl Default for WizardSettings {
    fn default() -> Self {
        Self {
            allow_step_skipping: false,
            auto_save: true,
        }
    }
}

/// Static framework metadata, before question data is attached.
#[derive(Debug, Clone)]
pub struct FrameworkSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub short_name: &'static str,
    pub description: &'static str,
    /// Key into the questionnaire JSON document.
    pub json_key: &'static str,
    pub settings: WizardSettings,
}

/// The kind of answer widget a question expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Text,
    SingleChoice,
    MultiChoice,
}

/// A single assessment question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Stable identifier of the form `s{step}q{index}`.
    pub id: String,
    pub text: String,
    pub kind: QuestionKind,
    pub required: bool,
    #[serde(default)]
    pub options: Vec<String>,
}

/// An ordered group of questions within a framework.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDefinition {
    pub number: u32,
    pub title: String,
    pub description: String,
    pub questions: Vec<Question>,
}

impl StepDefinition {
    /// Read-only summary of this step.
    pub fn info(&self) -> StepInfo {
        StepInfo {
            number: self.number,
            title: self.title.clone(),
            description: self.description.clone(),
            question_ids: self.questions.iter().map(|q| q.id.clone()).collect(),
        }
    }
}

/// Read-only step summary, derived from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    pub number: u32,
    pub title: String,
    pub description: String,
    pub question_ids: Vec<String>,
}

/// A fully resolved framework: metadata plus its ordered steps.
#[derive(Debug, Clone)]
pub struct Framework {
    pub id: String,
    pub name: String,
    pub short_name: String,
    pub description: String,
    pub settings: WizardSettings,
    pub steps: Vec<StepDefinition>,
}

impl Framework {
    pub fn total_steps(&self) -> u32 {
        self.steps.len() as u32
    }

    pub fn total_questions(&self) -> usize {
        self.steps.iter().map(|s| s.questions.len()).sum()
    }

    /// Step by 1-based number.
    pub fn step(&self, number: u32) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.number == number)
    }
}

/// Ordered, read-only collection of frameworks.
#[derive(Debug, Clone, Default)]
pub struct FrameworkCatalog {
    frameworks: Vec<Framework>,
}

impl FrameworkCatalog {
    pub fn new(frameworks: Vec<Framework>) -> Self {
        Self { frameworks }
    }

    pub fn get(&self, id: &str) -> Option<&Framework> {
        self.frameworks.iter().find(|f| f.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.frameworks.iter().map(|f| f.id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Framework> {
        self.frameworks.iter()
    }

    pub fn len(&self) -> usize {
        self.frameworks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frameworks.is_empty()
    }
}
