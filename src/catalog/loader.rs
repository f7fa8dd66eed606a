//! Builds a [`FrameworkCatalog`] from questionnaire JSON.
//!
//! The questionnaire document maps a per-framework key to an array of
//! question records, each carrying a `"step"` label of the form
//! `"Step N: Title"`. Steps are derived by grouping questions under their
//! parsed step number.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use super::model::{
    Framework, FrameworkCatalog, FrameworkSpec, Question, QuestionKind, StepDefinition,
    WizardSettings,
};

/// One record in the questionnaire JSON.
#[derive(Debug, Deserialize)]
struct QuestionRecord {
    step: Option<String>,
    question: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    required: Option<bool>,
    #[serde(default)]
    options: Vec<String>,
}

fn step_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^Step\s+(\d+):\s*(.+)$").expect("static step label pattern"))
}

/// The built-in framework definitions.
pub fn builtin_frameworks() -> Vec<FrameworkSpec> {
    vec![
        FrameworkSpec {
            id: "eu_ai_act",
            name: "EU AI Act Compliance",
            short_name: "EU AI Act",
            description: "AI system risk assessment and classification under the EU AI Act",
            json_key: "EU AI ACT Onboarding Questionaire",
            settings: WizardSettings {
                allow_step_skipping: false,
                auto_save: true,
            },
        },
        FrameworkSpec {
            id: "iso_27001",
            name: "ISO 27001 Information Security",
            short_name: "ISO 27001",
            description: "Information Security Management System per ISO/IEC 27001:2022",
            json_key: "ISO 27001 Questionaire",
            settings: WizardSettings {
                allow_step_skipping: true,
                auto_save: true,
            },
        },
        FrameworkSpec {
            id: "iso_42001",
            name: "ISO 42001 AI Management",
            short_name: "ISO 42001",
            description: "Artificial Intelligence Management System per ISO/IEC 42001:2023",
            json_key: "ISO 42001 2023 AI Management Onboarding Questionaire",
            settings: WizardSettings {
                allow_step_skipping: false,
                auto_save: true,
            },
        },
        FrameworkSpec {
            id: "gdpr",
            name: "GDPR & Privacy Compliance",
            short_name: "GDPR",
            description: "General Data Protection Regulation compliance review",
            json_key: "GDPR and MSFT DPR Onboarding Questionaire",
            settings: WizardSettings {
                allow_step_skipping: true,
                auto_save: true,
            },
        },
        FrameworkSpec {
            id: "iso_27701",
            name: "ISO 27701 Privacy Management",
            short_name: "ISO 27701",
            description: "Privacy Information Management System per ISO/IEC 27701:2019",
            json_key: "ISO 27701 Onboarding Questionaire",
            settings: WizardSettings {
                allow_step_skipping: true,
                auto_save: true,
            },
        },
        FrameworkSpec {
            id: "cloud_security",
            name: "Cloud Security (ISO 27017/27018)",
            short_name: "Cloud Security",
            description: "Cloud security and privacy per ISO/IEC 27017 and 27018",
            json_key: "ISO 27017 and 27018 Cloud Security and Privacy Questionaire",
            settings: WizardSettings {
                allow_step_skipping: true,
                auto_save: true,
            },
        },
    ]
}

impl FrameworkCatalog {
    /// Resolve framework specs against a questionnaire document.
    ///
    /// A framework whose entry is missing or malformed keeps an empty step
    /// list; the problem is logged and the remaining frameworks are
    /// unaffected.
    pub fn from_question_data(specs: &[FrameworkSpec], data: &serde_json::Value) -> Self {
        let mut frameworks = Vec::with_capacity(specs.len());
        for spec in specs {
            let steps = match data.get(spec.json_key) {
                Some(serde_json::Value::Array(records)) => extract_steps(records),
                Some(_) => {
                    tracing::warn!(
                        framework = spec.id,
                        "questionnaire entry is not an array, leaving steps empty"
                    );
                    Vec::new()
                }
                None => {
                    tracing::warn!(
                        framework = spec.id,
                        key = spec.json_key,
                        "no questionnaire entry found, leaving steps empty"
                    );
                    Vec::new()
                }
            };
            if !steps.is_empty() {
                tracing::debug!(
                    framework = spec.id,
                    steps = steps.len(),
                    questions = steps.iter().map(|s| s.questions.len()).sum::<usize>(),
                    "framework resolved"
                );
            }
            frameworks.push(Framework {
                id: spec.id.to_string(),
                name: spec.name.to_string(),
                short_name: spec.short_name.to_string(),
                description: spec.description.to_string(),
                settings: spec.settings,
                steps,
            });
        }
        Self::new(frameworks)
    }
}

/// Group question records by their `"Step N: Title"` label.
fn extract_steps(records: &[serde_json::Value]) -> Vec<StepDefinition> {
    let re = step_label_re();
    let mut by_number: BTreeMap<u32, StepDefinition> = BTreeMap::new();

    for value in records {
        let record: QuestionRecord = match serde_json::from_value(value.clone()) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable question record");
                continue;
            }
        };
        let Some(label) = record.step.as_deref() else {
            continue;
        };
        let Some(caps) = re.captures(label) else {
            tracing::warn!(label, "question step label does not match \"Step N: Title\"");
            continue;
        };
        let number: u32 = match caps[1].parse() {
            Ok(n) => n,
            Err(_) => continue,
        };
        let title = caps[2].trim().to_string();

        let step = by_number.entry(number).or_insert_with(|| StepDefinition {
            number,
            title: title.clone(),
            description: step_description(&title),
            questions: Vec::new(),
        });
        let index = step.questions.len();
        step.questions.push(Question {
            id: format!("s{number}q{index}"),
            text: record.question.unwrap_or_default(),
            kind: parse_kind(record.kind.as_deref()),
            required: record.required.unwrap_or(true),
            options: record.options,
        });
    }

    by_number.into_values().collect()
}

fn parse_kind(raw: Option<&str>) -> QuestionKind {
    match raw {
        Some("radio") | Some("select") | Some("single_choice") => QuestionKind::SingleChoice,
        Some("checkbox") | Some("multiselect") | Some("multi_choice") => QuestionKind::MultiChoice,
        _ => QuestionKind::Text,
    }
}

fn step_description(title: &str) -> String {
    format!("Assessment of {}", title.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_data() -> serde_json::Value {
        json!({
            "EU AI ACT Onboarding Questionaire": [
                { "step": "Step 1: Company Profile", "question": "Organization name?", "type": "text" },
                { "step": "Step 1: Company Profile", "question": "Sector?", "type": "select",
                  "options": ["Finance", "Health"] },
                { "step": "Step 2: Risk Analysis", "question": "Known risks?", "type": "checkbox",
                  "options": ["Bias", "Safety"], "required": false },
            ],
            "ISO 27001 Questionaire": "not an array",
        })
    }

    #[test]
    fn resolves_steps_and_question_ids() {
        let catalog =
            FrameworkCatalog::from_question_data(&builtin_frameworks(), &sample_data());
        let fw = catalog.get("eu_ai_act").unwrap();
        assert_eq!(fw.total_steps(), 2);
        assert_eq!(fw.total_questions(), 3);

        let step1 = fw.step(1).unwrap();
        assert_eq!(step1.title, "Company Profile");
        assert_eq!(step1.questions[0].id, "s1q0");
        assert_eq!(step1.questions[1].id, "s1q1");
        assert_eq!(step1.questions[1].kind, QuestionKind::SingleChoice);

        let step2 = fw.step(2).unwrap();
        assert_eq!(step2.questions[0].id, "s2q0");
        assert_eq!(step2.questions[0].kind, QuestionKind::MultiChoice);
        assert!(!step2.questions[0].required);
    }

    #[test]
    fn malformed_entry_does_not_break_others() {
        let catalog =
            FrameworkCatalog::from_question_data(&builtin_frameworks(), &sample_data());
        // iso_27001 entry was not an array: present but empty.
        let bad = catalog.get("iso_27001").unwrap();
        assert_eq!(bad.total_steps(), 0);
        // eu_ai_act is unaffected.
        assert_eq!(catalog.get("eu_ai_act").unwrap().total_steps(), 2);
        // All six built-ins are listed.
        assert_eq!(catalog.len(), 6);
    }

    #[test]
    fn unlabelled_records_are_skipped() {
        let data = json!({
            "EU AI ACT Onboarding Questionaire": [
                { "question": "No step label" },
                { "step": "Phase 1: wrong format", "question": "Bad label" },
                { "step": "Step 3: Governance", "question": "Who owns AI risk?" },
            ]
        });
        let catalog = FrameworkCatalog::from_question_data(&builtin_frameworks(), &data);
        let fw = catalog.get("eu_ai_act").unwrap();
        assert_eq!(fw.total_steps(), 1);
        assert_eq!(fw.step(3).unwrap().questions[0].id, "s3q0");
    }

    #[test]
    fn step_info_exposes_question_ids() {
        let catalog =
            FrameworkCatalog::from_question_data(&builtin_frameworks(), &sample_data());
        let info = catalog.get("eu_ai_act").unwrap().step(1).unwrap().info();
        assert_eq!(info.question_ids, vec!["s1q0", "s1q1"]);
        assert!(info.description.contains("company profile"));
    }
}
