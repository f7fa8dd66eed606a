//! Canned guidance text for the collaborator.
//!
//! Framework-specific templates where we have them, generic fallbacks
//! everywhere else.

/// Greeting sent when a framework is selected.
pub fn welcome(framework_id: &str, framework_name: &str, total_steps: u32) -> String {
    match framework_id {
        "eu_ai_act" => format!(
            "Welcome to the EU AI Act assessment! Over the next {total_steps} steps we'll \
             look at how your AI systems line up with the Act's risk-based requirements. \
             Ask me anytime if a question is unclear."
        ),
        "iso_27001" => format!(
            "Welcome to the ISO 27001 assessment! We'll work through {total_steps} steps \
             covering your information security management system. I'm here if you need \
             context on any control."
        ),
        _ => format!(
            "Welcome to the {framework_name} assessment! There are {total_steps} steps \
             ahead. I'll guide you through each one, and you can ask for help at any point."
        ),
    }
}

/// Guidance sent when the wizard lands on a step.
pub fn step_guidance(framework_id: &str, step: u32, total_steps: u32, title: &str) -> String {
    let specific = match (framework_id, step) {
        ("eu_ai_act", 1) => Some(
            "Let's start with your company profile. This determines which of the Act's \
             obligations apply to you.",
        ),
        ("eu_ai_act", 2) => Some(
            "Now we classify your AI systems by risk. Be thorough here; the risk tier \
             drives everything that follows.",
        ),
        ("iso_27001", 1) => Some(
            "First, the scope of your information security management system. A precise \
             scope keeps the rest of the assessment focused.",
        ),
        _ => None,
    };
    match specific {
        Some(text) => format!("Step {step} of {total_steps}: {title}. {text}"),
        None => format!(
            "Step {step} of {total_steps}: {title}. Answer what you can; you can always \
             come back to a step later."
        ),
    }
}

/// Message sent when the assessment completes.
pub fn completion(framework_name: &str, answered: usize, total: usize) -> String {
    format!(
        "Congratulations, you've completed the {framework_name} assessment! You answered \
         {answered} of {total} questions. Your responses are saved and ready for review."
    )
}

/// Announcement for a progress milestone.
pub fn milestone_message(percent: u8) -> String {
    match percent {
        25 => "A quarter of the way there. Nice and steady!".to_string(),
        50 => "Halfway done! The picture of your compliance posture is taking shape.".to_string(),
        75 => "Three quarters complete. The finish line is in sight.".to_string(),
        90 => "Almost there! Just a few more questions to go.".to_string(),
        other => format!("You've reached {other}% of the assessment."),
    }
}

/// Help text by topic, or a generic pointer when the topic is unknown.
pub fn help_text(topic: Option<&str>) -> String {
    match topic.map(str::trim).map(str::to_lowercase).as_deref() {
        Some("navigation") => "You can move with \"next\", \"back\", or \"go to step N\". \
             Some frameworks let you jump ahead freely; others ask you to take steps in order."
            .to_string(),
        Some("progress") => "Progress counts completed steps plus your answers on the \
             current step. It reaches 100% only when you finish the assessment."
            .to_string(),
        Some("saving") => "Your answers are saved automatically as you go. You can close \
             this session and pick up where you left off."
            .to_string(),
        Some(framework) if framework_blurb(framework).is_some() => {
            // Checked just above.
            framework_blurb(framework).unwrap_or_default()
        }
        Some(other) => format!(
            "I don't have specific help for \"{other}\", but I can help with navigation, \
             progress, or saving, or explain any framework in the catalog."
        ),
        None => "I can help with navigation, progress tracking, saving, or background on \
             the framework you're assessing. What would you like to know?"
            .to_string(),
    }
}

fn framework_blurb(id: &str) -> Option<String> {
    let text = match id {
        "eu_ai_act" => "The EU AI Act regulates AI systems by risk tier, from minimal to \
             unacceptable. High-risk systems carry documentation, oversight, and \
             transparency obligations.",
        "iso_27001" => "ISO 27001 specifies requirements for an information security \
             management system: risk assessment, controls, and continuous improvement.",
        "iso_42001" => "ISO 42001 is the management system standard for AI, covering \
             governance, impact assessment, and lifecycle controls for AI systems.",
        "gdpr" => "The GDPR governs personal data processing in the EU: lawful bases, \
             data subject rights, and accountability obligations.",
        "iso_27701" => "ISO 27701 extends ISO 27001 with privacy information management, \
             mapping closely onto GDPR obligations.",
        "cloud_security" => "The cloud security assessment covers shared-responsibility \
             boundaries, identity, data protection, and workload hardening.",
        _ => return None,
    };
    Some(text.to_string())
}

/// Short explanation for a concept raised by the user. Falls back to an
/// honest "look it up together" when we have nothing canned.
pub fn explanation(concept: &str) -> String {
    let lower = concept.to_lowercase();
    if lower.contains("high-risk") || lower.contains("high risk") {
        return "Under the EU AI Act, high-risk systems are those used in areas like \
             hiring, credit, or critical infrastructure. They must meet strict requirements \
             on data quality, documentation, and human oversight."
            .to_string();
    }
    if lower.contains("dpia") || lower.contains("impact assessment") {
        return "A data protection impact assessment analyzes how a processing activity \
             affects individuals' privacy, and what you'll do to mitigate the risks. The \
             GDPR requires one for high-risk processing."
            .to_string();
    }
    if lower.contains("isms") {
        return "An ISMS (information security management system) is the set of policies, \
             processes, and controls an organization runs to manage security risk, as \
             specified by ISO 27001."
            .to_string();
    }
    format!(
        "Good question. I don't have a canned answer for \"{concept}\", but the step \
         description and question text usually carry the relevant definitions."
    )
}

/// Response to a suggestion chip the user clicked.
pub fn suggestion_response(suggestion: &str) -> String {
    let lower = suggestion.to_lowercase();
    if lower.contains("skip") {
        return "You can skip ahead where the framework allows it; use \"go to step N\". \
             Skipped questions simply stay unanswered."
            .to_string();
    }
    if lower.contains("review") {
        return "Use \"back\" or \"go to step N\" to revisit earlier answers. Changing an \
             answer updates your progress immediately."
            .to_string();
    }
    format!("Let's do it: {suggestion}")
}
