//! Voice transcript intent classification.
//!
//! Keyword matching only. Transcripts that match nothing are passed
//! through as general input rather than rejected.

use std::sync::OnceLock;

use regex::Regex;

/// A navigation action extracted from a transcript or request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    Next,
    Previous,
    Goto(u32),
}

/// What a voice transcript asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceIntent {
    Navigation(NavAction),
    Help { topic: Option<String> },
    Explanation { concept: String },
    General(String),
}

fn goto_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:go to|goto|jump to)\s+step\s+(\d+)").expect("goto pattern is valid")
    })
}

/// Classify a transcript. Matching is case-insensitive; the explicit
/// "go to step N" form wins over the bare navigation keywords.
pub fn classify(transcript: &str) -> VoiceIntent {
    let lower = transcript.to_lowercase();

    if let Some(caps) = goto_re().captures(&lower) {
        if let Ok(step) = caps[1].parse::<u32>() {
            return VoiceIntent::Navigation(NavAction::Goto(step));
        }
    }
    if lower.contains("next") || lower.contains("continue") {
        return VoiceIntent::Navigation(NavAction::Next);
    }
    if lower.contains("back") || lower.contains("previous") {
        return VoiceIntent::Navigation(NavAction::Previous);
    }
    if lower.contains("explain") || lower.contains("what is") || lower.contains("what does") {
        return VoiceIntent::Explanation {
            concept: transcript.trim().to_string(),
        };
    }
    if lower.contains("help") {
        return VoiceIntent::Help { topic: None };
    }
    VoiceIntent::General(transcript.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goto_step_wins_over_bare_keywords() {
        // "go to" contains no "next", but make sure an explicit target
        // is honored even alongside filler words.
        assert_eq!(
            classify("please go to step 7 now"),
            VoiceIntent::Navigation(NavAction::Goto(7))
        );
        assert_eq!(
            classify("GOTO STEP 3"),
            VoiceIntent::Navigation(NavAction::Goto(3))
        );
    }

    #[test]
    fn navigation_keywords() {
        assert_eq!(
            classify("next question please"),
            VoiceIntent::Navigation(NavAction::Next)
        );
        assert_eq!(
            classify("let's continue"),
            VoiceIntent::Navigation(NavAction::Next)
        );
        assert_eq!(
            classify("go back"),
            VoiceIntent::Navigation(NavAction::Previous)
        );
        assert_eq!(
            classify("Previous step"),
            VoiceIntent::Navigation(NavAction::Previous)
        );
    }

    #[test]
    fn explanation_beats_help() {
        assert_eq!(
            classify("help me explain this requirement"),
            VoiceIntent::Explanation {
                concept: "help me explain this requirement".into()
            }
        );
        assert_eq!(classify("I need help"), VoiceIntent::Help { topic: None });
    }

    #[test]
    fn unmatched_transcripts_pass_through() {
        assert_eq!(
            classify("  the weather is nice  "),
            VoiceIntent::General("the weather is nice".into())
        );
    }
}
