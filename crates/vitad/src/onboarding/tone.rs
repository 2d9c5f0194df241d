//! Empathetic acknowledgments prepended to follow-up questions.
//!
//! The tone of the previous answer is classified by keyword scan and an
//! acknowledgment phrase is picked deterministically from a small bank,
//! rotating with the step index so consecutive questions do not repeat
//! the same phrase.

/// Classified tone of a user's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// The answer signals difficulty or distress.
    Supportive,
    /// The answer signals something going well.
    Celebrate,
    /// Nothing notable, no acknowledgment is added.
    Neutral,
}

const SEVERITY_MARKERS: &[&str] = &[
    "terrible",
    "awful",
    "horrible",
    "exhausted",
    "can't sleep",
    "cannot sleep",
    "barely",
    "always tired",
    "every day",
    "constant",
    "severe",
    "really bad",
    "very bad",
    "struggling",
    "less than 6",
    "more than 5",
];

const POSITIVE_MARKERS: &[&str] = &[
    "great",
    "pretty good",
    "good",
    "fine",
    "well",
    "better",
    "improving",
    "no problem",
];

const SUPPORTIVE_PHRASES: &[&str] = &[
    "That sounds tough, thanks for sharing.",
    "I hear you, that can really wear you down.",
    "Thanks for being open about that.",
    "That's not easy to deal with.",
];

const CELEBRATE_PHRASES: &[&str] = &[
    "Glad to hear that!",
    "That's good to hear.",
    "Nice, keep that up!",
];

/// Classify the tone of an answer.
pub fn classify(answer: &str) -> Tone {
    let lowered = answer.to_lowercase();
    if SEVERITY_MARKERS.iter().any(|m| lowered.contains(m)) {
        Tone::Supportive
    } else if POSITIVE_MARKERS.iter().any(|m| lowered.contains(m)) {
        Tone::Celebrate
    } else {
        Tone::Neutral
    }
}

/// Pick an acknowledgment for an answer, rotating with `step` so the
/// same phrase is not used twice in a row. Returns `None` for neutral
/// answers.
pub fn acknowledgment(answer: &str, step: usize) -> Option<&'static str> {
    match classify(answer) {
        Tone::Supportive => Some(SUPPORTIVE_PHRASES[step % SUPPORTIVE_PHRASES.len()]),
        Tone::Celebrate => Some(CELEBRATE_PHRASES[step % CELEBRATE_PHRASES.len()]),
        Tone::Neutral => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_markers_are_supportive() {
        assert_eq!(classify("I'm exhausted all the time"), Tone::Supportive);
        assert_eq!(classify("less than 6"), Tone::Supportive);
    }

    #[test]
    fn positive_markers_celebrate() {
        assert_eq!(classify("Pretty good actually"), Tone::Celebrate);
    }

    #[test]
    fn plain_answers_are_neutral() {
        assert_eq!(classify("34"), Tone::Neutral);
        assert_eq!(acknowledgment("34", 3), None);
    }

    #[test]
    fn rotation_is_deterministic_and_varies() {
        let a = acknowledgment("I'm exhausted", 0).unwrap();
        let b = acknowledgment("I'm exhausted", 1).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, acknowledgment("I'm exhausted", 0).unwrap());
    }
}
