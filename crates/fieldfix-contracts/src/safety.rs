//! Decides whether a `safetyCheck` string describes a real hazard.
//!
//! The model is told to always fill the field, so it often comes back as a placeholder
//! ("None.", "N/A", "Standard safety protocols apply"). Those must not raise a banner; anything
//! else must.

pub const DEFAULT_MIN_CHARS: usize = 4;

const TERMINAL_PUNCTUATION: &[char] = &['.', ',', ':', ';', '-'];

const BENIGN_TOKENS: &[&str] = &[
    "none",
    "na",
    "n/a",
    "null",
    "nil",
    "-",
    ".",
    "safe",
    "no safety issues",
    "no safety hazards",
];

const BENIGN_PHRASES: &[&str] = &[
    "no safety hazards",
    "no safety issues",
    "no safety concerns",
    "no specific safety",
    "not applicable",
    "safe to proceed",
    "standard safety protocols apply",
    "standard safety precautions apply",
];

const BENIGN_PREFIXES: &[&str] = &["no safety", "none"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafetyClassifier {
    /// Normalized text shorter than this many characters is treated as a placeholder.
    pub min_chars: usize,
}

impl Default for SafetyClassifier {
    fn default() -> Self {
        Self {
            min_chars: DEFAULT_MIN_CHARS,
        }
    }
}

impl SafetyClassifier {
    pub fn new(min_chars: usize) -> Self {
        Self { min_chars }
    }

    pub fn is_actionable(&self, text: Option<&str>) -> bool {
        let Some(text) = text else {
            return false;
        };
        let normalized = normalize(text);
        if normalized.is_empty() {
            return false;
        }
        if BENIGN_TOKENS.contains(&normalized.as_str()) {
            return false;
        }
        let bare = strip_punctuation(&normalized);
        if BENIGN_PHRASES
            .iter()
            .any(|phrase| bare.contains(&strip_punctuation(phrase)))
        {
            return false;
        }
        if BENIGN_PREFIXES
            .iter()
            .any(|prefix| normalized.starts_with(prefix))
        {
            return false;
        }
        normalized.chars().count() >= self.min_chars
    }
}

/// Classifies with the default length threshold.
pub fn is_actionable(text: Option<&str>) -> bool {
    SafetyClassifier::default().is_actionable(text)
}

fn normalize(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .trim_end_matches(TERMINAL_PUNCTUATION)
        .trim()
        .to_string()
}

fn strip_punctuation(text: &str) -> String {
    text.chars()
        .map(|ch| if ch.is_ascii_punctuation() { ' ' } else { ch })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::{is_actionable, SafetyClassifier};

    #[test]
    fn placeholders_are_not_actionable() {
        for text in [
            "None.", "N/A", "-", ".", "null", "NIL", "na", "Safe", "  none  ", "None -",
        ] {
            assert!(!is_actionable(Some(text)), "{text:?} should be benign");
        }
        assert!(!is_actionable(None));
        assert!(!is_actionable(Some("")));
    }

    #[test]
    fn benign_phrases_are_matched_inside_longer_text() {
        for text in [
            "No safety hazards identified for this task.",
            "Not applicable - desk-based calculation only",
            "Safe to proceed; standard PPE.",
            "Standard safety protocols apply.",
            "There are no safety-concerns beyond normal PPE",
            "No safety risks; routine inspection",
            "None required for visual inspection",
        ] {
            assert!(!is_actionable(Some(text)), "{text:?} should be benign");
        }
    }

    #[test]
    fn real_hazards_are_actionable() {
        assert!(is_actionable(Some(
            "Disconnect main breaker before servicing — 415V present"
        )));
        assert!(is_actionable(Some(
            "Vessel is pressurised to 8 bar; vent and lock out before opening."
        )));
        assert!(is_actionable(Some("H2S risk: use gas monitor")));
    }

    #[test]
    fn length_threshold_is_configurable() {
        let strict = SafetyClassifier::new(3);
        let lenient = SafetyClassifier::new(6);
        assert!(strict.is_actionable(Some("Arc")));
        assert!(!SafetyClassifier::default().is_actionable(Some("Arc")));
        assert!(!lenient.is_actionable(Some("Burns")));
        assert!(SafetyClassifier::default().is_actionable(Some("Burns")));
    }
}
