use std::fmt;

use serde::{Deserialize, Serialize};

/// Maneuver category a chosen action resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    Proceed,
    Stop,
    Overtake,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proceed => "PROCEED",
            Self::Stop => "STOP",
            Self::Overtake => "OVERTAKE",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword sets checked in order. The first set with a match wins.
const KEYWORDS: [(Intent, &[&str]); 3] = [
    (Intent::Proceed, &["proceed", "continue", "go ahead"]),
    (Intent::Stop, &["stop", "brake", "halt"]),
    (Intent::Overtake, &["overtake", "pass", "change lane"]),
];

/// Intent used when no keyword matches.
///
/// Unrecognised actions brake. New action vocabularies may want a different
/// fallback; confirm with the scenario authors before changing it.
pub const FALLBACK_INTENT: Intent = Intent::Stop;

/// Classifies free-form chosen-action text into a maneuver intent.
///
/// Matching is case-insensitive substring search. The function is total: text
/// that matches nothing maps to [`FALLBACK_INTENT`].
pub fn classify(text: &str) -> Intent {
    let lowered = text.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|word| lowered.contains(word)))
        .map(|(intent, _)| *intent)
        .unwrap_or(FALLBACK_INTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_reference_phrases() {
        assert_eq!(classify("Proceed with caution"), Intent::Proceed);
        assert_eq!(classify("Stop immediately"), Intent::Stop);
        assert_eq!(classify("Overtake the jeepney"), Intent::Overtake);
    }

    #[test]
    fn unmatched_text_falls_back_to_stop() {
        assert_eq!(classify("asdf"), Intent::Stop);
        assert_eq!(classify(""), Intent::Stop);
    }

    #[test]
    fn matching_ignores_case() {
        assert_eq!(classify("GO AHEAD slowly"), Intent::Proceed);
        assert_eq!(classify("Hit the BRAKE"), Intent::Stop);
        assert_eq!(classify("Change Lane to the left"), Intent::Overtake);
    }

    #[test]
    fn earlier_keyword_sets_take_priority() {
        // both "continue" and "pass" appear; PROCEED is checked first
        assert_eq!(classify("Continue and pass the bus"), Intent::Proceed);
        // "stop" beats "overtake"
        assert_eq!(classify("Stop instead of trying to overtake"), Intent::Stop);
    }

    #[test]
    fn keywords_match_inside_longer_words() {
        assert_eq!(classify("Passenger drop-off"), Intent::Overtake);
    }

    #[test]
    fn serializes_as_upper_case_names() {
        let json = serde_json::to_string(&Intent::Overtake).unwrap();
        assert_eq!(json, "\"OVERTAKE\"");
        assert_eq!(Intent::Proceed.to_string(), "PROCEED");
    }
}
