//! Scenario data handed over by the quiz/navigation layer.
//!
//! The choreography core only needs the chosen action text and whether the
//! choice was the correct one; everything else stays with the caller.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    intent::{classify, Intent},
    Result,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
    #[serde(default)]
    pub correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub prompt: String,
    pub choices: Vec<Choice>,
}

impl Scenario {
    /// Reads a JSON array of scenarios.
    pub fn load_all(path: impl AsRef<Path>) -> Result<Vec<Self>> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn choose(&self, index: usize) -> Option<Decision> {
        self.choices.get(index).map(|choice| Decision {
            action: choice.text.clone(),
            correct: choice.correct,
        })
    }
}

/// The player's pick: chosen action text plus its outcome flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: String,
    pub correct: bool,
}

impl Decision {
    pub fn intent(&self) -> Intent {
        classify(&self.action)
    }
}
