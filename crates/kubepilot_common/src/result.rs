//! Typed outcomes returned by the orchestration entry point.

use serde::{Deserialize, Serialize};

/// Classifier verdict for a user query.
///
/// Anything the classifier returns beyond the two known intents is
/// carried as `Other` and reported as a data-level error downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Question,
    Command,
    Other(String),
}

impl Intent {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "question" => Intent::Question,
            "command" => Intent::Command,
            other => Intent::Other(other.to_string()),
        }
    }
}

/// Result of processing one query, created once and never mutated.
///
/// The wire shape is `{"type": "...", ...}` with kebab-case kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ExecutionResult {
    Answer {
        result: String,
    },
    Command {
        result: String,
    },
    MultiStep {
        result: String,
    },
    Action {
        result: String,
    },
    Clarify {
        #[serde(skip_serializing_if = "Option::is_none")]
        hint: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        missing: Option<Vec<String>>,
    },
    Error {
        message: String,
    },
}

/// One stored interaction, most recent first in history listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub query: String,
    pub response: String,
    pub timestamp: String,
}
