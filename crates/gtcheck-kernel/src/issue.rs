//! Validation findings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a finding. Only errors affect the corpus verdict.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// Where in a prompt file a finding was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Locator {
    /// The file as a whole (unreadable or undecodable).
    File,
    /// A 1-based entry index.
    Entry(usize),
    /// A 1-based entry index and 1-based turn index.
    Turn(usize, usize),
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::Entry(entry) => write!(f, "{entry}"),
            Self::Turn(entry, turn) => write!(f, "{entry}.{turn}"),
        }
    }
}

impl Serialize for Locator {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub severity: Severity,
    pub file: String,
    pub locator: Locator,
    pub message: String,
}

impl ValidationIssue {
    pub fn error(file: impl Into<String>, locator: Locator, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            file: file.into(),
            locator,
            message: message.into(),
        }
    }

    pub fn warning(file: impl Into<String>, locator: Locator, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            file: file.into(),
            locator,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.locator {
            Locator::File => write!(f, "{}: {}", self.file, self.message),
            locator => write!(f, "{} - Entry {locator}: {}", self.file, self.message),
        }
    }
}

/// Destination for findings raised while validating one prompt file.
pub trait IssueSink {
    fn push(&mut self, issue: ValidationIssue);
}

impl IssueSink for Vec<ValidationIssue> {
    fn push(&mut self, issue: ValidationIssue) {
        Vec::push(self, issue);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_entry_turn_and_file_locators() {
        let entry = ValidationIssue::error("Prompts/a.json", Locator::Entry(3), "boom");
        let turn = ValidationIssue::warning("Prompts/a.json", Locator::Turn(2, 1), "hmm");
        let file = ValidationIssue::error("Prompts/b.json", Locator::File, "Failed to load JSON");

        assert_eq!(entry.to_string(), "Prompts/a.json - Entry 3: boom");
        assert_eq!(turn.to_string(), "Prompts/a.json - Entry 2.1: hmm");
        assert_eq!(file.to_string(), "Prompts/b.json: Failed to load JSON");
    }

    #[test]
    fn locator_serializes_as_display_text() {
        let issue = ValidationIssue::warning("p.json", Locator::Turn(4, 2), "m");
        let value = serde_json::to_value(&issue).expect("issue should serialize");
        assert_eq!(value["locator"], "4.2");
        assert_eq!(value["severity"], "warning");
    }
}
