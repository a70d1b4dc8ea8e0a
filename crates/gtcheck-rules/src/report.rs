//! Validation report: counters, ordered findings and the summary text.

use gtcheck_kernel::{IssueSink, Severity, ValidationIssue};
use serde::Serialize;
use std::fmt::Write as _;

/// Findings listed per severity before truncation.
pub const SUMMARY_ISSUE_LIMIT: usize = 50;

const RULE: &str =
    "================================================================================";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationCounters {
    /// Prompt files that decoded as JSON.
    pub files_checked: usize,
    pub multistep_entries: usize,
    pub multiturn_entries: usize,
    /// Ground-truth blocks seen, entry- and turn-level.
    pub ground_truth_validations: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    SuccessWithWarnings,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub counters: ValidationCounters,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl IssueSink for ValidationReport {
    fn push(&mut self, issue: ValidationIssue) {
        match issue.severity {
            Severity::Error => self.errors.push(issue),
            Severity::Warning => self.warnings.push(issue),
        }
    }
}

impl ValidationReport {
    pub fn outcome(&self) -> Outcome {
        if !self.errors.is_empty() {
            Outcome::Failed
        } else if !self.warnings.is_empty() {
            Outcome::SuccessWithWarnings
        } else {
            Outcome::Success
        }
    }

    /// True iff no errors were recorded. Warnings never fail a corpus.
    pub fn all_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn render_summary(&self) -> String {
        let counters = &self.counters;
        let mut out = String::new();
        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(out, "VALIDATION SUMMARY");
        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(out);
        let _ = writeln!(out, "Files checked: {}", counters.files_checked);
        let _ = writeln!(out, "Multistep entries: {}", counters.multistep_entries);
        let _ = writeln!(out, "Multiturn entries: {}", counters.multiturn_entries);
        let _ = writeln!(
            out,
            "Total ground_truth validations: {}",
            counters.ground_truth_validations
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(out, "Errors: {}", self.errors.len());
        let _ = writeln!(out, "Warnings: {}", self.warnings.len());
        let _ = writeln!(out, "{RULE}");

        write_issue_block(&mut out, "ERRORS", "errors", &self.errors);
        write_issue_block(&mut out, "WARNINGS", "warnings", &self.warnings);

        let _ = writeln!(out);
        let verdict = match self.outcome() {
            Outcome::Success => "[SUCCESS] All validations passed!",
            Outcome::SuccessWithWarnings => "[SUCCESS] No critical errors found (only warnings)",
            Outcome::Failed => "[FAILED] Validation failed - please fix errors above",
        };
        let _ = writeln!(out, "{verdict}");
        out
    }
}

fn write_issue_block(out: &mut String, heading: &str, noun: &str, issues: &[ValidationIssue]) {
    if issues.is_empty() {
        return;
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[{heading}]:");
    for issue in issues.iter().take(SUMMARY_ISSUE_LIMIT) {
        let _ = writeln!(out, "  - {issue}");
    }
    if issues.len() > SUMMARY_ISSUE_LIMIT {
        let _ = writeln!(
            out,
            "  ... and {} more {noun}",
            issues.len() - SUMMARY_ISSUE_LIMIT
        );
    }
}
