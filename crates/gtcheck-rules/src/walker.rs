//! Prompt corpus traversal.
//!
//! Files are visited in sorted order (`Prompts/*.json`, then
//! `Prompts/Combinations/*.json`), entries, turns and services in document
//! order. A file that cannot be read or decoded yields one file-level error
//! and is not counted; nothing inside a file can stop the walk.

use crate::RulesError;
use crate::layout::CorpusLayout;
use crate::report::ValidationReport;
use crate::rules::{CallSite, ValidationRules};
use gtcheck_kernel::{IssueSink, Locator, try_parse_call};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

const USER_ID_FIELD: &str = "user_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Multistep,
    Multiturn,
}

impl EntryKind {
    fn key(self) -> &'static str {
        match self {
            Self::Multistep => "multistep",
            Self::Multiturn => "multiturn",
        }
    }
}

/// The single service a `context` block names, if exactly one key other
/// than `user_id` maps to an object.
pub fn inferred_service(context: Option<&Value>) -> Option<&str> {
    let fields = context?.as_object()?;
    let mut services = fields
        .iter()
        .filter(|(key, value)| key.as_str() != USER_ID_FIELD && value.is_object())
        .map(|(key, _)| key.as_str());
    let first = services.next()?;
    services.next().is_none().then_some(first)
}

pub struct PromptCorpusWalker<'a> {
    layout: &'a CorpusLayout,
    rules: ValidationRules<'a>,
}

impl<'a> PromptCorpusWalker<'a> {
    pub fn new(layout: &'a CorpusLayout, rules: ValidationRules<'a>) -> Self {
        Self { layout, rules }
    }

    /// Prompt files in visiting order.
    pub fn prompt_files(&self) -> Result<Vec<PathBuf>, RulesError> {
        let mut files = json_files(&self.layout.prompts_dir)?;
        files.extend(json_files(&self.layout.combinations_dir)?);
        Ok(files)
    }

    pub fn run(&self) -> Result<ValidationReport, RulesError> {
        let files = self.prompt_files()?;
        tracing::info!(files = files.len(), "found prompt files to validate");

        let mut report = ValidationReport::default();
        for path in &files {
            self.validate_file(path, &mut report);
        }
        Ok(report)
    }

    pub fn validate_file(&self, path: &Path, report: &mut ValidationReport) {
        let file = self.layout.display_path(path);
        tracing::info!("Validating: {file}");

        let document = match read_prompt(path) {
            Ok(document) => document,
            Err(reason) => {
                report.push(CallSite { file: &file, locator: Locator::File }.error(format!(
                    "Failed to load JSON - {reason}"
                )));
                return;
            }
        };
        report.counters.files_checked += 1;
        self.validate_document(&file, &document, report);
    }

    fn validate_document(&self, file: &str, document: &Value, report: &mut ValidationReport) {
        let file_site = CallSite {
            file,
            locator: Locator::File,
        };
        let Some(fields) = document.as_object() else {
            report.push(file_site.error("Malformed prompt file: expected a JSON object"));
            return;
        };

        for kind in [EntryKind::Multistep, EntryKind::Multiturn] {
            let Some(entries) = fields.get(kind.key()) else {
                continue;
            };
            let Some(entries) = entries.as_array() else {
                report.push(file_site.error(format!(
                    "Malformed prompt file: '{}' is not a list",
                    kind.key()
                )));
                continue;
            };
            for (index, entry) in entries.iter().enumerate() {
                let number = index + 1;
                match kind {
                    EntryKind::Multistep => report.counters.multistep_entries += 1,
                    EntryKind::Multiturn => report.counters.multiturn_entries += 1,
                }
                let site = CallSite {
                    file,
                    locator: Locator::Entry(number),
                };
                let Some(entry) = entry.as_object() else {
                    report.push(site.error(format!(
                        "Malformed {} entry: expected a JSON object",
                        kind.key()
                    )));
                    continue;
                };
                let context = entry.get("context");
                self.validate_context(context, kind, &site, report);

                if kind == EntryKind::Multiturn
                    && let Some(turns) = entry.get("turns").and_then(Value::as_array)
                {
                    for (turn_index, turn) in turns.iter().enumerate() {
                        let turn_site = CallSite {
                            file,
                            locator: Locator::Turn(number, turn_index + 1),
                        };
                        let Some(turn) = turn.as_object() else {
                            report.push(
                                turn_site.error("Malformed turn entry: expected a JSON object"),
                            );
                            continue;
                        };
                        if let Some(ground_truth) = turn.get("ground_truth") {
                            report.counters.ground_truth_validations += 1;
                            self.validate_ground_truth(ground_truth, context, &turn_site, report);
                        }
                    }
                }

                if let Some(ground_truth) = entry.get("ground_truth") {
                    report.counters.ground_truth_validations += 1;
                    self.validate_ground_truth(ground_truth, context, &site, report);
                }
            }
        }
    }

    /// Check every `{service: {user_id}}` pair of a context block. A
    /// multiturn context with a top-level `user_id` names no service and is
    /// skipped.
    fn validate_context(
        &self,
        context: Option<&Value>,
        kind: EntryKind,
        site: &CallSite<'_>,
        report: &mut ValidationReport,
    ) {
        let Some(fields) = context.and_then(Value::as_object) else {
            return;
        };
        if kind == EntryKind::Multiturn && fields.contains_key(USER_ID_FIELD) {
            return;
        }
        for (service, service_data) in fields {
            let Some(user_id) = service_data.get(USER_ID_FIELD) else {
                continue;
            };
            self.rules
                .validate_context_user(service, &id_text(user_id), site, report);
        }
    }

    fn validate_ground_truth(
        &self,
        ground_truth: &Value,
        context: Option<&Value>,
        site: &CallSite<'_>,
        report: &mut ValidationReport,
    ) {
        match ground_truth {
            Value::Object(by_service) => {
                for (service, calls) in by_service {
                    let Some(calls) = calls.as_array() else {
                        continue;
                    };
                    for call in calls.iter().filter_map(Value::as_str) {
                        self.validate_call_string(Some(service.as_str()), call, site, report);
                    }
                }
            }
            Value::Array(calls) => {
                let service = inferred_service(context);
                for call in calls.iter().filter_map(Value::as_str) {
                    self.validate_call_string(service, call, site, report);
                }
            }
            _ => {}
        }
    }

    /// Parse one call string; run the rules when the service is known.
    fn validate_call_string(
        &self,
        service: Option<&str>,
        call: &str,
        site: &CallSite<'_>,
        report: &mut ValidationReport,
    ) {
        match try_parse_call(call) {
            Ok(parsed) => {
                if let Some(service) = service {
                    self.rules.validate_call(service, &parsed, site, report);
                }
            }
            Err(error) => {
                tracing::debug!(call, %error, "call string did not parse");
                report.push(site.error(format!("Invalid function call syntax: '{call}'")));
            }
        }
    }
}

fn json_files(dir: &Path) -> Result<Vec<PathBuf>, RulesError> {
    if !dir.is_dir() {
        tracing::info!(dir = %dir.display(), "prompt directory not found");
        return Ok(Vec::new());
    }
    let io_error = |source| RulesError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn read_prompt(path: &Path) -> Result<Value, String> {
    let text = fs::read_to_string(path).map_err(|error| error.to_string())?;
    serde_json::from_str(&text).map_err(|error| error.to_string())
}

/// Text of a context `user_id`; non-string values render as JSON and so
/// never match a real id.
fn id_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Registries;
    use crate::test_support::TempDirGuard;
    use gtcheck_kernel::Severity;
    use serde_json::json;

    const GMAIL_STATE: &str = r#"{
        "users": {"alice@example.com": {"gmail_data": {"messages": {}, "drafts": {}}}}
    }"#;
    const AMAZON_STATE: &str = r#"{
        "users": [{"user_id": "shopper", "orders": []}],
        "products": []
    }"#;
    const GMAIL_API: &str =
        "class GmailApis:\n    def send_email(self, user_id, to, subject, body):\n        pass\n";
    const AMAZON_API: &str =
        "class AmazonApis:\n    def search_products(self, query):\n        pass\n";

    struct Corpus {
        dir: TempDirGuard,
    }

    impl Corpus {
        fn new(prefix: &str) -> Self {
            let dir = TempDirGuard::new(prefix);
            dir.write("Backends/diverse_gmail_state.json", GMAIL_STATE);
            dir.write("Backends/diverse_amazon_state.json", AMAZON_STATE);
            dir.write("GmailApis.py", GMAIL_API);
            dir.write("AmazonApis.py", AMAZON_API);
            Self { dir }
        }

        fn prompt(&self, relative: &str, document: &Value) {
            self.dir.write(
                relative,
                &serde_json::to_string_pretty(document).expect("prompt should serialize"),
            );
        }

        fn run(&self) -> ValidationReport {
            let layout = CorpusLayout::from_base_dir(self.dir.path());
            let registries = Registries::load(&layout).expect("registries should load");
            let rules = ValidationRules::new(&registries.backends, &registries.apis);
            PromptCorpusWalker::new(&layout, rules)
                .run()
                .expect("walk should succeed")
        }
    }

    fn issue_lines(issues: &[gtcheck_kernel::ValidationIssue]) -> Vec<String> {
        issues.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn empty_multistep_contributes_nothing() {
        let corpus = Corpus::new("walk-empty");
        corpus.prompt("Prompts/empty.json", &json!({"multistep": []}));

        let report = corpus.run();
        assert_eq!(report.counters.files_checked, 1);
        assert_eq!(report.counters.multistep_entries, 0);
        assert_eq!(report.counters.ground_truth_validations, 0);
        assert!(report.errors.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn non_json_file_is_one_file_level_error() {
        let corpus = Corpus::new("walk-bad-json");
        corpus.dir.write("Prompts/broken.json", "{ \"multistep\": [");
        corpus.prompt("Prompts/ok.json", &json!({"multistep": [{}]}));

        let report = corpus.run();
        assert_eq!(report.counters.files_checked, 1);
        assert_eq!(report.counters.multistep_entries, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].locator, Locator::File);
        assert_eq!(report.errors[0].file, "Prompts/broken.json");
        assert!(
            report.errors[0]
                .to_string()
                .starts_with("Prompts/broken.json: Failed to load JSON - ")
        );
    }

    #[test]
    fn missing_context_user_is_one_error() {
        let corpus = Corpus::new("walk-context");
        corpus.prompt(
            "Prompts/shop.json",
            &json!({"multistep": [{"context": {"amazon": {"user_id": "does-not-exist"}}}]}),
        );

        let report = corpus.run();
        assert_eq!(
            issue_lines(&report.errors),
            vec![
                "Prompts/shop.json - Entry 1: User ID 'does-not-exist' not found in amazon backend"
            ]
        );
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn bare_send_message_is_flagged_against_the_api_surface() {
        let corpus = Corpus::new("walk-send-message");
        corpus.prompt(
            "Prompts/mail.json",
            &json!({"multistep": [{
                "context": {"gmail": {"user_id": "alice@example.com"}},
                "ground_truth": {"gmail": [
                    "send_message(\"u1\", \"to@x.com\", \"Subj\", \"Body\")",
                    "send_email(\"alice@example.com\", \"to@x.com\", \"Subj\", \"Body\")"
                ]}
            }]}),
        );

        let report = corpus.run();
        assert_eq!(
            issue_lines(&report.errors),
            vec!["Prompts/mail.json - Entry 1: Method 'send_message' not found in gmail API"]
        );
        assert_eq!(report.counters.ground_truth_validations, 1);
    }

    #[test]
    fn turns_use_dotted_locators() {
        let corpus = Corpus::new("walk-turns");
        corpus.prompt(
            "Prompts/Combinations/a_combo.json",
            &json!({"multiturn": [{
                "context": {"gmail": {"user_id": "alice@example.com"}},
                "turns": [
                    {"ground_truth": {"gmail": ["send_email(\"alice@example.com\")"]}},
                    {"ground_truth": {"gmail": ["send_emial()"]}}
                ],
                "ground_truth": {"gmail": ["not a call"]}
            }]}),
        );
        corpus.prompt(
            "Prompts/z_single.json",
            &json!({"multistep": [{"ground_truth": {"slack": ["post(\"general\")"]}}]}),
        );

        let report = corpus.run();
        assert_eq!(report.counters.files_checked, 2);
        assert_eq!(report.counters.multiturn_entries, 1);
        assert_eq!(report.counters.multistep_entries, 1);
        assert_eq!(report.counters.ground_truth_validations, 4);
        assert_eq!(
            issue_lines(&report.errors),
            vec![
                "Prompts/Combinations/a_combo.json - Entry 1.2: Method 'send_emial' not found in gmail API",
                "Prompts/Combinations/a_combo.json - Entry 1: Invalid function call syntax: 'not a call'",
            ]
        );
        assert_eq!(
            issue_lines(&report.warnings),
            vec!["Prompts/z_single.json - Entry 1: No API methods found for service 'slack'"]
        );
    }

    #[test]
    fn services_are_visited_in_document_order() {
        let corpus = Corpus::new("walk-order");
        corpus.dir.write(
            "Prompts/order.json",
            r#"{"multistep": [{
                "context": {"gmail": {"user_id": "ghost-g"}, "amazon": {"user_id": "ghost-a"}},
                "ground_truth": {"gmail": ["gone_g()"], "amazon": ["gone_a()"]}
            }]}"#,
        );

        let report = corpus.run();
        assert_eq!(
            issue_lines(&report.errors),
            vec![
                "Prompts/order.json - Entry 1: User ID 'ghost-g' not found in gmail backend",
                "Prompts/order.json - Entry 1: User ID 'ghost-a' not found in amazon backend",
                "Prompts/order.json - Entry 1: Method 'gone_g' not found in gmail API",
                "Prompts/order.json - Entry 1: Method 'gone_a' not found in amazon API",
            ]
        );
    }

    #[test]
    fn multiturn_context_with_flat_user_id_is_not_checked() {
        let corpus = Corpus::new("walk-flat-context");
        corpus.prompt(
            "Prompts/flat.json",
            &json!({"multiturn": [{
                "context": {"user_id": "ghost", "amazon": {"user_id": "ghost"}},
                "turns": []
            }]}),
        );

        let report = corpus.run();
        assert!(report.errors.is_empty());
        assert_eq!(report.counters.multiturn_entries, 1);
    }

    #[test]
    fn list_ground_truth_infers_a_single_context_service() {
        let corpus = Corpus::new("walk-list-form");
        corpus.prompt(
            "Prompts/list.json",
            &json!({"multistep": [
                {
                    "context": {"amazon": {"user_id": "shopper"}},
                    "ground_truth": ["search_products(\"lamp\")", "checkout()"]
                },
                {
                    "context": {"amazon": {"user_id": "shopper"}, "gmail": {"user_id": "alice@example.com"}},
                    "ground_truth": ["checkout()", "broken("]
                }
            ]}),
        );

        let report = corpus.run();
        assert_eq!(
            issue_lines(&report.errors),
            vec![
                "Prompts/list.json - Entry 1: Method 'checkout' not found in amazon API",
                "Prompts/list.json - Entry 2: Invalid function call syntax: 'broken('",
            ]
        );
    }

    #[test]
    fn malformed_entries_do_not_stop_siblings() {
        let corpus = Corpus::new("walk-malformed");
        corpus.prompt(
            "Prompts/mixed.json",
            &json!({"multistep": [
                "just a string",
                {"ground_truth": {"amazon": ["search_products(\"lamp\")", 42, "nope("]}}
            ]}),
        );

        let report = corpus.run();
        let severities: Vec<Severity> = report.errors.iter().map(|issue| issue.severity).collect();
        assert_eq!(severities, vec![Severity::Error, Severity::Error]);
        assert_eq!(
            issue_lines(&report.errors),
            vec![
                "Prompts/mixed.json - Entry 1: Malformed multistep entry: expected a JSON object",
                "Prompts/mixed.json - Entry 2: Invalid function call syntax: 'nope('",
            ]
        );
        assert_eq!(report.counters.multistep_entries, 2);
    }

    #[test]
    fn rerunning_an_unchanged_corpus_is_identical() {
        let corpus = Corpus::new("walk-idempotent");
        corpus.prompt(
            "Prompts/b.json",
            &json!({"multistep": [{"ground_truth": {"gmail": ["x()"]}}]}),
        );
        corpus.prompt(
            "Prompts/a.json",
            &json!({"multistep": [{"context": {"amazon": {"user_id": "nobody"}}}]}),
        );

        let first = corpus.run();
        let second = corpus.run();
        assert_eq!(first, second);
        assert_eq!(first.render_summary(), second.render_summary());
        assert_eq!(first.errors[0].file, "Prompts/a.json");
    }

    #[test]
    fn inferred_service_requires_exactly_one_service_object() {
        assert_eq!(
            inferred_service(Some(&json!({"user_id": "u", "gmail": {"user_id": "u"}}))),
            Some("gmail")
        );
        assert_eq!(
            inferred_service(Some(&json!({"gmail": {}, "slack": {}}))),
            None
        );
        assert_eq!(inferred_service(Some(&json!({"user_id": "u"}))), None);
        assert_eq!(inferred_service(None), None);
    }
}
