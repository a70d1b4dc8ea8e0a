use crate::support::{layout_or_exit, load_registries_or_exit, print_json_or_exit, sha256_hex};
use gtcheck_rules::{PromptCorpusWalker, ValidationRules};
use serde_json::json;

const CHECK_KIND: &str = "gtcheck.ground_truth_check.v1";

pub fn run(base_dir: String, json_output: bool) {
    let layout = layout_or_exit(&base_dir);
    let registries = load_registries_or_exit(&layout);
    let rules = ValidationRules::new(&registries.backends, &registries.apis);

    let report = PromptCorpusWalker::new(&layout, rules)
        .run()
        .unwrap_or_else(|e| {
            eprintln!("error: failed to walk prompt corpus: {e}");
            std::process::exit(2);
        });
    tracing::info!(
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "ground truth check finished"
    );
    let summary = report.render_summary();

    if json_output {
        let payload = json!({
            "schema": 1,
            "checkKind": CHECK_KIND,
            "baseDir": base_dir,
            "result": report.outcome(),
            "allValid": report.all_valid(),
            "counters": report.counters,
            "errorCount": report.errors.len(),
            "warningCount": report.warnings.len(),
            "errors": report.errors,
            "warnings": report.warnings,
            "summaryDigest": sha256_hex(summary.as_bytes()),
        });
        print_json_or_exit(&payload, "check");
    } else {
        print!("{summary}");
    }

    if !report.all_valid() {
        std::process::exit(1);
    }
}
