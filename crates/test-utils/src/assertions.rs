//! Snapshot helpers for check results.
//!
//! Results are rendered one line per outcome so snapshots stay readable:
//!
//! ```text
//! deployment.yaml [main] successes=1
//! FAIL image uses the latest tag
//! ```

use conftest_types::CheckResult;

/// Format a single check result for snapshot testing.
#[must_use]
pub fn format_check_result(result: &CheckResult) -> String {
    let mut lines = vec![format!(
        "{} [{}] successes={}",
        result.file_name, result.namespace, result.successes
    )];

    let outcomes = [
        ("FAIL", &result.failures),
        ("WARN", &result.warnings),
        ("EXCP", &result.exceptions),
    ];
    for (label, results) in outcomes {
        for policy_result in results {
            if policy_result.metadata.is_empty() {
                lines.push(format!("{label} {}", policy_result.message));
            } else {
                let metadata = serde_json::to_string(&policy_result.metadata).unwrap_or_default();
                lines.push(format!("{label} {} {metadata}", policy_result.message));
            }
        }
    }

    lines.join("\n")
}

/// Format several check results, separated by blank lines.
#[must_use]
pub fn format_check_results(results: &[CheckResult]) -> String {
    if results.is_empty() {
        return String::from("(no results)");
    }

    results
        .iter()
        .map(format_check_result)
        .collect::<Vec<_>>()
        .join("\n\n")
}
