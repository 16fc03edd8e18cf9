//! Aggregation of every rule in a namespace into one `CheckResult`.

use crate::error::Result;
use crate::evaluator::evaluate_rule;
use crate::executor::{EvalContext, QueryExecutor};
use crate::inventory::NamespaceRules;
use conftest_types::CheckResult;

/// Check one document against every evaluated rule of a namespace.
///
/// Rules run in first-definition order. Rule bodies that produced no record
/// are counted as successes, so the result always accounts for at least
/// one outcome per evaluated rule body.
#[tracing::instrument(
    skip(executor, input, rules, ctx),
    fields(namespace = %rules.namespace, rules = rules.definition_count()),
    level = "debug"
)]
pub fn check_document(
    executor: &dyn QueryExecutor,
    input: &serde_json::Value,
    file_name: &str,
    rules: &NamespaceRules,
    ctx: &EvalContext<'_>,
) -> Result<CheckResult> {
    let mut result = CheckResult::new(file_name, rules.namespace.as_str());

    for entry in rules.evaluated() {
        let outcome = evaluate_rule(
            executor,
            input,
            &rules.namespace,
            &entry.name,
            entry.class,
            ctx,
        )?;

        result.successes += outcome.successes;
        result.failures.extend(outcome.failures);
        result.warnings.extend(outcome.warnings);
        result.exceptions.extend(outcome.exceptions);
        result.queries.extend(outcome.queries);
    }

    let expected = rules.definition_count();
    let recorded = result.total();
    if recorded < expected {
        tracing::trace!(inferred = expected - recorded, "Inferring successes");
        result.successes += expected - recorded;
    }

    tracing::debug!(
        successes = result.successes,
        failures = result.failures.len(),
        warnings = result.warnings.len(),
        exceptions = result.exceptions.len(),
        "Document checked"
    );
    Ok(result)
}
