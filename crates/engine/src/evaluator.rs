//! Evaluation of a single rule against a single document.

use crate::error::{EngineError, Result};
use crate::exceptions::resolve_exceptions;
use crate::executor::{EvalContext, QueryExecutor};
use conftest_types::{PolicyResult, QueryResult, RuleClass};

/// What one rule produced for one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleOutcome {
    pub successes: usize,
    pub failures: Vec<PolicyResult>,
    pub warnings: Vec<PolicyResult>,
    pub exceptions: Vec<PolicyResult>,
    pub queries: Vec<QueryResult>,
}

impl RuleOutcome {
    /// Number of outcomes recorded for the rule.
    #[must_use]
    pub fn count(&self) -> usize {
        self.successes + self.failures.len() + self.warnings.len() + self.exceptions.len()
    }
}

/// Execute one query, honouring the deadline, and record it.
pub(crate) fn run_query(
    executor: &dyn QueryExecutor,
    input: &serde_json::Value,
    query: &str,
    ctx: &EvalContext<'_>,
) -> Result<QueryResult> {
    if ctx.is_expired() {
        return Err(EngineError::DeadlineExceeded {
            query: query.to_string(),
        });
    }

    tracing::trace!(query, "Executing query");
    let output = executor
        .execute(input, query, ctx)
        .map_err(|source| EngineError::Query {
            query: query.to_string(),
            source,
        })?;

    Ok(QueryResult {
        query: query.to_string(),
        results: output.results,
        traces: output.traces,
        outputs: output.outputs,
    })
}

/// Evaluate `rule` in `namespace` against one document.
///
/// Exceptions take precedence: when any apply, the rule query itself is not
/// executed and the exception records are the rule's whole outcome.
/// Unclassified rules produce an empty outcome without touching the backend.
#[tracing::instrument(skip(executor, input, ctx), level = "debug")]
pub fn evaluate_rule(
    executor: &dyn QueryExecutor,
    input: &serde_json::Value,
    namespace: &str,
    rule: &str,
    class: RuleClass,
    ctx: &EvalContext<'_>,
) -> Result<RuleOutcome> {
    let mut outcome = RuleOutcome::default();
    if !class.is_evaluated() {
        tracing::trace!("Rule is not evaluated, skipping");
        return Ok(outcome);
    }

    let exceptions = resolve_exceptions(executor, input, namespace, rule, ctx)?;
    let exempted = exceptions.applies();
    outcome.queries.push(exceptions.query);
    if exempted {
        outcome.exceptions = exceptions.records;
        return Ok(outcome);
    }

    let query = run_query(executor, input, &format!("data.{namespace}.{rule}"), ctx)?;
    for result in &query.results {
        if result.passed() {
            outcome.successes += 1;
            continue;
        }

        match class {
            RuleClass::Failure => outcome.failures.push(result.clone()),
            RuleClass::Warning => outcome.warnings.push(result.clone()),
            RuleClass::None => {}
        }
    }
    outcome.queries.push(query);

    tracing::debug!(
        successes = outcome.successes,
        failures = outcome.failures.len(),
        warnings = outcome.warnings.len(),
        "Rule evaluated"
    );
    Ok(outcome)
}
