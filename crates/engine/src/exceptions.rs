//! Exception resolution.
//!
//! A namespace exempts a rule by listing its base name in an `exception`
//! set, e.g. `exception[rules] { rules := ["images"] }` exempts both
//! `deny_images` and `warn_images`.

use crate::error::Result;
use crate::evaluator::run_query;
use crate::executor::{EvalContext, QueryExecutor};
use conftest_types::{base_rule_name, PolicyResult, QueryResult};

/// Build the query that asks whether `rule` is exempted in `namespace`.
#[must_use]
pub fn exception_query(namespace: &str, rule: &str) -> String {
    format!(
        "data.{namespace}.exception[_][_] == \"{}\"",
        base_rule_name(rule)
    )
}

/// Exception records for one rule on one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Exceptions {
    /// One record per passing exception result. Each message is the
    /// exception query itself.
    pub records: Vec<PolicyResult>,
    /// The exception query as executed.
    pub query: QueryResult,
}

impl Exceptions {
    /// True when the rule's ordinary results must be suppressed.
    #[must_use]
    pub fn applies(&self) -> bool {
        !self.records.is_empty()
    }
}

/// Ask the backend whether `rule` is exempted for `input`.
#[tracing::instrument(skip(executor, input, ctx), level = "debug")]
pub fn resolve_exceptions(
    executor: &dyn QueryExecutor,
    input: &serde_json::Value,
    namespace: &str,
    rule: &str,
    ctx: &EvalContext<'_>,
) -> Result<Exceptions> {
    let query = run_query(executor, input, &exception_query(namespace, rule), ctx)?;

    let records: Vec<PolicyResult> = query
        .results
        .iter()
        .filter(|result| result.passed())
        .map(|result| PolicyResult {
            message: query.query.clone(),
            metadata: result.metadata.clone(),
        })
        .collect();

    if !records.is_empty() {
        tracing::debug!(count = records.len(), "Rule exempted");
    }

    Ok(Exceptions { records, query })
}
