//! A scripted, in-memory query backend.
//!
//! ```ignore
//! use conftest_test_utils::ScriptedExecutor;
//! use conftest_types::PolicyResult;
//!
//! let executor = ScriptedExecutor::new()
//!     .on("data.main.deny", vec![PolicyResult::new("image uses latest tag")])
//!     .except("main", "images");
//! ```
//!
//! Queries without a script return an empty result set.

use conftest_engine::{EvalContext, ExecutorError, FileContext, QueryExecutor, QueryOutput};
use conftest_types::PolicyResult;
use serde_json::Value;
use std::sync::Mutex;

type Responder =
    Box<dyn Fn(&Value, &EvalContext<'_>) -> Result<QueryOutput, ScriptedError> + Send + Sync>;

/// The error returned by scripted failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedError(pub String);

impl std::fmt::Display for ScriptedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ScriptedError {}

/// One recorded executor call.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub query: String,
    pub input: Value,
    pub file: Option<FileContext>,
    pub trace: bool,
}

/// Query backend answering from a script, recording every call.
#[derive(Default)]
pub struct ScriptedExecutor {
    scripts: Vec<(String, Responder)>,
    calls: Mutex<Vec<Call>>,
}

impl std::fmt::Debug for ScriptedExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queries: Vec<_> = self.scripts.iter().map(|(query, _)| query).collect();
        f.debug_struct("ScriptedExecutor")
            .field("scripts", &queries)
            .finish_non_exhaustive()
    }
}

impl ScriptedExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `query` with a full output, including traces and print lines.
    #[must_use]
    pub fn on_output(self, query: &str, output: QueryOutput) -> Self {
        self.respond(query, move |_, _| Ok(output.clone()))
    }

    /// Answer `query` with fixed results.
    #[must_use]
    pub fn on(self, query: &str, results: Vec<PolicyResult>) -> Self {
        self.on_output(query, QueryOutput::new(results))
    }

    /// Answer `query` with results computed from the input document.
    #[must_use]
    pub fn on_input(
        self,
        query: &str,
        script: impl Fn(&Value) -> Vec<PolicyResult> + Send + Sync + 'static,
    ) -> Self {
        self.respond(query, move |input, _| Ok(QueryOutput::new(script(input))))
    }

    /// Fail `query` with `message`.
    #[must_use]
    pub fn fail_on(self, query: &str, message: &str) -> Self {
        let message = message.to_string();
        self.respond(query, move |_, _| Err(ScriptedError(message.clone())))
    }

    /// Exempt rules with base name `base` in `namespace` for every input.
    #[must_use]
    pub fn except(self, namespace: &str, base: &str) -> Self {
        self.on(
            &conftest_engine::exception_query(namespace, base),
            vec![PolicyResult::pass()],
        )
    }

    /// Answer `query` with an arbitrary closure.
    #[must_use]
    pub fn respond(
        mut self,
        query: &str,
        responder: impl Fn(&Value, &EvalContext<'_>) -> Result<QueryOutput, ScriptedError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.scripts.push((query.to_string(), Box::new(responder)));
        self
    }

    /// Every call so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// The queries executed so far, in order.
    #[must_use]
    pub fn queries(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.query).collect()
    }

    /// How many times `query` was executed.
    #[must_use]
    pub fn call_count(&self, query: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.query == query)
            .count()
    }
}

impl QueryExecutor for ScriptedExecutor {
    fn execute(
        &self,
        input: &Value,
        query: &str,
        ctx: &EvalContext<'_>,
    ) -> Result<QueryOutput, ExecutorError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(Call {
                query: query.to_string(),
                input: input.clone(),
                file: ctx.file.cloned(),
                trace: ctx.trace,
            });
        }

        // Later scripts override earlier ones.
        let Some((_, responder)) = self.scripts.iter().rev().find(|(q, _)| q == query) else {
            return Ok(QueryOutput::default());
        };
        responder(input, ctx).map_err(Into::into)
    }
}
