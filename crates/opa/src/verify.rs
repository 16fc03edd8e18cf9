//! Policy unit tests through `opa test`.

use crate::error::{OpaError, Result};
use crate::executor::{eval_error_message, format_trace_event};
use conftest_types::{CheckResult, PolicyResult, QueryResult};
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::process::Command;

/// One entry of `opa test --format json`.
#[derive(Debug, Deserialize)]
struct TestCase {
    #[serde(default)]
    location: Option<Location>,
    package: String,
    name: String,
    #[serde(default)]
    fail: bool,
    #[serde(default)]
    skip: bool,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    trace: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Location {
    file: String,
}

/// Runs the `test_` rules of a policy tree with `opa test`.
#[derive(Debug, Clone)]
pub struct OpaTester {
    binary: String,
    paths: Vec<PathBuf>,
}

impl OpaTester {
    /// `paths` holds policy directories and files, including `_test.rego`
    /// files, and any data documents the tests need.
    #[must_use]
    pub fn new(binary: impl Into<String>, paths: Vec<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            paths,
        }
    }

    fn command(&self, trace: bool) -> Command {
        let mut command = Command::new(&self.binary);
        command.args(["test", "--format", "json"]);
        if trace {
            command.args(["--explain", "full"]);
        }
        command.args(&self.paths);
        command
    }

    /// Run every test and report one result per test case.
    #[tracing::instrument(skip(self), fields(paths = self.paths.len()))]
    pub fn run(&self, trace: bool) -> Result<Vec<CheckResult>> {
        let output = self
            .command(trace)
            .output()
            .map_err(|source| OpaError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        // `opa test` exits non-zero when a test fails, but still prints the
        // report. Only a missing report is an error.
        if !output.status.success() && serde_json::from_str::<Vec<Value>>(&stdout).is_err() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OpaError::Eval {
                query: "opa test".to_string(),
                message: eval_error_message(&stdout, &stderr),
            });
        }

        let results = parse_test_output(&stdout)?;
        tracing::debug!(tests = results.len(), "Policy tests finished");
        Ok(results)
    }
}

/// Parse the JSON report printed by `opa test --format json`.
///
/// Each test becomes a `CheckResult` named after the file that defines it,
/// in the namespace of its package. Failing and skipped tests carry the
/// message `<package>.<name>`. A test that raised an error aborts parsing.
pub fn parse_test_output(stdout: &str) -> Result<Vec<CheckResult>> {
    let cases: Vec<TestCase> =
        serde_json::from_str(stdout).map_err(|source| OpaError::Output {
            query: "opa test".to_string(),
            source,
        })?;

    cases.into_iter().map(check_result).collect()
}

fn check_result(case: TestCase) -> Result<CheckResult> {
    let qualified = format!("{}.{}", case.package, case.name);
    if let Some(error) = case.error.filter(|error| !error.is_null()) {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| error.to_string(), str::to_string);
        return Err(OpaError::Eval {
            query: qualified,
            message,
        });
    }

    let file = case
        .location
        .map(|location| location.file)
        .unwrap_or_default();
    let namespace = case
        .package
        .strip_prefix("data.")
        .unwrap_or(&case.package);
    let mut result = CheckResult::new(file, namespace);

    let record = if case.fail || case.skip {
        PolicyResult::new(qualified)
    } else {
        PolicyResult::pass()
    };
    if case.fail {
        result.failures.push(record.clone());
    } else if case.skip {
        result.skipped.push(record.clone());
    } else {
        result.successes = 1;
    }

    result.queries.push(QueryResult {
        query: case.name,
        results: vec![record],
        traces: case.trace.iter().map(format_trace_event).collect(),
        outputs: Vec::new(),
    });
    Ok(result)
}
