//! Per-document check results and run summaries.

use crate::result::{PolicyResult, QueryResult};
use serde::{Deserialize, Serialize};

/// File name used for results produced in combined mode.
pub const COMBINED_FILE_NAME: &str = "Combined";

/// The outcome of checking one document (or the combined document) against
/// one namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    #[serde(rename = "filename")]
    pub file_name: String,
    pub namespace: String,
    pub successes: usize,
    #[serde(default)]
    pub warnings: Vec<PolicyResult>,
    #[serde(default)]
    pub failures: Vec<PolicyResult>,
    #[serde(default)]
    pub exceptions: Vec<PolicyResult>,
    /// Policy unit tests marked as skipped.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<PolicyResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub queries: Vec<QueryResult>,
}

impl CheckResult {
    #[must_use]
    pub fn new(file_name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Number of outcomes recorded: successes plus every reported result.
    #[must_use]
    pub fn total(&self) -> usize {
        self.successes
            + self.failures.len()
            + self.warnings.len()
            + self.exceptions.len()
            + self.skipped.len()
    }

    /// Append another result's outcomes to this one.
    ///
    /// Successes are summed and the result lists are concatenated in order.
    /// The file name and namespace of `self` are kept.
    pub fn merge(&mut self, other: Self) {
        self.successes += other.successes;
        self.warnings.extend(other.warnings);
        self.failures.extend(other.failures);
        self.exceptions.extend(other.exceptions);
        self.skipped.extend(other.skipped);
        self.queries.extend(other.queries);
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Aggregate counts across a set of check results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckSummary {
    pub tests: usize,
    pub passed: usize,
    pub warnings: usize,
    pub failures: usize,
    pub exceptions: usize,
    pub skipped: usize,
}

impl CheckSummary {
    #[must_use]
    pub fn from_results(results: &[CheckResult]) -> Self {
        results.iter().fold(Self::default(), |mut summary, result| {
            summary.tests += result.total();
            summary.passed += result.successes;
            summary.warnings += result.warnings.len();
            summary.failures += result.failures.len();
            summary.exceptions += result.exceptions.len();
            summary.skipped += result.skipped.len();
            summary
        })
    }

    /// Process exit code for a run with these totals.
    ///
    /// With `fail_on_warn`, failures exit with 2 and warnings with 1.
    /// Otherwise only failures are fatal and exit with 1.
    #[must_use]
    pub const fn exit_code(&self, fail_on_warn: bool) -> i32 {
        let has_failures = self.failures > 0;
        let has_warnings = self.warnings > 0;

        if fail_on_warn && has_failures {
            2
        } else if (fail_on_warn && has_warnings) || has_failures {
            1
        } else {
            0
        }
    }
}

impl std::fmt::Display for CheckSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} test{}, {} passed, {} warning{}, {} failure{}, {} exception{}",
            self.tests,
            plural(self.tests),
            self.passed,
            self.warnings,
            plural(self.warnings),
            self.failures,
            plural(self.failures),
            self.exceptions,
            plural(self.exceptions),
        )?;
        if self.skipped > 0 {
            write!(f, ", {} skipped", self.skipped)?;
        }
        Ok(())
    }
}

const fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}
