//! The query backend contract.
//!
//! The engine never interprets policies itself. It hands fully-qualified
//! queries such as `data.main.deny` to a [`QueryExecutor`] and classifies
//! whatever comes back.

use conftest_types::PolicyResult;
use std::path::Path;
use std::time::{Duration, Instant};

/// Error type returned by query backends.
pub type ExecutorError = Box<dyn std::error::Error + Send + Sync>;

/// Evaluates one query against one input document.
///
/// Implementations must be shareable across threads. The engine only ever
/// reads from them.
pub trait QueryExecutor: Send + Sync {
    /// Execute `query` against `input`.
    ///
    /// An empty result list means the query produced nothing for this input.
    /// An error aborts the evaluation of the current document.
    fn execute(
        &self,
        input: &serde_json::Value,
        query: &str,
        ctx: &EvalContext<'_>,
    ) -> Result<QueryOutput, ExecutorError>;
}

/// What a backend returns for a single query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    pub results: Vec<PolicyResult>,
    /// Evaluation trace lines, only populated when tracing is requested.
    pub traces: Vec<String>,
    /// Lines written by `print` calls during evaluation.
    pub outputs: Vec<String>,
}

impl QueryOutput {
    #[must_use]
    pub fn new(results: Vec<PolicyResult>) -> Self {
        Self {
            results,
            ..Self::default()
        }
    }
}

/// The file currently being checked, exposed to policies by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContext {
    /// Base name of the file, e.g. `deployment.yaml`.
    pub name: String,
    /// Directory containing the file.
    pub dir: String,
}

impl FileContext {
    /// Build the context for a file path.
    ///
    /// Returns `None` for paths without a file name (and for the synthetic
    /// combined document).
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let path = Path::new(path);
        let name = path.file_name()?.to_string_lossy().into_owned();
        let dir = path
            .parent()
            .map(|parent| parent.to_string_lossy().into_owned())
            .unwrap_or_default();
        Some(Self { name, dir })
    }
}

/// Per-call evaluation settings threaded into every executor call.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalContext<'a> {
    pub trace: bool,
    pub file: Option<&'a FileContext>,
    pub deadline: Option<Instant>,
}

impl<'a> EvalContext<'a> {
    #[must_use]
    pub const fn new(trace: bool, deadline: Option<Instant>) -> Self {
        Self {
            trace,
            file: None,
            deadline,
        }
    }

    /// Same settings, scoped to the given file.
    #[must_use]
    pub const fn for_file(self, file: Option<&'a FileContext>) -> Self {
        Self { file, ..self }
    }

    /// Time left before the deadline, if one is set.
    ///
    /// Returns `Some(Duration::ZERO)` once the deadline has passed.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining().is_some_and(|left| left.is_zero())
    }
}
