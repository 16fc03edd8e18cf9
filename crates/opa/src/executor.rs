//! Query execution through the `opa` binary.

use crate::error::{OpaError, Result};
use conftest_engine::{EvalContext, ExecutorError, FileContext, QueryExecutor, QueryOutput};
use conftest_types::{PolicyResult, RuleOutput};
use serde_json::{json, Value};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Runs queries with `opa eval`, one process per query.
#[derive(Debug, Clone)]
pub struct OpaExecutor {
    binary: String,
    policies: Vec<PathBuf>,
    data: Vec<PathBuf>,
}

impl OpaExecutor {
    #[must_use]
    pub fn new(binary: impl Into<String>, policies: Vec<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            policies,
            data: Vec::new(),
        }
    }

    /// Additional data documents, exposed to policies under `data`.
    #[must_use]
    pub fn with_data(mut self, data: Vec<PathBuf>) -> Self {
        self.data = data;
        self
    }

    fn command(&self, query: &str, ctx: &EvalContext<'_>, file_data: Option<&Path>) -> Command {
        let mut command = Command::new(&self.binary);
        command.args(["eval", "--format", "json", "--stdin-input"]);
        let paths = self.policies.iter().chain(&self.data).map(PathBuf::as_path);
        for path in paths.chain(file_data) {
            command.arg("--data").arg(path);
        }
        if ctx.trace {
            command.args(["--explain", "full"]);
        }
        if let Some(remaining) = ctx.remaining() {
            command
                .arg("--timeout")
                .arg(format!("{}ms", remaining.as_millis().max(1)));
        }
        command.arg(query);
        command
    }

    /// Run one query and parse the results.
    #[tracing::instrument(skip(self, input, ctx), level = "debug")]
    pub fn eval(
        &self,
        input: &Value,
        query: &str,
        ctx: &EvalContext<'_>,
    ) -> Result<QueryOutput> {
        let file_data = ctx.file.map(write_file_context).transpose()?;

        let mut child = self
            .command(query, ctx, file_data.as_ref().map(tempfile::NamedTempFile::path))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| OpaError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            let payload = serde_json::to_vec(input).map_err(|source| OpaError::Output {
                query: query.to_string(),
                source,
            })?;
            if let Err(source) = stdin.write_all(&payload) {
                // opa exits without reading stdin when it rejects its
                // arguments. Its exit status and stderr carry the real error.
                if source.kind() != io::ErrorKind::BrokenPipe {
                    return Err(OpaError::Spawn {
                        binary: self.binary.clone(),
                        source,
                    });
                }
                tracing::debug!("opa closed stdin before reading the input");
            }
        }

        let output = child.wait_with_output().map_err(|source| OpaError::Spawn {
            binary: self.binary.clone(),
            source,
        })?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(OpaError::Eval {
                query: query.to_string(),
                message: eval_error_message(&stdout, &stderr),
            });
        }

        let mut parsed = parse_eval_output(&stdout, query)?;
        parsed.outputs = stderr
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect();
        tracing::trace!(results = parsed.results.len(), "Query evaluated");
        Ok(parsed)
    }
}

impl QueryExecutor for OpaExecutor {
    fn execute(
        &self,
        input: &Value,
        query: &str,
        ctx: &EvalContext<'_>,
    ) -> std::result::Result<QueryOutput, ExecutorError> {
        self.eval(input, query, ctx).map_err(Into::into)
    }
}

/// Write `{"conftest": {"file": {...}}}` to a temporary data file.
fn write_file_context(file: &FileContext) -> Result<tempfile::NamedTempFile> {
    let mut data_file = tempfile::Builder::new()
        .prefix("conftest-file-")
        .suffix(".json")
        .tempfile()
        .map_err(OpaError::FileContext)?;
    let document = json!({
        "conftest": {
            "file": {
                "name": file.name,
                "dir": file.dir,
            }
        }
    });
    data_file
        .write_all(document.to_string().as_bytes())
        .map_err(OpaError::FileContext)?;
    Ok(data_file)
}

/// Parse the JSON printed by `opa eval --format json`.
///
/// For every result and every expression, a non-empty array value yields one
/// record per element and any other value yields a single passing record.
/// An empty result set yields no records.
pub fn parse_eval_output(stdout: &str, query: &str) -> Result<QueryOutput> {
    let document: Value = serde_json::from_str(stdout).map_err(|source| OpaError::Output {
        query: query.to_string(),
        source,
    })?;

    if let Some(errors) = document.get("errors") {
        return Err(OpaError::Eval {
            query: query.to_string(),
            message: format_errors(errors),
        });
    }

    let mut results = Vec::new();
    let expressions = document
        .get("result")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|result| result.get("expressions").and_then(Value::as_array))
        .flatten();

    for expression in expressions {
        let value = expression.get("value").cloned().unwrap_or(Value::Null);
        let Value::Array(values) = value else {
            results.push(PolicyResult::pass());
            continue;
        };
        if values.is_empty() {
            results.push(PolicyResult::pass());
            continue;
        }

        for value in values {
            match RuleOutput::from_value(value) {
                Ok(Some(output)) => results.push(output.into()),
                Ok(None) => tracing::warn!(query, "Ignoring rule output without a message"),
                Err(source) => {
                    return Err(OpaError::Result {
                        query: query.to_string(),
                        source,
                    })
                }
            }
        }
    }

    let traces = document
        .get("explanation")
        .and_then(Value::as_array)
        .map(|events| events.iter().map(format_trace_event).collect())
        .unwrap_or_default();

    Ok(QueryOutput {
        results,
        traces,
        outputs: Vec::new(),
    })
}

/// Render one `--explain` event as a single trace line.
pub(crate) fn format_trace_event(event: &Value) -> String {
    let op = event.get("op").and_then(Value::as_str).unwrap_or("?");
    let location = event.get("location").map(|location| {
        let file = location.get("file").and_then(Value::as_str).unwrap_or("");
        let row = location.get("row").and_then(Value::as_u64).unwrap_or(0);
        format!("{file}:{row}")
    });
    let detail = event
        .get("message")
        .and_then(Value::as_str)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
        .or_else(|| event.get("node").map(Value::to_string));

    let mut line = op.to_string();
    if let Some(location) = location {
        line.push(' ');
        line.push_str(&location);
    }
    if let Some(detail) = detail {
        line.push(' ');
        line.push_str(&detail);
    }
    line
}

fn format_errors(errors: &Value) -> String {
    let Some(errors) = errors.as_array() else {
        return errors.to_string();
    };
    errors
        .iter()
        .map(|error| {
            error
                .get("message")
                .and_then(Value::as_str)
                .map_or_else(|| error.to_string(), str::to_string)
        })
        .collect::<Vec<_>>()
        .join("; ")
}

pub(crate) fn eval_error_message(stdout: &str, stderr: &str) -> String {
    if let Ok(document) = serde_json::from_str::<Value>(stdout) {
        if let Some(errors) = document.get("errors") {
            return format_errors(errors);
        }
    }
    let stderr = stderr.trim();
    if stderr.is_empty() {
        stdout.trim().to_string()
    } else {
        stderr.to_string()
    }
}
