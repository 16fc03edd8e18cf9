//! Rendering of check results.

use crate::OutputFormat;
use colored::Colorize;
use conftest_types::{CheckResult, CheckSummary, PolicyResult};
use std::io::{self, Write};

/// Write `results` in the requested format.
pub fn render<W: Write>(
    writer: &mut W,
    format: OutputFormat,
    results: &[CheckResult],
    trace: bool,
) -> io::Result<()> {
    match format {
        OutputFormat::Human => write_human(writer, results, trace),
        OutputFormat::Json => write_json(writer, results, trace),
        OutputFormat::Github => write_github(writer, results),
    }
}

fn write_records<W: Write>(
    writer: &mut W,
    label: &colored::ColoredString,
    result: &CheckResult,
    records: &[PolicyResult],
) -> io::Result<()> {
    for record in records {
        writeln!(
            writer,
            "{label} - {} - {} - {}",
            result.file_name, result.namespace, record.message
        )?;
    }
    Ok(())
}

fn write_human<W: Write>(writer: &mut W, results: &[CheckResult], trace: bool) -> io::Result<()> {
    for result in results {
        for query in &result.queries {
            for output in &query.outputs {
                writeln!(writer, "{} - {} - {output}", "PRNT".dimmed(), result.file_name)?;
            }

            if trace {
                writeln!(writer, "file: {} | query: {}", result.file_name, query.query)?;
                for line in &query.traces {
                    writeln!(writer, "{} - {line}", "TRAC".dimmed())?;
                }
                writeln!(writer)?;
            }
        }

        write_records(writer, &"WARN".yellow(), result, &result.warnings)?;
        write_records(writer, &"FAIL".red(), result, &result.failures)?;
        write_records(writer, &"EXCP".cyan(), result, &result.exceptions)?;
    }

    let summary = CheckSummary::from_results(results);
    let line = summary.to_string();
    let line = if summary.failures > 0 {
        line.red()
    } else if summary.warnings > 0 {
        line.yellow()
    } else if summary.exceptions > 0 {
        line.cyan()
    } else {
        line.green()
    };

    writeln!(writer)?;
    writeln!(writer, "{line}")
}

fn write_json<W: Write>(writer: &mut W, results: &[CheckResult], trace: bool) -> io::Result<()> {
    let rendered = if trace {
        serde_json::to_string_pretty(results)
    } else {
        let stripped: Vec<CheckResult> = results
            .iter()
            .map(|result| CheckResult {
                queries: Vec::new(),
                ..result.clone()
            })
            .collect();
        serde_json::to_string_pretty(&stripped)
    }
    .map_err(io::Error::other)?;

    writeln!(writer, "{rendered}")
}

/// GitHub Actions workflow commands, one group per result.
fn write_github<W: Write>(writer: &mut W, results: &[CheckResult]) -> io::Result<()> {
    for result in results {
        let file = &result.file_name;
        writeln!(
            writer,
            "::group::Testing \"{file}\" against {} policies in namespace \"{}\"",
            result.total(),
            result.namespace
        )?;

        for failure in &result.failures {
            writeln!(writer, "::error file={file},line=1::{}", failure.message)?;
        }
        for warning in &result.warnings {
            writeln!(writer, "::warning file={file},line=1::{}", warning.message)?;
        }
        for exception in &result.exceptions {
            writeln!(writer, "::notice file={file},line=1::{}", exception.message)?;
        }
        for skipped in &result.skipped {
            writeln!(
                writer,
                "::notice file={file},line=1::Test was skipped: {}",
                skipped.message
            )?;
        }
        if result.successes > 0 {
            writeln!(
                writer,
                "::notice file={file},line=1::Number of successful checks: {}",
                result.successes
            )?;
        }

        writeln!(writer, "::endgroup::")?;
    }

    writeln!(writer, "{}", CheckSummary::from_results(results))
}
