use super::{load_run_config, resolve_paths};
use crate::output::render;
use crate::progress::Spinner;
use crate::{ExitCode, OutputFormat, OutputOptions};
use anyhow::{Context, Result};
use clap::Args;
use conftest_opa::OpaTester;
use conftest_types::CheckSummary;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Policy files or directories, including their `_test.rego` files
    /// [default: policy]
    #[arg(short, long, value_name = "PATH")]
    pub policy: Vec<PathBuf>,

    /// Data files or directories the tests read under `data`
    #[arg(short, long, value_name = "PATH")]
    pub data: Vec<PathBuf>,

    /// Include evaluation traces in the output
    #[arg(long)]
    pub trace: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    pub output: OutputFormat,
}

/// Run the policies' unit tests. Any failing test exits with 1.
#[tracing::instrument(skip(args, output_opts))]
pub fn run(
    args: &VerifyArgs,
    config_path: Option<PathBuf>,
    output_opts: OutputOptions,
) -> Result<ExitCode> {
    let (config, base_dir) = load_run_config(config_path)?;
    let mut paths = resolve_paths(&args.policy, &config.policy, &base_dir);
    paths.extend(resolve_paths(&args.data, &config.data, &base_dir));
    let trace = args.trace || config.trace;

    let spinner = Spinner::start(
        args.output == OutputFormat::Human && output_opts.show_progress,
        "Running policy tests...",
    );
    let results = OpaTester::new(&config.opa.binary, paths).run(trace)?;
    spinner.finish();

    let mut stdout = std::io::stdout().lock();
    render(&mut stdout, args.output, &results, trace).context("failed to write results")?;

    let exit_code = ExitCode::from_summary(&CheckSummary::from_results(&results), false);
    tracing::debug!(%exit_code, tests = results.len(), "Verification complete");
    Ok(exit_code)
}
