mod commands;
mod documents;
mod exit_code;
mod output;
mod progress;

pub use exit_code::ExitCode;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[allow(clippy::struct_excessive_bools)]
#[command(name = "conftest")]
#[command(about = "Test configuration files against Rego policies", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to conftest config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Force colored output even when not a TTY
    #[arg(long, global = true, conflicts_with = "no_color")]
    color: bool,

    /// Disable colored output
    #[arg(long, global = true, conflicts_with = "color")]
    no_color: bool,

    /// Suppress all output except results and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Suppress progress indicators (spinners)
    #[arg(long, global = true)]
    no_progress: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output verbosity options
#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    /// Whether to show progress indicators (spinners)
    pub show_progress: bool,
    /// Whether to show informational output (loaded policies, config path)
    pub show_info: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Test configuration files against policies
    ///
    /// Each file is checked against every selected namespace. Exits with 1
    /// when any policy fails, or with 2 for failures and 1 for warnings when
    /// --fail-on-warn is set.
    Test(commands::test::TestArgs),

    /// Run the unit tests (`test_` rules) of the policies with `opa test`
    ///
    /// Exits with 1 when any test fails.
    Verify(commands::verify::VerifyArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with colors
    Human,
    /// JSON output for tooling
    Json,
    /// GitHub Actions workflow commands for PR annotations
    Github,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing();
    configure_colors(cli.color, cli.no_color);

    let output_opts = OutputOptions {
        show_progress: !cli.quiet && !cli.no_progress,
        show_info: !cli.quiet,
    };

    let exit_code = match cli.command {
        Commands::Test(args) => commands::test::run(&args, cli.config, output_opts)?,
        Commands::Verify(args) => commands::verify::run(&args, cli.config, output_opts)?,
    };

    if exit_code != ExitCode::Success {
        exit_code.exit();
    }
    Ok(())
}

/// Initialize tracing, controlled by `RUST_LOG` and off by default
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("off")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Apply the color flags, falling back to `NO_COLOR` and the `CLICOLOR`
/// conventions. Without any of them `colored` decides from the terminal.
fn configure_colors(force_color: bool, no_color: bool) {
    if let Some(enabled) = color_override(force_color, no_color, |name| std::env::var(name).ok()) {
        colored::control::set_override(enabled);
    }
}

/// Flags win over the environment, and `NO_COLOR` wins over
/// `CLICOLOR_FORCE`. See <https://no-color.org/> and
/// <https://bixense.com/clicolors/>.
fn color_override(
    force_color: bool,
    no_color: bool,
    env: impl Fn(&str) -> Option<String>,
) -> Option<bool> {
    if force_color {
        return Some(true);
    }
    if no_color || env("NO_COLOR").is_some() {
        return Some(false);
    }
    if let Some(value) = env("CLICOLOR_FORCE") {
        return (!value.is_empty() && value != "0").then_some(true);
    }
    env("CLICOLOR").filter(|value| value == "0").map(|_| false)
}
