//! Exit codes for the conftest CLI.
//!
//! Operational errors (unreadable files, broken policies, a missing `opa`
//! binary) are reported by `main` returning an error, which exits with 1.

use conftest_types::CheckSummary;

/// Exit codes for a completed policy run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Every policy passed
    Success = 0,
    /// Failures were found, or warnings with `--fail-on-warn`
    PolicyFailure = 1,
    /// Failures were found with `--fail-on-warn`
    StrictFailure = 2,
}

impl ExitCode {
    /// The exit code for a run with the given totals.
    #[must_use]
    pub const fn from_summary(summary: &CheckSummary, fail_on_warn: bool) -> Self {
        match summary.exit_code(fail_on_warn) {
            0 => Self::Success,
            1 => Self::PolicyFailure,
            _ => Self::StrictFailure,
        }
    }

    /// Exit the process with this exit code.
    pub fn exit(self) -> ! {
        std::process::exit(self as i32)
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::PolicyFailure => write!(f, "policy failure"),
            Self::StrictFailure => write!(f, "policy failure (fail on warn)"),
        }
    }
}
