use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const CI_VARIABLES: &[&str] = &[
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "BUILDKITE",
    "JENKINS_URL",
];

fn is_ci() -> bool {
    CI_VARIABLES
        .iter()
        .any(|name| std::env::var_os(name).is_some())
}

/// A spinner shown on stderr while a slow step runs.
///
/// Hidden when disabled or when running in CI. The spinner is cleared when
/// dropped, so an early `?` return leaves no stale frame behind.
pub struct Spinner(Option<ProgressBar>);

impl Spinner {
    #[must_use]
    pub fn start(enabled: bool, message: &str) -> Self {
        if !enabled || is_ci() {
            return Self(None);
        }

        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
        {
            bar.set_style(style);
        }
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        Self(Some(bar))
    }

    pub fn set_message(&self, message: &str) {
        if let Some(bar) = &self.0 {
            bar.set_message(message.to_string());
        }
    }

    pub fn finish(mut self) {
        self.clear();
    }

    fn clear(&mut self) {
        if let Some(bar) = self.0.take() {
            bar.finish_and_clear();
        }
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_spinner_is_hidden() {
        let spinner = Spinner::start(false, "Loading policies...");
        assert!(spinner.0.is_none());
        spinner.finish();
    }

    #[test]
    fn test_dropped_spinner_is_cleared() {
        let bar = ProgressBar::hidden();
        let spinner = Spinner(Some(bar.clone()));
        spinner.set_message("Loading policies...");

        assert!(!bar.is_finished());
        drop(spinner);
        assert!(bar.is_finished());
    }

    #[test]
    fn test_spinner_lifecycle() {
        let spinner = Spinner::start(true, "Loading policies...");
        spinner.set_message("Evaluating...");
        spinner.finish();
    }
}
