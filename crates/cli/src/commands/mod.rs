pub mod verify;

use anyhow::{Context, Result};
use conftest_config::{find_config, load_config, RunConfig};
use std::path::{Path, PathBuf};

/// Load the config file and the directory its relative paths resolve against.
///
/// Without an explicit path the nearest config file above the current
/// directory is used, or the defaults when there is none.
fn load_run_config(config_path: Option<PathBuf>) -> Result<(RunConfig, PathBuf)> {
    let cwd = std::env::current_dir().context("failed to read the current directory")?;
    let path = match config_path {
        Some(path) => Some(path),
        None => find_config(&cwd)?,
    };

    let Some(path) = path else {
        tracing::debug!("No config file, using defaults");
        return Ok((RunConfig::default(), cwd));
    };

    let config =
        load_config(&path).with_context(|| format!("failed to load {}", path.display()))?;
    let base_dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map_or(cwd, Path::to_path_buf);
    Ok((config, base_dir))
}

/// Paths from the command line win. Otherwise the configured paths apply,
/// relative to the config file's directory.
fn resolve_paths(flags: &[PathBuf], configured: &[String], base_dir: &Path) -> Vec<PathBuf> {
    if flags.is_empty() {
        configured.iter().map(|path| base_dir.join(path)).collect()
    } else {
        flags.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_paths() {
        let configured = vec!["policy".to_string(), "shared/policy".to_string()];
        assert_eq!(
            resolve_paths(&[], &configured, Path::new("/repo")),
            vec![PathBuf::from("/repo/policy"), PathBuf::from("/repo/shared/policy")]
        );
        assert_eq!(
            resolve_paths(&[PathBuf::from("rules")], &configured, Path::new("/repo")),
            vec![PathBuf::from("rules")]
        );
    }

    #[test]
    fn test_load_run_config_resolves_relative_to_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conftest.toml");
        std::fs::write(&path, "policy = \"checks\"\n").unwrap();

        let (config, base_dir) = load_run_config(Some(path)).unwrap();
        assert_eq!(config.policy, vec!["checks"]);
        assert_eq!(base_dir, dir.path());
    }
}
