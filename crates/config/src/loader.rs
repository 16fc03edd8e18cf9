use crate::{ConfigError, Result, RunConfig};
use std::fs;
use std::path::{Path, PathBuf};

/// Config file names to search for, in order of preference
pub const CONFIG_FILES: &[&str] = &[
    "conftest.toml",
    ".conftest.yaml",
    ".conftest.yml",
    ".conftest.json",
];

/// Find a conftest config file by walking up the directory tree from the given start directory.
/// Returns the path to the config file if found.
#[tracing::instrument(fields(start = %start_dir.display()))]
pub fn find_config(start_dir: &Path) -> Result<Option<PathBuf>> {
    let mut current_dir = start_dir.to_path_buf();
    let mut checked_dirs = 0;

    loop {
        tracing::trace!(dir = %current_dir.display(), "Checking directory for config files");
        for file_name in CONFIG_FILES {
            let config_path = current_dir.join(file_name);
            if config_path.is_file() {
                tracing::info!(path = %config_path.display(), checked_dirs, "Found config file");
                return Ok(Some(config_path));
            }
        }

        checked_dirs += 1;
        if !current_dir.pop() {
            tracing::debug!(checked_dirs, "No config file found");
            break;
        }
    }

    Ok(None)
}

/// Load a conftest config from the specified path.
/// Automatically detects the format based on file extension.
#[tracing::instrument(fields(path = %path.display()))]
pub fn load_config(path: &Path) -> Result<RunConfig> {
    tracing::debug!("Reading config file");
    let contents = fs::read_to_string(path)?;
    let config = load_config_from_str(&contents, path)?;
    tracing::info!(
        policies = config.policy.len(),
        namespaces = config.namespace.len(),
        "Config loaded successfully"
    );
    Ok(config)
}

/// Load a conftest config from a string.
/// The path is used for error messages and format detection.
#[tracing::instrument(skip(contents), fields(path = %path.display(), size = contents.len()))]
pub fn load_config_from_str(contents: &str, path: &Path) -> Result<RunConfig> {
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");
    tracing::debug!(extension, "Detecting config format");

    let config = match extension {
        "toml" => parse_toml(contents, path)?,
        "yml" | "yaml" => parse_yaml(contents, path)?,
        "json" => parse_json(contents, path)?,
        _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    };

    tracing::debug!("Validating config");
    validate_config(&config, path)?;

    Ok(config)
}

fn parse_toml(contents: &str, path: &Path) -> Result<RunConfig> {
    toml::from_str(contents).map_err(|e| ConfigError::Invalid {
        path: path.to_path_buf(),
        message: format!("TOML parse error: {e}"),
    })
}

fn parse_yaml(contents: &str, path: &Path) -> Result<RunConfig> {
    // An empty YAML file deserializes as null rather than an empty mapping.
    if contents.trim().is_empty() {
        return Ok(RunConfig::default());
    }
    serde_yaml::from_str(contents).map_err(|e| ConfigError::Invalid {
        path: path.to_path_buf(),
        message: format!("YAML parse error: {e}"),
    })
}

fn parse_json(contents: &str, path: &Path) -> Result<RunConfig> {
    serde_json::from_str(contents).map_err(|e| ConfigError::Invalid {
        path: path.to_path_buf(),
        message: format!("JSON parse error: {e}"),
    })
}

/// Validate the loaded configuration
#[tracing::instrument(skip(config, path), fields(path = %path.display()))]
fn validate_config(config: &RunConfig, path: &Path) -> Result<()> {
    let invalid = |message: &str| ConfigError::Invalid {
        path: path.to_path_buf(),
        message: message.to_string(),
    };

    if config.policy.is_empty() {
        return Err(invalid("at least one policy path is required"));
    }
    if config.policy.iter().any(|policy| policy.trim().is_empty()) {
        return Err(invalid("policy paths must not be empty"));
    }
    if config.data.iter().any(|data| data.trim().is_empty()) {
        return Err(invalid("data paths must not be empty"));
    }

    if config.namespace.is_empty() && !config.all_namespaces {
        return Err(invalid(
            "at least one namespace is required unless all-namespaces is set",
        ));
    }
    if config.namespace.iter().any(|ns| ns.trim().is_empty()) {
        return Err(invalid("namespaces must not be empty"));
    }

    if config.opa.binary.trim().is_empty() {
        return Err(invalid("opa.binary must not be empty"));
    }
    if config.opa.timeout_secs == Some(0) {
        return Err(invalid("opa.timeout-secs must be greater than zero"));
    }

    tracing::debug!("Config validation passed");
    Ok(())
}
