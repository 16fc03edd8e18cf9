use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

/// Settings for a `conftest test` run.
///
/// Every field has a default, so an empty file is a valid configuration.
/// List fields accept either a single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct RunConfig {
    /// Policy files or directories.
    #[serde(deserialize_with = "one_or_many")]
    pub policy: Vec<String>,
    /// Additional data files or directories.
    #[serde(deserialize_with = "one_or_many")]
    pub data: Vec<String>,
    /// Namespaces to check, unless `all-namespaces` is set.
    #[serde(deserialize_with = "one_or_many")]
    pub namespace: Vec<String>,
    pub all_namespaces: bool,
    pub combine: bool,
    pub trace: bool,
    pub fail_on_warn: bool,
    pub opa: OpaConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            policy: vec!["policy".to_string()],
            data: Vec::new(),
            namespace: vec!["main".to_string()],
            all_namespaces: false,
            combine: false,
            trace: false,
            fail_on_warn: false,
            opa: OpaConfig::default(),
        }
    }
}

impl RunConfig {
    /// Evaluation timeout for a whole run, if configured.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.opa.timeout_secs.map(Duration::from_secs)
    }
}

/// How to reach the `opa` binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct OpaConfig {
    pub binary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for OpaConfig {
    fn default() -> Self {
        Self {
            binary: "opa".to_string(),
            timeout_secs: None,
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}
