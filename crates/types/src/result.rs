//! Policy results and query records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Metadata attached to a structured rule output (every key except `msg`).
pub type Metadata = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResultError {
    #[error("rule output is missing the `msg` field: {0}")]
    MissingMessage(String),

    #[error("rule output `msg` field must be a string, got: {0}")]
    InvalidMessage(String),
}

/// The value a rule produced, as returned by the query backend.
///
/// Rules either emit plain strings (`deny[msg]`) or objects carrying a `msg`
/// plus arbitrary metadata (`deny[{"msg": msg, "id": "K8S-001"}]`).
#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutput {
    Plain(String),
    Structured { message: String, metadata: Metadata },
}

impl RuleOutput {
    /// Interpret a raw value produced by a rule.
    ///
    /// Returns `Ok(None)` for values that are neither strings nor objects; those
    /// carry no message and are not reported.
    pub fn from_value(value: serde_json::Value) -> Result<Option<Self>, ResultError> {
        match value {
            serde_json::Value::String(message) => Ok(Some(Self::Plain(message))),
            serde_json::Value::Object(mut fields) => {
                let message = match fields.remove("msg") {
                    Some(serde_json::Value::String(message)) => message,
                    Some(other) => return Err(ResultError::InvalidMessage(other.to_string())),
                    None => {
                        return Err(ResultError::MissingMessage(
                            serde_json::Value::Object(fields).to_string(),
                        ))
                    }
                };
                Ok(Some(Self::Structured {
                    message,
                    metadata: fields.into_iter().collect(),
                }))
            }
            _ => Ok(None),
        }
    }
}

/// One outcome unit. A result passes when its message is empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyResult {
    #[serde(rename = "msg")]
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,
}

impl PolicyResult {
    /// A passing result with no message.
    #[must_use]
    pub fn pass() -> Self {
        Self::default()
    }

    /// A result with the given message and no metadata.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            metadata: Metadata::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.message.is_empty()
    }
}

impl From<RuleOutput> for PolicyResult {
    fn from(output: RuleOutput) -> Self {
        match output {
            RuleOutput::Plain(message) => Self::new(message),
            RuleOutput::Structured { message, metadata } => Self { message, metadata },
        }
    }
}

/// The record of evaluating one query against one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub query: String,
    pub results: Vec<PolicyResult>,
    #[serde(default)]
    pub traces: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
}

impl QueryResult {
    /// Returns true when every result of the query passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.results.iter().all(PolicyResult::passed)
    }
}
