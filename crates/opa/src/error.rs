use conftest_types::ResultError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OpaError>;

#[derive(Debug, Error)]
pub enum OpaError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("no policies found in {0:?}")]
    NoPolicies(Vec<PathBuf>),

    #[error("empty policy found in {0}")]
    EmptyPolicy(PathBuf),

    #[error("policy {0} has no package declaration")]
    MissingPackage(PathBuf),

    #[error("invalid rule in {path}: {message}")]
    Inventory { path: PathBuf, message: String },

    #[error("failed to run `{binary}`: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write the file context: {0}")]
    FileContext(#[source] std::io::Error),

    #[error("opa eval failed for `{query}`: {message}")]
    Eval { query: String, message: String },

    #[error("unexpected opa output for `{query}`: {source}")]
    Output {
        query: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid result for `{query}`: {source}")]
    Result {
        query: String,
        #[source]
        source: ResultError,
    },
}
