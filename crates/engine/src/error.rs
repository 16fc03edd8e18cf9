use crate::executor::ExecutorError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Operational failures. Policy violations are never reported through this type.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("query `{query}` failed: {source}")]
    Query {
        query: String,
        #[source]
        source: ExecutorError,
    },

    #[error("evaluation deadline exceeded before query `{query}`")]
    DeadlineExceeded { query: String },

    #[error("invalid rule inventory: {0}")]
    Inventory(String),

    #[error("checking `{file}` against namespace `{namespace}`: {source}")]
    Document {
        file: String,
        namespace: String,
        #[source]
        source: Box<EngineError>,
    },
}

impl EngineError {
    /// Attach the document and namespace being checked.
    #[must_use]
    pub fn in_document(self, file: &str, namespace: &str) -> Self {
        Self::Document {
            file: file.to_string(),
            namespace: namespace.to_string(),
            source: Box::new(self),
        }
    }
}
