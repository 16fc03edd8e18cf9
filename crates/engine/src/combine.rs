use crate::engine::InputDocument;
use serde_json::{json, Value};

/// Merge every input document into the single value checked in combined
/// mode: an array of `{"path": ..., "contents": ...}` objects, in input order.
#[must_use]
pub fn combine_documents(documents: &[InputDocument]) -> Value {
    Value::Array(
        documents
            .iter()
            .map(|doc| json!({ "path": doc.path, "contents": doc.value }))
            .collect(),
    )
}
