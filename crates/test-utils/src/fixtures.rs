//! Common policy setups.

use crate::executor::ScriptedExecutor;
use conftest_engine::{InputDocument, RuleInventory};
use conftest_types::PolicyResult;
use serde_json::Value;

/// Build an inventory from `(namespace, rule)` definitions.
///
/// Repeat a pair to define the same rule name more than once.
///
/// # Panics
///
/// Panics on an empty namespace or rule name.
#[must_use]
pub fn inventory(definitions: &[(&str, &str)]) -> RuleInventory {
    let mut builder = RuleInventory::builder();
    for (namespace, rule) in definitions {
        builder
            .define(namespace, rule)
            .unwrap_or_else(|err| panic!("invalid fixture definition: {err}"));
    }
    builder.build()
}

/// An input document at `path`.
#[must_use]
pub fn document(path: &str, value: Value) -> InputDocument {
    InputDocument::new(path, value)
}

/// The message produced by [`latest_tag_policy`].
pub const LATEST_TAG_MESSAGE: &str = "image uses the latest tag";

/// `data.main.deny` fails documents whose `image` ends in `:latest`.
#[must_use]
pub fn latest_tag_policy() -> ScriptedExecutor {
    ScriptedExecutor::new().on_input("data.main.deny", |input| {
        let latest = input
            .get("image")
            .and_then(Value::as_str)
            .is_some_and(|image| image.ends_with(":latest"));
        if latest {
            vec![PolicyResult::new(LATEST_TAG_MESSAGE)]
        } else {
            Vec::new()
        }
    })
}
