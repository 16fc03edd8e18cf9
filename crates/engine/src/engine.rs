//! Orchestration across documents, sub-documents and namespaces.

use crate::aggregator::check_document;
use crate::combine::combine_documents;
use crate::error::Result;
use crate::executor::{EvalContext, FileContext, QueryExecutor};
use crate::inventory::{NamespaceRules, RuleInventory};
use conftest_types::{CheckResult, COMBINED_FILE_NAME};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;

/// A parsed input file.
///
/// A file holding several documents (a multi-document YAML stream, for
/// example) is represented as an array value.
#[derive(Debug, Clone, PartialEq)]
pub struct InputDocument {
    pub path: String,
    pub value: serde_json::Value,
}

impl InputDocument {
    #[must_use]
    pub fn new(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            path: path.into(),
            value,
        }
    }
}

/// Which namespaces a run checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceSelection {
    /// Exactly these namespaces, in this order.
    Explicit(Vec<String>),
    /// Every namespace in the rule inventory.
    All,
}

impl Default for NamespaceSelection {
    fn default() -> Self {
        Self::Explicit(vec!["main".to_string()])
    }
}

/// Settings for [`Engine::run`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub namespaces: NamespaceSelection,
    /// Check all documents together as one `Combined` document.
    pub combine: bool,
    /// Ask the backend for evaluation traces.
    pub trace: bool,
    /// Abort the run once this instant has passed.
    pub deadline: Option<Instant>,
}

/// Evaluates documents against the rules of a policy inventory.
///
/// The engine owns no mutable state, so one instance can serve any number of
/// runs.
#[derive(Clone)]
pub struct Engine {
    executor: Arc<dyn QueryExecutor>,
    inventory: RuleInventory,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("inventory", &self.inventory)
            .finish_non_exhaustive()
    }
}

impl Engine {
    #[must_use]
    pub fn new(executor: Arc<dyn QueryExecutor>, inventory: RuleInventory) -> Self {
        Self {
            executor,
            inventory,
        }
    }

    #[must_use]
    pub const fn inventory(&self) -> &RuleInventory {
        &self.inventory
    }

    /// Namespaces defined by the loaded policies, in first-seen order.
    #[must_use]
    pub fn namespaces(&self) -> Vec<String> {
        self.inventory.namespaces()
    }

    /// A namespace without loaded rules checks nothing, but still yields
    /// one (empty) result per document.
    fn rules_for(&self, namespace: &str) -> Cow<'_, NamespaceRules> {
        self.inventory.namespace(namespace).map_or_else(
            || {
                tracing::debug!(namespace, "Namespace has no rules");
                Cow::Owned(NamespaceRules::new(namespace))
            },
            Cow::Borrowed,
        )
    }

    /// Check each document against `namespace`, one result per document.
    ///
    /// Array values are checked element by element and merged back into a
    /// single result carrying the document's path.
    #[tracing::instrument(skip(self, documents, ctx), fields(documents = documents.len()))]
    pub fn check(
        &self,
        documents: &[InputDocument],
        namespace: &str,
        ctx: &EvalContext<'_>,
    ) -> Result<Vec<CheckResult>> {
        let rules = self.rules_for(namespace);

        documents
            .iter()
            .map(|doc| {
                self.check_file(doc, &rules, ctx)
                    .map_err(|err| err.in_document(&doc.path, namespace))
            })
            .collect()
    }

    fn check_file(
        &self,
        doc: &InputDocument,
        rules: &NamespaceRules,
        ctx: &EvalContext<'_>,
    ) -> Result<CheckResult> {
        let file = FileContext::from_path(&doc.path);
        let ctx = ctx.for_file(file.as_ref());

        let serde_json::Value::Array(documents) = &doc.value else {
            return check_document(self.executor.as_ref(), &doc.value, &doc.path, rules, &ctx);
        };

        tracing::debug!(
            file = %doc.path,
            sub_documents = documents.len(),
            "Checking multi-document file"
        );
        let mut merged = CheckResult::new(doc.path.as_str(), rules.namespace.as_str());
        for sub_document in documents {
            let result =
                check_document(self.executor.as_ref(), sub_document, &doc.path, rules, &ctx)?;
            merged.merge(result);
        }
        Ok(merged)
    }

    /// Check one already-combined document against `namespace`.
    ///
    /// The value is evaluated as a whole, even when it is an array, and the
    /// result is reported under the `Combined` file name.
    #[tracing::instrument(skip(self, combined, ctx))]
    pub fn check_combined(
        &self,
        combined: &serde_json::Value,
        namespace: &str,
        ctx: &EvalContext<'_>,
    ) -> Result<CheckResult> {
        let rules = self.rules_for(namespace);

        let ctx = ctx.for_file(None);
        check_document(
            self.executor.as_ref(),
            combined,
            COMBINED_FILE_NAME,
            &rules,
            &ctx,
        )
        .map_err(|err| err.in_document(COMBINED_FILE_NAME, namespace))
    }

    /// Check every document against every selected namespace.
    ///
    /// Results are ordered by namespace first, then by document. The first
    /// operational error aborts the run.
    #[tracing::instrument(skip(self, documents, options), fields(documents = documents.len(), combine = options.combine))]
    pub fn run(
        &self,
        documents: &[InputDocument],
        options: &RunOptions,
    ) -> Result<Vec<CheckResult>> {
        let namespaces = match &options.namespaces {
            NamespaceSelection::Explicit(namespaces) => namespaces.clone(),
            NamespaceSelection::All => self.namespaces(),
        };
        tracing::debug!(namespaces = ?namespaces, "Starting run");

        let ctx = EvalContext::new(options.trace, options.deadline);
        let combined = options.combine.then(|| combine_documents(documents));

        let mut results = Vec::new();
        for namespace in &namespaces {
            if let Some(combined) = &combined {
                results.push(self.check_combined(combined, namespace, &ctx)?);
            } else {
                results.extend(self.check(documents, namespace, &ctx)?);
            }
        }

        tracing::debug!(results = results.len(), "Run complete");
        Ok(results)
    }
}
