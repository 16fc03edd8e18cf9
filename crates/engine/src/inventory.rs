//! Rule inventory: which rules each namespace defines, and how often.
//!
//! A rule name may be defined by several bodies (for example two
//! `deny[msg] { ... }` blocks in one package). Queries are issued once per
//! distinct name, but every definition counts towards the number of outcomes
//! expected for a document.

use crate::error::{EngineError, Result};
use conftest_types::{classify, RuleClass};

/// A distinct rule name within a namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleEntry {
    pub name: String,
    pub class: RuleClass,
    /// Number of rule bodies defining this name.
    pub definitions: usize,
}

/// The rules defined in one namespace, in first-definition order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceRules {
    pub namespace: String,
    rules: Vec<RuleEntry>,
}

impl NamespaceRules {
    pub(crate) fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            rules: Vec::new(),
        }
    }

    fn define(&mut self, rule: &str) {
        if let Some(entry) = self.rules.iter_mut().find(|entry| entry.name == rule) {
            entry.definitions += 1;
            return;
        }

        self.rules.push(RuleEntry {
            name: rule.to_string(),
            class: classify(rule),
            definitions: 1,
        });
    }

    /// Every rule name defined in the namespace, evaluated or not.
    #[must_use]
    pub fn all(&self) -> &[RuleEntry] {
        &self.rules
    }

    /// Rules that take part in evaluation (failure and warning classes).
    pub fn evaluated(&self) -> impl Iterator<Item = &RuleEntry> {
        self.rules.iter().filter(|entry| entry.class.is_evaluated())
    }

    /// Total number of evaluated rule bodies.
    #[must_use]
    pub fn definition_count(&self) -> usize {
        self.evaluated().map(|entry| entry.definitions).sum()
    }
}

/// Rules grouped by namespace, in the order namespaces were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleInventory {
    namespaces: Vec<NamespaceRules>,
}

impl RuleInventory {
    #[must_use]
    pub fn builder() -> RuleInventoryBuilder {
        RuleInventoryBuilder::default()
    }

    /// Rules for an exact namespace, if any were loaded.
    #[must_use]
    pub fn namespace(&self, namespace: &str) -> Option<&NamespaceRules> {
        self.namespaces.iter().find(|ns| ns.namespace == namespace)
    }

    /// All namespaces, deduplicated case-insensitively, keeping the first
    /// spelling seen.
    #[must_use]
    pub fn namespaces(&self) -> Vec<String> {
        let mut namespaces: Vec<String> = Vec::new();
        for ns in &self.namespaces {
            if namespaces
                .iter()
                .any(|seen| seen.eq_ignore_ascii_case(&ns.namespace))
            {
                continue;
            }
            namespaces.push(ns.namespace.clone());
        }
        namespaces
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }
}

/// Collects rule definitions reported by a policy loader.
#[derive(Debug, Default)]
pub struct RuleInventoryBuilder {
    inventory: RuleInventory,
}

impl RuleInventoryBuilder {
    /// Record one rule body named `rule` in `namespace`.
    pub fn define(&mut self, namespace: &str, rule: &str) -> Result<&mut Self> {
        if namespace.trim().is_empty() {
            return Err(EngineError::Inventory(format!(
                "rule `{rule}` has an empty namespace"
            )));
        }
        if rule.trim().is_empty() {
            return Err(EngineError::Inventory(format!(
                "namespace `{namespace}` contains a rule with an empty name"
            )));
        }

        let namespaces = &mut self.inventory.namespaces;
        let index = if let Some(index) = namespaces.iter().position(|ns| ns.namespace == namespace)
        {
            index
        } else {
            namespaces.push(NamespaceRules::new(namespace));
            namespaces.len() - 1
        };
        namespaces[index].define(rule);

        Ok(self)
    }

    #[must_use]
    pub fn build(self) -> RuleInventory {
        self.inventory
    }
}
