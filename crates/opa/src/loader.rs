//! Policy discovery and rule inventory construction.

use crate::error::{OpaError, Result};
use crate::scanner::{scan_module, ModuleOutline};
use conftest_engine::RuleInventory;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A Rego module found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyModule {
    pub path: PathBuf,
    pub outline: ModuleOutline,
}

/// Every policy module found under a set of policy paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicySet {
    modules: Vec<PolicyModule>,
}

impl PolicySet {
    #[must_use]
    pub fn modules(&self) -> &[PolicyModule] {
        &self.modules
    }

    /// Paths of every loaded module, in load order.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.modules.iter().map(|module| module.path.clone()).collect()
    }

    /// Build the rule inventory, module by module in load order.
    pub fn inventory(&self) -> Result<RuleInventory> {
        let mut builder = RuleInventory::builder();
        for module in &self.modules {
            for rule in &module.outline.rules {
                builder
                    .define(&module.outline.package, rule)
                    .map_err(|err| OpaError::Inventory {
                        path: module.path.clone(),
                        message: err.to_string(),
                    })?;
            }
        }
        Ok(builder.build())
    }
}

/// Find the policy files under `path`: every `.rego` file except tests.
///
/// Files are returned in a stable, name-sorted order. Empty policy files are
/// rejected.
#[tracing::instrument(fields(path = %path.display()))]
pub fn policy_files(path: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.map_err(|source| OpaError::Walk {
            path: path.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() || !is_policy_file(entry.path()) {
            continue;
        }

        let metadata = entry.metadata().map_err(|source| OpaError::Walk {
            path: entry.path().to_path_buf(),
            source,
        })?;
        if metadata.len() == 0 {
            return Err(OpaError::EmptyPolicy(entry.path().to_path_buf()));
        }

        tracing::trace!(file = %entry.path().display(), "Found policy file");
        files.push(entry.into_path());
    }

    Ok(files)
}

fn is_policy_file(path: &Path) -> bool {
    let is_rego = path.extension().is_some_and(|ext| ext == "rego");
    let is_test = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with("_test.rego"));
    is_rego && !is_test
}

/// Load and outline every policy under `paths`.
#[tracing::instrument(skip(paths), fields(paths = paths.len()))]
pub fn load_policies(paths: &[PathBuf]) -> Result<PolicySet> {
    let mut modules = Vec::new();

    for root in paths {
        for path in policy_files(root)? {
            let source = fs::read_to_string(&path).map_err(|source| OpaError::Io {
                path: path.clone(),
                source,
            })?;
            let outline =
                scan_module(&source).ok_or_else(|| OpaError::MissingPackage(path.clone()))?;
            tracing::debug!(
                file = %path.display(),
                package = %outline.package,
                rules = outline.rules.len(),
                "Loaded policy"
            );
            modules.push(PolicyModule { path, outline });
        }
    }

    if modules.is_empty() {
        return Err(OpaError::NoPolicies(paths.to_vec()));
    }

    tracing::info!(modules = modules.len(), "Policies loaded");
    Ok(PolicySet { modules })
}
