//! Open Policy Agent backend for conftest.
//!
//! Policies are discovered on disk and outlined with [`load_policies`], which
//! yields the rule inventory the engine needs. Queries are evaluated by
//! [`OpaExecutor`], which runs `opa eval` for each query. Policy unit tests
//! run through [`OpaTester`].

mod error;
mod executor;
mod loader;
mod scanner;
mod verify;

pub use error::{OpaError, Result};
pub use executor::{parse_eval_output, OpaExecutor};
pub use loader::{load_policies, policy_files, PolicyModule, PolicySet};
pub use scanner::{scan_module, ModuleOutline};
pub use verify::{parse_test_output, OpaTester};
