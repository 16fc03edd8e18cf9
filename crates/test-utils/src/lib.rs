//! Shared test utilities for conftest crates.
//!
//! - [`ScriptedExecutor`]: an in-memory query backend with scripted answers
//!   and a call log
//! - [`inventory`] and the [`fixtures`] module for common policy setups
//! - [`format_check_result`] for readable snapshots

pub mod assertions;
pub mod executor;
pub mod fixtures;

pub use assertions::{format_check_result, format_check_results};
pub use executor::{ScriptedExecutor, ScriptedError};
pub use fixtures::{document, inventory};

// Re-export insta so dependents share one version.
pub use insta;
