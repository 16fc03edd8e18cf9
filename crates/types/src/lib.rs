//! Foundation types for conftest.
//!
//! This crate provides the data model shared by the evaluation engine, the
//! query backends and the output layer.
//!
//! # Type Categories
//!
//! - **Rule classes**: [`RuleClass`], [`classify`], [`base_rule_name`]
//! - **Results**: [`PolicyResult`], [`RuleOutput`], [`QueryResult`]
//! - **Reports**: [`CheckResult`], [`CheckSummary`]

mod check;
mod result;
mod rule_class;

pub use check::{CheckResult, CheckSummary, COMBINED_FILE_NAME};
pub use result::{Metadata, PolicyResult, QueryResult, ResultError, RuleOutput};
pub use rule_class::{base_rule_name, classify, RuleClass};
