//! Rule evaluation and aggregation for conftest.
//!
//! The engine turns a [`RuleInventory`] and a set of parsed documents into
//! [`CheckResult`](conftest_types::CheckResult)s. Policies themselves are
//! evaluated by a [`QueryExecutor`] backend.
//!
//! ```rust,ignore
//! use conftest_engine::prelude::*;
//!
//! let engine = Engine::new(executor, inventory);
//! let results = engine.run(&documents, &RunOptions::default())?;
//! ```

mod aggregator;
mod combine;
mod engine;
mod error;
mod evaluator;
mod exceptions;
mod executor;
mod inventory;

pub use aggregator::check_document;
pub use combine::combine_documents;
pub use engine::{Engine, InputDocument, NamespaceSelection, RunOptions};
pub use error::{EngineError, Result};
pub use evaluator::{evaluate_rule, RuleOutcome};
pub use exceptions::{exception_query, resolve_exceptions, Exceptions};
pub use executor::{EvalContext, ExecutorError, FileContext, QueryExecutor, QueryOutput};
pub use inventory::{NamespaceRules, RuleEntry, RuleInventory, RuleInventoryBuilder};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::engine::{Engine, InputDocument, NamespaceSelection, RunOptions};
    pub use crate::executor::{EvalContext, QueryExecutor, QueryOutput};
    pub use crate::inventory::RuleInventory;
}
