//! Executors, one per routed statement kind.
//!
//! | Statement | Executor | Result |
//! |-----------|----------|--------|
//! | `INSERT` with parameter values | [`InsertExecutor`] | update count |
//! | `SELECT` | [`SelectExecutor`] | rows |
//! | `DELETE` | [`DeleteExecutor`] | update count |
//! | anything else | [`NoopExecutor`] | fall back |

mod delete;
mod insert;
mod noop;
mod select;

pub use delete::DeleteExecutor;
pub use insert::InsertExecutor;
pub use noop::NoopExecutor;
pub use select::SelectExecutor;

use clusterbind_metadata::{DomainTypeHandler, Predicate};

use crate::facts::StatementFacts;

/// Translated WHERE tree of a statement, if it has one
fn translate_where(
    handler: &DomainTypeHandler,
    facts: &StatementFacts,
) -> Result<Option<Predicate>, String> {
    facts
        .where_clause
        .as_ref()
        .map(|p| p.translate(handler))
        .transpose()
}
