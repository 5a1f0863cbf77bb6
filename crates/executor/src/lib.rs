//! # Clusterbind SQL bridge
//!
//! Routes already-parsed SQL statements through the binding layer.
//!
//! The SQL parser is not part of this crate. It hands over
//! [`StatementFacts`] (kind, table, columns, values and a WHERE tree with
//! positional parameters); the bridge turns them into an [`Executor`]:
//!
//! | Statement | Executor |
//! |-----------|----------|
//! | `INSERT` with parameter values | [`InsertExecutor`] |
//! | `SELECT` with an optional WHERE | [`SelectExecutor`] |
//! | `DELETE` with an optional WHERE | [`DeleteExecutor`] |
//! | anything that cannot be translated | [`NoopExecutor`] |
//!
//! Executors run against a [`Session`](clusterbind_engine::Session) and
//! return `Ok(None)` when the statement must fall back to ordinary
//! execution. Statements that cannot be translated never raise.
//!
//! The [`Interceptor`] ties this to a driver connection: it prepares and
//! caches executors per statement text and follows the connection's
//! autocommit and transaction boundaries.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod executor;
mod facts;
mod handlers;
mod interceptor;
mod output;

#[cfg(test)]
mod tests;

pub use executor::{build_executor, Executor};
pub use facts::{parameter_name, parameters, CompareOp, SqlOperand, SqlPredicate, StatementFacts, StatementKind};
pub use handlers::{DeleteExecutor, InsertExecutor, NoopExecutor, SelectExecutor};
pub use interceptor::Interceptor;
pub use output::{ExecutorResult, ResultRows};
