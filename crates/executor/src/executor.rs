//! The executor contract and executor selection.
//!
//! An executor is built once per statement text and run once per execution
//! with that execution's parameter bindings. Building never fails: a
//! statement the binding layer cannot run safely gets a [`NoopExecutor`],
//! whose result tells the caller to fall back.

use clusterbind_core::{Result, Value};
use clusterbind_engine::{Session, SessionFactory};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::facts::{StatementFacts, StatementKind};
use crate::handlers::{DeleteExecutor, InsertExecutor, NoopExecutor, SelectExecutor};
use crate::output::ExecutorResult;

/// A statement prepared for the binding layer
///
/// `Ok(None)` from `execute` means "not handled here, run the statement
/// the ordinary way".
pub trait Executor: Send + Sync + fmt::Debug {
    /// Run once with positional parameter bindings
    fn execute(&self, session: &mut Session, bindings: &[Value]) -> Result<Option<ExecutorResult>>;

    /// Run once per parameter set
    ///
    /// Executors without batch support fall back.
    fn execute_batch(&self, _session: &mut Session, _parameter_sets: Vec<Vec<Value>>) -> Result<Option<ExecutorResult>> {
        Ok(None)
    }

    /// Whether the statement is routed at all
    fn is_routed(&self) -> bool {
        true
    }
}

/// Pick the executor for a statement
pub fn build_executor(factory: &SessionFactory, facts: &StatementFacts) -> Arc<dyn Executor> {
    match try_build(factory, facts) {
        Ok(executor) => {
            debug!(target: "clusterbind::sql", table = %facts.table, kind = ?facts.kind, executor = ?executor, "Executor selected");
            executor
        }
        Err(reason) => {
            warn!(target: "clusterbind::sql", table = %facts.table, kind = ?facts.kind, reason = %reason, "Statement falls back");
            Arc::new(NoopExecutor::new(reason))
        }
    }
}

fn try_build(factory: &SessionFactory, facts: &StatementFacts) -> std::result::Result<Arc<dyn Executor>, String> {
    if facts.kind == StatementKind::Other {
        return Err("statement kind is not routed".to_string());
    }
    let handler = factory.table_handler(&facts.table).map_err(|e| e.to_string())?;
    Ok(match facts.kind {
        StatementKind::Insert => Arc::new(InsertExecutor::new(handler, facts)?),
        StatementKind::Select => Arc::new(SelectExecutor::new(handler, facts)?),
        StatementKind::Delete => Arc::new(DeleteExecutor::new(handler, facts)?),
        StatementKind::Other => Arc::new(NoopExecutor::new("statement kind is not routed")),
    })
}
