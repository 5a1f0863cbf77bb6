//! `DELETE FROM t [WHERE ..]`

use clusterbind_core::{Result, Value};
use clusterbind_engine::Session;
use clusterbind_metadata::{DomainTypeHandler, Predicate};
use std::sync::Arc;

use super::translate_where;
use crate::executor::Executor;
use crate::facts::{parameters, StatementFacts};
use crate::output::ExecutorResult;

/// Deletes every row, or the rows matching the WHERE tree
#[derive(Debug)]
pub struct DeleteExecutor {
    handler: Arc<DomainTypeHandler>,
    predicate: Option<Predicate>,
}

impl DeleteExecutor {
    /// Executor for a delete, or the reason it cannot be routed
    pub fn new(handler: Arc<DomainTypeHandler>, facts: &StatementFacts) -> std::result::Result<Self, String> {
        let predicate = translate_where(&handler, facts)?;
        Ok(Self { handler, predicate })
    }

    /// Whether this deletes the whole table
    pub fn is_unconditional(&self) -> bool {
        self.predicate.is_none()
    }
}

impl Executor for DeleteExecutor {
    fn execute(&self, session: &mut Session, bindings: &[Value]) -> Result<Option<ExecutorResult>> {
        let deleted = session.delete_matching(&self.handler, self.predicate.as_ref(), &parameters(bindings))?;
        Ok(Some(ExecutorResult::UpdateCount(deleted)))
    }
}
