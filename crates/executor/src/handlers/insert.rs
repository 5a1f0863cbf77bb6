//! `INSERT INTO t (..) VALUES (?, ..)`

use clusterbind_core::{Result, Value};
use clusterbind_engine::Session;
use clusterbind_metadata::{BatchValueHandler, DomainTypeHandler};
use std::sync::Arc;
use tracing::debug;

use crate::executor::Executor;
use crate::facts::{resolve_column, SqlOperand, StatementFacts};
use crate::output::ExecutorResult;

/// Writes one row per parameter set
///
/// Only the listed columns are written; the rest are left NULL. Every
/// value must be a parameter and the whole primary key must be listed.
#[derive(Debug)]
pub struct InsertExecutor {
    handler: Arc<DomainTypeHandler>,
    field_to_parameter: Vec<Option<usize>>,
}

impl InsertExecutor {
    /// Executor for an insert, or the reason it cannot be routed
    pub fn new(handler: Arc<DomainTypeHandler>, facts: &StatementFacts) -> std::result::Result<Self, String> {
        if facts.columns.is_empty() {
            return Err("insert without a column list".to_string());
        }
        if facts.columns.len() != facts.values.len() {
            return Err(format!(
                "insert lists {} columns but {} values",
                facts.columns.len(),
                facts.values.len()
            ));
        }
        let mut field_to_parameter = vec![None; handler.number_of_fields()];
        for (column, value) in facts.columns.iter().zip(&facts.values) {
            let field = resolve_column(&handler, column)?;
            match value {
                SqlOperand::Parameter(position) => field_to_parameter[field.number()] = Some(*position),
                SqlOperand::Literal(_) => return Err(format!("literal value for column {}", column)),
            }
        }
        if let Some(missing) = handler
            .id_field_numbers()
            .iter()
            .find(|n| field_to_parameter[**n].is_none())
        {
            return Err(format!(
                "primary key column {} is not bound",
                handler.fields()[*missing].name()
            ));
        }
        Ok(Self {
            handler,
            field_to_parameter,
        })
    }

    fn insert_all(&self, session: &mut Session, mut values: BatchValueHandler) -> Result<usize> {
        let handler = &self.handler;
        let written = session.with_transaction(|txn| {
            let mut written = 0;
            while values.next() {
                let op = txn.insert(&handler.table().name)?;
                handler.operation_set_modified_values(&values, op)?;
                written += 1;
            }
            Ok(written)
        })?;
        debug!(target: "clusterbind::sql", table = %handler.table().name, rows = written, "Insert executed");
        Ok(written)
    }
}

impl Executor for InsertExecutor {
    fn execute(&self, session: &mut Session, bindings: &[Value]) -> Result<Option<ExecutorResult>> {
        let values = BatchValueHandler::from_bindings(bindings.to_vec(), self.field_to_parameter.clone());
        let written = self.insert_all(session, values)?;
        Ok(Some(ExecutorResult::UpdateCount(written)))
    }

    fn execute_batch(&self, session: &mut Session, parameter_sets: Vec<Vec<Value>>) -> Result<Option<ExecutorResult>> {
        let values = BatchValueHandler::from_parameter_sets(parameter_sets, self.field_to_parameter.clone());
        let written = self.insert_all(session, values)?;
        Ok(Some(ExecutorResult::UpdateCount(written)))
    }
}
