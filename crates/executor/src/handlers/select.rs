//! `SELECT .. FROM t [WHERE ..]`

use clusterbind_core::{Result, Value};
use clusterbind_engine::{fetch_rows, Session};
use clusterbind_metadata::{DomainTypeHandler, FieldSet, Predicate, ValueHandler};
use std::sync::Arc;
use tracing::debug;

use super::translate_where;
use crate::executor::Executor;
use crate::facts::{parameters, resolve_column, StatementFacts};
use crate::output::{ExecutorResult, ResultRows};

/// Runs a query and returns its rows in select-list order
#[derive(Debug)]
pub struct SelectExecutor {
    handler: Arc<DomainTypeHandler>,
    /// Field number per result column
    column_fields: Vec<usize>,
    labels: Vec<String>,
    fetched: FieldSet,
    predicate: Option<Predicate>,
}

impl SelectExecutor {
    /// Executor for a select, or the reason it cannot be routed
    pub fn new(handler: Arc<DomainTypeHandler>, facts: &StatementFacts) -> std::result::Result<Self, String> {
        let column_fields: Vec<usize> = if facts.selects_all() {
            handler.persistent_field_numbers().to_vec()
        } else {
            facts
                .columns
                .iter()
                .map(|c| resolve_column(&handler, c).map(|f| f.number()))
                .collect::<std::result::Result<_, _>>()?
        };
        let labels = column_fields
            .iter()
            .map(|n| handler.fields()[*n].name().to_string())
            .collect();
        let fetched = FieldSet::from_fields(handler.number_of_fields(), column_fields.iter().copied());
        let predicate = translate_where(&handler, facts)?;
        Ok(Self {
            handler,
            column_fields,
            labels,
            fetched,
            predicate,
        })
    }
}

impl Executor for SelectExecutor {
    fn execute(&self, session: &mut Session, bindings: &[Value]) -> Result<Option<ExecutorResult>> {
        let params = parameters(bindings);
        let lock_mode = session.factory().lock_mode();
        let handler = &self.handler;
        let fetched = session.with_transaction(|txn| {
            fetch_rows(txn, handler, self.predicate.as_ref(), &params, lock_mode, Some(&self.fetched))
        })?;

        let mut rows = Vec::with_capacity(fetched.len());
        for row in &fetched {
            let mut container = handler.new_instance()?;
            handler.object_set_values_filtered(row, &mut container, &self.fetched)?;
            let values = self
                .column_fields
                .iter()
                .map(|n| container.get_object(*n))
                .collect::<Result<Vec<_>>>()?;
            rows.push(values);
        }
        debug!(target: "clusterbind::sql", table = %handler.table().name, rows = rows.len(), "Select executed");
        Ok(Some(ExecutorResult::Rows(ResultRows::new(self.labels.clone(), rows))))
    }
}
