//! Large object strategies
//!
//! Writing a LOB field is two-phase. The operation first gets a blob handle
//! and a zero-length placeholder so the row exists when it executes; the
//! real content is written through the handle by a post-execute callback,
//! once the handle is active. Reads fetch the column and copy the content
//! out of the row's blob handle.

use clusterbind_core::{Error, Result, Value};
use clusterbind_storage::{
    BinaryCondition, BoundType, IndexScanOperation, Operation, ResultRow, ScanFilter,
};
use tracing::trace;

use super::{column_of, datastore, not_assignable, OperationHandler};
use crate::field::FieldHandler;
use crate::value::ValueHandler;

#[derive(Debug)]
pub(crate) struct Lob {
    text: bool,
}

impl Lob {
    pub(crate) const fn new(text: bool) -> Self {
        Self { text }
    }

    fn content(&self, field: &FieldHandler, value: &Value) -> Result<Vec<u8>> {
        match (self.text, value) {
            (true, Value::String(s)) => Ok(s.as_bytes().to_vec()),
            (false, Value::Bytes(b)) => Ok(b.clone()),
            (_, other) => Err(not_assignable(field, other)),
        }
    }

    fn placeholder(&self) -> Value {
        if self.text {
            Value::String(String::new())
        } else {
            Value::Bytes(Vec::new())
        }
    }

    fn not_in_predicates(&self, field: &FieldHandler) -> Error {
        Error::user(format!(
            "Large object field {} cannot be used in a predicate",
            field.name()
        ))
    }
}

impl OperationHandler for Lob {
    fn name(&self) -> &'static str {
        if self.text {
            "string lob"
        } else {
            "bytes lob"
        }
    }

    fn default_value_for(&self, _field: &FieldHandler, _text: Option<&str>) -> Result<Value> {
        Ok(Value::Null)
    }

    fn object_initialize_default(&self, _field: &FieldHandler, _container: &mut dyn ValueHandler) -> Result<()> {
        Ok(())
    }

    fn object_set_value(&self, field: &FieldHandler, container: &mut dyn ValueHandler, value: Value) -> Result<()> {
        if !value.is_null() {
            self.content(field, &value)?;
        }
        container.set_object(field.number(), value)
    }

    fn object_set_value_from_row(
        &self,
        field: &FieldHandler,
        row: &dyn ResultRow,
        container: &mut dyn ValueHandler,
    ) -> Result<()> {
        let column = column_of(field)?;
        let handle = row.get_blob(column).map_err(|e| datastore(field, e))?;
        let value = if self.text {
            handle
                .read_string()
                .map_err(|e| datastore(field, e))?
                .map_or(Value::Null, Value::String)
        } else {
            handle
                .read_data()
                .map_err(|e| datastore(field, e))?
                .map_or(Value::Null, Value::Bytes)
        };
        container.set_object(field.number(), value)
    }

    fn operation_get_value(&self, field: &FieldHandler, op: &mut dyn Operation) -> Result<()> {
        op.get_value(column_of(field)?).map_err(|e| datastore(field, e))
    }

    fn operation_set_value_from(&self, field: &FieldHandler, value: &Value, op: &mut dyn Operation) -> Result<()> {
        let column = column_of(field)?;
        if value.is_null() {
            return op.set_null(column).map_err(|e| datastore(field, e));
        }
        let content = self.content(field, value)?;
        let handle = op.get_blob_handle(column).map_err(|e| datastore(field, e))?;
        op.set_value(column, self.placeholder())
            .map_err(|e| datastore(field, e))?;
        trace!(
            target: "clusterbind::metadata",
            field = field.name(),
            bytes = content.len(),
            "Deferred large object write"
        );
        op.post_execute_callback(Box::new(move || handle.write_data(&content)));
        Ok(())
    }

    fn operation_equal(&self, field: &FieldHandler, _value: &Value, _op: &mut dyn Operation) -> Result<()> {
        Err(self.not_in_predicates(field))
    }

    fn operation_set_bounds(
        &self,
        field: &FieldHandler,
        _value: &Value,
        _bound: BoundType,
        _op: &mut dyn IndexScanOperation,
    ) -> Result<()> {
        Err(self.not_in_predicates(field))
    }

    fn filter_compare_value(
        &self,
        field: &FieldHandler,
        _value: &Value,
        _condition: BinaryCondition,
        _filter: &mut dyn ScanFilter,
    ) -> Result<()> {
        Err(self.not_in_predicates(field))
    }

    fn is_valid_index_type(&self, _field: &FieldHandler, _hash_not_ordered: bool) -> bool {
        false
    }
}
