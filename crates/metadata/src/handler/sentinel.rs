//! Sentinel strategies
//!
//! `Unsupported` is bound to fields whose type cannot be mapped and fails
//! every operation. `Virtual` is bound to fields without a column of their
//! own; it keeps the container slot usable and does nothing against the
//! engine.

use clusterbind_core::{Error, Result, Value};
use clusterbind_storage::{
    BinaryCondition, BoundType, IndexScanOperation, Operation, PartitionKey, ResultRow, ScanFilter,
};

use super::OperationHandler;
use crate::field::FieldHandler;
use crate::value::ValueHandler;

fn unsupported(field: &FieldHandler, operation: &str) -> Error {
    Error::user(format!(
        "Operation {} is not supported for field {} of unsupported type {}",
        operation,
        field.name(),
        field.field_type()
    ))
}

#[derive(Debug)]
pub(crate) struct Unsupported;

impl OperationHandler for Unsupported {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    fn default_value_for(&self, field: &FieldHandler, _text: Option<&str>) -> Result<Value> {
        Err(unsupported(field, "default_value_for"))
    }

    fn object_initialize_default(&self, field: &FieldHandler, _container: &mut dyn ValueHandler) -> Result<()> {
        Err(unsupported(field, "object_initialize_default"))
    }

    fn object_get_value(&self, field: &FieldHandler, _container: &dyn ValueHandler) -> Result<Value> {
        Err(unsupported(field, "object_get_value"))
    }

    fn object_set_value(&self, field: &FieldHandler, _container: &mut dyn ValueHandler, _value: Value) -> Result<()> {
        Err(unsupported(field, "object_set_value"))
    }

    fn object_set_value_from_row(
        &self,
        field: &FieldHandler,
        _row: &dyn ResultRow,
        _container: &mut dyn ValueHandler,
    ) -> Result<()> {
        Err(unsupported(field, "object_set_value_from_row"))
    }

    fn operation_get_value(&self, field: &FieldHandler, _op: &mut dyn Operation) -> Result<()> {
        Err(unsupported(field, "operation_get_value"))
    }

    fn operation_set_value(
        &self,
        field: &FieldHandler,
        _container: &dyn ValueHandler,
        _op: &mut dyn Operation,
    ) -> Result<()> {
        Err(unsupported(field, "operation_set_value"))
    }

    fn operation_set_value_from(&self, field: &FieldHandler, _value: &Value, _op: &mut dyn Operation) -> Result<()> {
        Err(unsupported(field, "operation_set_value"))
    }

    fn operation_equal(&self, field: &FieldHandler, _value: &Value, _op: &mut dyn Operation) -> Result<()> {
        Err(unsupported(field, "operation_equal"))
    }

    fn operation_set_bounds(
        &self,
        field: &FieldHandler,
        _value: &Value,
        _bound: BoundType,
        _op: &mut dyn IndexScanOperation,
    ) -> Result<()> {
        Err(unsupported(field, "operation_set_bounds"))
    }

    fn filter_compare_value(
        &self,
        field: &FieldHandler,
        _value: &Value,
        _condition: BinaryCondition,
        _filter: &mut dyn ScanFilter,
    ) -> Result<()> {
        Err(unsupported(field, "filter_compare_value"))
    }

    fn is_valid_index_type(&self, _field: &FieldHandler, _hash_not_ordered: bool) -> bool {
        false
    }

    fn partition_key_set_part(
        &self,
        field: &FieldHandler,
        _key: &mut PartitionKey,
        _container: &dyn ValueHandler,
    ) -> Result<()> {
        Err(unsupported(field, "partition_key_set_part"))
    }
}

#[derive(Debug)]
pub(crate) struct Virtual;

impl OperationHandler for Virtual {
    fn name(&self) -> &'static str {
        "virtual"
    }

    fn default_value_for(&self, _field: &FieldHandler, _text: Option<&str>) -> Result<Value> {
        Ok(Value::Null)
    }

    fn object_initialize_default(&self, _field: &FieldHandler, _container: &mut dyn ValueHandler) -> Result<()> {
        Ok(())
    }

    fn object_set_value(&self, field: &FieldHandler, container: &mut dyn ValueHandler, value: Value) -> Result<()> {
        container.set_object(field.number(), value)
    }

    fn object_set_value_from_row(
        &self,
        _field: &FieldHandler,
        _row: &dyn ResultRow,
        _container: &mut dyn ValueHandler,
    ) -> Result<()> {
        Ok(())
    }

    fn operation_get_value(&self, _field: &FieldHandler, _op: &mut dyn Operation) -> Result<()> {
        Ok(())
    }

    fn operation_set_value_from(&self, _field: &FieldHandler, _value: &Value, _op: &mut dyn Operation) -> Result<()> {
        Ok(())
    }

    fn operation_equal(&self, _field: &FieldHandler, _value: &Value, _op: &mut dyn Operation) -> Result<()> {
        Ok(())
    }

    fn operation_set_bounds(
        &self,
        _field: &FieldHandler,
        _value: &Value,
        _bound: BoundType,
        _op: &mut dyn IndexScanOperation,
    ) -> Result<()> {
        Ok(())
    }

    fn filter_compare_value(
        &self,
        _field: &FieldHandler,
        _value: &Value,
        _condition: BinaryCondition,
        _filter: &mut dyn ScanFilter,
    ) -> Result<()> {
        Ok(())
    }

    fn is_valid_index_type(&self, _field: &FieldHandler, _hash_not_ordered: bool) -> bool {
        false
    }

    fn partition_key_set_part(
        &self,
        _field: &FieldHandler,
        _key: &mut PartitionKey,
        _container: &dyn ValueHandler,
    ) -> Result<()> {
        Ok(())
    }
}
