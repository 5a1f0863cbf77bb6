//! Scalar strategies: plain fields and primary key fields

use clusterbind_core::{Error, Result, Value};
use clusterbind_storage::{
    BinaryCondition, BoundType, IndexScanOperation, Operation, PartitionKey, ResultRow, ScanFilter,
};
use std::fmt;
use std::marker::PhantomData;

use super::native::{KeyNative, Native};
use super::{column_of, datastore, not_assignable, OperationHandler};
use crate::field::FieldHandler;
use crate::value::ValueHandler;

fn convert<T: Native>(field: &FieldHandler, value: &Value) -> Result<T> {
    T::from_value(value.clone()).ok_or_else(|| not_assignable(field, value))
}

fn default_for<T: Native>(field: &FieldHandler, primitive: bool, text: Option<&str>) -> Result<Value> {
    match text {
        None | Some("") => Ok(if primitive { T::zero().into_value() } else { Value::Null }),
        Some(t) if !primitive && t.eq_ignore_ascii_case("null") => Ok(Value::Null),
        Some(t) => T::parse_default(t).map(Native::into_value).ok_or_else(|| {
            Error::user(format!(
                "Default value '{}' of column for field {} is not a valid {}",
                t,
                field.name(),
                field.field_type()
            ))
        }),
    }
}

fn initialize<T: Native>(field: &FieldHandler, primitive: bool, container: &mut dyn ValueHandler) -> Result<()> {
    if primitive {
        container.set_object(field.number(), T::zero().into_value())?;
    }
    Ok(())
}

fn store_in<T: Native>(
    field: &FieldHandler,
    primitive: bool,
    container: &mut dyn ValueHandler,
    value: Value,
) -> Result<()> {
    let value = match value {
        Value::Null if primitive => {
            return Err(Error::user(format!(
                "Field {} of primitive type {} cannot be set to null",
                field.name(),
                field.field_type()
            )))
        }
        Value::Null => Value::Null,
        v => convert::<T>(field, &v)?.into_value(),
    };
    container.set_object(field.number(), value)
}

fn load_from_row<T: Native>(
    field: &FieldHandler,
    primitive: bool,
    row: &dyn ResultRow,
    container: &mut dyn ValueHandler,
) -> Result<()> {
    let column = column_of(field)?;
    let value = match row.value(column).map_err(|e| datastore(field, e))? {
        Value::Null if primitive => T::zero().into_value(),
        Value::Null => Value::Null,
        v => convert::<T>(field, &v)?.into_value(),
    };
    container.set_object(field.number(), value)
}

fn bound<T: Native>(field: &FieldHandler, value: &Value, bound: BoundType, op: &mut dyn IndexScanOperation) -> Result<()> {
    if !T::ORDERED_INDEXABLE {
        return Err(Error::user(format!(
            "Field {} of type {} cannot bound an index scan",
            field.name(),
            field.field_type()
        )));
    }
    if value.is_null() {
        return Err(Error::user(format!("Index bound for field {} must not be null", field.name())));
    }
    let column = column_of(field)?;
    convert::<T>(field, value)?
        .bound(op, column, bound)
        .map_err(|e| datastore(field, e))
}

fn compare<T: Native>(
    field: &FieldHandler,
    value: &Value,
    condition: BinaryCondition,
    filter: &mut dyn ScanFilter,
) -> Result<()> {
    let column = column_of(field)?;
    let result = match (value, condition) {
        (Value::Null, BinaryCondition::Eq) => filter.is_null(column),
        (Value::Null, BinaryCondition::Ne) => filter.is_not_null(column),
        (Value::Null, _) => {
            return Err(Error::user(format!(
                "Field {} cannot be compared with null using {:?}",
                field.name(),
                condition
            )))
        }
        (v, _) => convert::<T>(field, v)?.cmp(filter, condition, column),
    };
    result.map_err(|e| datastore(field, e))
}

fn equal<T: Native>(field: &FieldHandler, value: &Value, op: &mut dyn Operation) -> Result<()> {
    if value.is_null() {
        return Err(Error::user(format!(
            "Equality value for field {} must not be null",
            field.name()
        )));
    }
    let column = column_of(field)?;
    convert::<T>(field, value)?
        .equal(op, column)
        .map_err(|e| datastore(field, e))
}

fn index_type<T: Native>(hash_not_ordered: bool) -> bool {
    if hash_not_ordered {
        T::HASH_INDEXABLE
    } else {
        T::ORDERED_INDEXABLE
    }
}

// ============================================================================
// Plain fields
// ============================================================================

/// Non-key field of a native type, primitive or object form
pub(crate) struct Scalar<T> {
    name: &'static str,
    primitive: bool,
    _native: PhantomData<fn() -> T>,
}

impl<T> Scalar<T> {
    pub(crate) const fn primitive(name: &'static str) -> Self {
        Self {
            name,
            primitive: true,
            _native: PhantomData,
        }
    }

    pub(crate) const fn object(name: &'static str) -> Self {
        Self {
            name,
            primitive: false,
            _native: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Scalar<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scalar({})", self.name)
    }
}

impl<T: Native> OperationHandler for Scalar<T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_primitive(&self) -> bool {
        self.primitive
    }

    fn default_value_for(&self, field: &FieldHandler, text: Option<&str>) -> Result<Value> {
        default_for::<T>(field, self.primitive, text)
    }

    fn object_initialize_default(&self, field: &FieldHandler, container: &mut dyn ValueHandler) -> Result<()> {
        initialize::<T>(field, self.primitive, container)
    }

    fn object_set_value(&self, field: &FieldHandler, container: &mut dyn ValueHandler, value: Value) -> Result<()> {
        store_in::<T>(field, self.primitive, container, value)
    }

    fn object_set_value_from_row(
        &self,
        field: &FieldHandler,
        row: &dyn ResultRow,
        container: &mut dyn ValueHandler,
    ) -> Result<()> {
        load_from_row::<T>(field, self.primitive, row, container)
    }

    fn operation_get_value(&self, field: &FieldHandler, op: &mut dyn Operation) -> Result<()> {
        op.get_value(column_of(field)?).map_err(|e| datastore(field, e))
    }

    fn operation_set_value_from(&self, field: &FieldHandler, value: &Value, op: &mut dyn Operation) -> Result<()> {
        let column = column_of(field)?;
        let result = match value {
            Value::Null => op.set_null(column),
            v => convert::<T>(field, v)?.set(op, column),
        };
        result.map_err(|e| datastore(field, e))
    }

    fn operation_equal(&self, field: &FieldHandler, value: &Value, op: &mut dyn Operation) -> Result<()> {
        equal::<T>(field, value, op)
    }

    fn operation_set_bounds(
        &self,
        field: &FieldHandler,
        value: &Value,
        bound_type: BoundType,
        op: &mut dyn IndexScanOperation,
    ) -> Result<()> {
        bound::<T>(field, value, bound_type, op)
    }

    fn filter_compare_value(
        &self,
        field: &FieldHandler,
        value: &Value,
        condition: BinaryCondition,
        filter: &mut dyn ScanFilter,
    ) -> Result<()> {
        compare::<T>(field, value, condition, filter)
    }

    fn is_valid_index_type(&self, _field: &FieldHandler, hash_not_ordered: bool) -> bool {
        index_type::<T>(hash_not_ordered)
    }
}

// ============================================================================
// Primary key fields
// ============================================================================

/// Primary key field: values go through the equality setters and feed
/// partition keys
pub(crate) struct KeyScalar<T> {
    name: &'static str,
    primitive: bool,
    _native: PhantomData<fn() -> T>,
}

impl<T> KeyScalar<T> {
    pub(crate) const fn primitive(name: &'static str) -> Self {
        Self {
            name,
            primitive: true,
            _native: PhantomData,
        }
    }

    pub(crate) const fn object(name: &'static str) -> Self {
        Self {
            name,
            primitive: false,
            _native: PhantomData,
        }
    }
}

impl<T> fmt::Debug for KeyScalar<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyScalar({})", self.name)
    }
}

impl<T: KeyNative> OperationHandler for KeyScalar<T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_primitive(&self) -> bool {
        self.primitive
    }

    fn is_key(&self) -> bool {
        true
    }

    fn default_value_for(&self, field: &FieldHandler, text: Option<&str>) -> Result<Value> {
        default_for::<T>(field, self.primitive, text)
    }

    fn object_initialize_default(&self, field: &FieldHandler, container: &mut dyn ValueHandler) -> Result<()> {
        initialize::<T>(field, self.primitive, container)
    }

    fn object_set_value(&self, field: &FieldHandler, container: &mut dyn ValueHandler, value: Value) -> Result<()> {
        store_in::<T>(field, self.primitive, container, value)
    }

    fn object_set_value_from_row(
        &self,
        field: &FieldHandler,
        row: &dyn ResultRow,
        container: &mut dyn ValueHandler,
    ) -> Result<()> {
        load_from_row::<T>(field, self.primitive, row, container)
    }

    fn operation_get_value(&self, field: &FieldHandler, op: &mut dyn Operation) -> Result<()> {
        op.get_value(column_of(field)?).map_err(|e| datastore(field, e))
    }

    fn operation_set_value_from(&self, field: &FieldHandler, value: &Value, op: &mut dyn Operation) -> Result<()> {
        if value.is_null() {
            return Err(Error::user(format!(
                "Primary key field {} must not be null",
                field.name()
            )));
        }
        equal::<T>(field, value, op)
    }

    fn operation_equal(&self, field: &FieldHandler, value: &Value, op: &mut dyn Operation) -> Result<()> {
        equal::<T>(field, value, op)
    }

    fn operation_set_bounds(
        &self,
        field: &FieldHandler,
        value: &Value,
        bound_type: BoundType,
        op: &mut dyn IndexScanOperation,
    ) -> Result<()> {
        bound::<T>(field, value, bound_type, op)
    }

    fn filter_compare_value(
        &self,
        field: &FieldHandler,
        value: &Value,
        condition: BinaryCondition,
        filter: &mut dyn ScanFilter,
    ) -> Result<()> {
        compare::<T>(field, value, condition, filter)
    }

    fn is_valid_index_type(&self, _field: &FieldHandler, hash_not_ordered: bool) -> bool {
        index_type::<T>(hash_not_ordered)
    }

    fn partition_key_set_part(
        &self,
        field: &FieldHandler,
        key: &mut PartitionKey,
        container: &dyn ValueHandler,
    ) -> Result<()> {
        let value = container.get_object(field.number())?;
        if value.is_null() {
            return Err(Error::user(format!(
                "Partition key field {} must not be null",
                field.name()
            )));
        }
        convert::<T>(field, &value)?
            .add_part(key)
            .map_err(|e| datastore(field, e))
    }
}
