//! Short-as-year strategy
//!
//! A `Year` column stores a 4-digit year in one byte as the offset from
//! 1900. The offset is truncated into a signed byte on the way in and read
//! back as unsigned, which makes the round trip exact for 1900..=2155.
//! Years from 2028 on are stored as negative bytes; the engine orders year
//! columns by the unsigned byte, so bounds and filters stay in year order.

use clusterbind_core::{Error, Result, Value};
use clusterbind_storage::{
    BinaryCondition, BoundType, IndexScanOperation, Operation, ResultRow, ScanFilter,
};

use super::{column_of, datastore, not_assignable, OperationHandler};
use crate::field::FieldHandler;
use crate::value::ValueHandler;

const ORIGIN: i16 = 1900;
const LAST: i16 = 2155;

/// Encode a year for a `Year` column
pub fn encode_year(year: i16) -> Result<i8> {
    if !(ORIGIN..=LAST).contains(&year) {
        return Err(Error::user(format!(
            "Year {} is outside the storable range {}..={}",
            year, ORIGIN, LAST
        )));
    }
    Ok((year - ORIGIN) as u8 as i8)
}

/// Decode a byte read from a `Year` column
pub fn decode_year(stored: i8) -> i16 {
    stored as u8 as i16 + ORIGIN
}

#[derive(Debug)]
pub(crate) struct Year {
    primitive: bool,
}

impl Year {
    pub(crate) const fn new(primitive: bool) -> Self {
        Self { primitive }
    }

    fn year_of(&self, field: &FieldHandler, value: &Value) -> Result<i8> {
        match value {
            Value::Short(y) => encode_year(*y),
            other => Err(not_assignable(field, other)),
        }
    }

    fn zero(&self) -> Value {
        Value::Short(ORIGIN)
    }
}

impl OperationHandler for Year {
    fn name(&self) -> &'static str {
        if self.primitive {
            "year"
        } else {
            "Option<year>"
        }
    }

    fn is_primitive(&self) -> bool {
        self.primitive
    }

    fn default_value_for(&self, field: &FieldHandler, text: Option<&str>) -> Result<Value> {
        match text.map(str::trim) {
            None | Some("") => Ok(if self.primitive { self.zero() } else { Value::Null }),
            Some(t) if !self.primitive && t.eq_ignore_ascii_case("null") => Ok(Value::Null),
            Some(t) => {
                let year = t.parse::<i16>().map_err(|_| {
                    Error::user(format!("Default value '{}' for field {} is not a year", t, field.name()))
                })?;
                encode_year(year)?;
                Ok(Value::Short(year))
            }
        }
    }

    fn object_initialize_default(&self, field: &FieldHandler, container: &mut dyn ValueHandler) -> Result<()> {
        if self.primitive {
            container.set_object(field.number(), self.zero())?;
        }
        Ok(())
    }

    fn object_set_value(&self, field: &FieldHandler, container: &mut dyn ValueHandler, value: Value) -> Result<()> {
        match value {
            Value::Null if self.primitive => Err(Error::user(format!(
                "Field {} of primitive type {} cannot be set to null",
                field.name(),
                field.field_type()
            ))),
            Value::Null | Value::Short(_) => container.set_object(field.number(), value),
            other => Err(not_assignable(field, &other)),
        }
    }

    fn object_set_value_from_row(
        &self,
        field: &FieldHandler,
        row: &dyn ResultRow,
        container: &mut dyn ValueHandler,
    ) -> Result<()> {
        let column = column_of(field)?;
        let value = match row.value(column).map_err(|e| datastore(field, e))? {
            Value::Byte(b) => Value::Short(decode_year(b)),
            Value::Null if self.primitive => self.zero(),
            Value::Null => Value::Null,
            other => return Err(not_assignable(field, &other)),
        };
        container.set_object(field.number(), value)
    }

    fn operation_get_value(&self, field: &FieldHandler, op: &mut dyn Operation) -> Result<()> {
        op.get_value(column_of(field)?).map_err(|e| datastore(field, e))
    }

    fn operation_set_value_from(&self, field: &FieldHandler, value: &Value, op: &mut dyn Operation) -> Result<()> {
        let column = column_of(field)?;
        let result = match value {
            Value::Null => op.set_null(column),
            v => op.set_byte(column, self.year_of(field, v)?),
        };
        result.map_err(|e| datastore(field, e))
    }

    fn operation_equal(&self, field: &FieldHandler, value: &Value, op: &mut dyn Operation) -> Result<()> {
        let column = column_of(field)?;
        let stored = self.year_of(field, value)?;
        op.equal_byte(column, stored).map_err(|e| datastore(field, e))
    }

    fn operation_set_bounds(
        &self,
        field: &FieldHandler,
        value: &Value,
        bound: BoundType,
        op: &mut dyn IndexScanOperation,
    ) -> Result<()> {
        let column = column_of(field)?;
        let stored = self.year_of(field, value)?;
        op.set_bound_byte(column, bound, stored)
            .map_err(|e| datastore(field, e))
    }

    fn filter_compare_value(
        &self,
        field: &FieldHandler,
        value: &Value,
        condition: BinaryCondition,
        filter: &mut dyn ScanFilter,
    ) -> Result<()> {
        let column = column_of(field)?;
        let result = match (value, condition) {
            (Value::Null, BinaryCondition::Eq) => filter.is_null(column),
            (Value::Null, BinaryCondition::Ne) => filter.is_not_null(column),
            (v, _) => filter.cmp_byte(condition, column, self.year_of(field, v)?),
        };
        result.map_err(|e| datastore(field, e))
    }

    fn is_valid_index_type(&self, _field: &FieldHandler, _hash_not_ordered: bool) -> bool {
        true
    }
}
