//! Operation handler registry
//!
//! One stateless strategy per combination of field type, primitive vs
//! object form, key role and lob-ness. `select` picks the strategy for a
//! field once, when its `FieldHandler` is built; every later transfer of
//! the field's value goes through that strategy.
//!
//! The single most important branch in the table: key handlers push values
//! into an operation with the *equality* setters (`equal_*`), every other
//! handler uses the plain setters (`set_*`). Only key handlers contribute
//! to partition keys.
//!
//! Large objects use a two-phase write: the operation gets a zero-length
//! placeholder so the row exists, and the real content is written through a
//! blob handle by a post-execute callback.

use clusterbind_core::{ColumnDescriptor, ColumnType, Error, FieldKind, FieldType, Result, StorageClass, Value};
use clusterbind_storage::{
    BinaryCondition, BoundType, IndexScanOperation, Operation, PartitionKey, ResultRow, ScanFilter, StoreError,
};
use rust_decimal::Decimal;
use std::fmt;
use tracing::debug;

use crate::field::FieldHandler;
use crate::value::ValueHandler;

mod lob;
mod native;
mod scalar;
mod sentinel;
mod year;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use lob::Lob;
use scalar::{KeyScalar, Scalar};
use sentinel::{Unsupported, Virtual};
use year::Year;

pub use year::{decode_year, encode_year};

// ============================================================================
// Contract
// ============================================================================

/// Moves one field's value between a value container, engine operations,
/// scan filters and result rows
///
/// Implementations are stateless singletons; everything field-specific
/// comes from the `FieldHandler` argument.
pub trait OperationHandler: Send + Sync + fmt::Debug {
    /// Strategy name, for diagnostics
    fn name(&self) -> &'static str;

    /// Whether the field is a non-nullable native type
    fn is_primitive(&self) -> bool {
        false
    }

    /// Whether the field is (part of) the primary key
    fn is_key(&self) -> bool {
        false
    }

    /// Parse a column's textual default, or produce the type's zero value
    fn default_value_for(&self, field: &FieldHandler, text: Option<&str>) -> Result<Value>;

    /// Prime a fresh container with the zero value (primitives only)
    fn object_initialize_default(&self, field: &FieldHandler, container: &mut dyn ValueHandler) -> Result<()>;

    /// Read the field from a container
    fn object_get_value(&self, field: &FieldHandler, container: &dyn ValueHandler) -> Result<Value> {
        container.get_object(field.number())
    }

    /// Write the field into a container
    fn object_set_value(&self, field: &FieldHandler, container: &mut dyn ValueHandler, value: Value) -> Result<()>;

    /// Copy the field's column out of a fetched row into a container
    fn object_set_value_from_row(
        &self,
        field: &FieldHandler,
        row: &dyn ResultRow,
        container: &mut dyn ValueHandler,
    ) -> Result<()>;

    /// Ask a read operation to fetch the field's column
    fn operation_get_value(&self, field: &FieldHandler, op: &mut dyn Operation) -> Result<()>;

    /// Push the container's value of the field into an operation
    fn operation_set_value(
        &self,
        field: &FieldHandler,
        container: &dyn ValueHandler,
        op: &mut dyn Operation,
    ) -> Result<()> {
        let value = container.get_object(field.number())?;
        self.operation_set_value_from(field, &value, op)
    }

    /// Push a given value of the field into an operation
    fn operation_set_value_from(&self, field: &FieldHandler, value: &Value, op: &mut dyn Operation) -> Result<()>;

    /// Add an equality predicate on the field's column
    fn operation_equal(&self, field: &FieldHandler, value: &Value, op: &mut dyn Operation) -> Result<()>;

    /// Bound an index scan on the field's column
    fn operation_set_bounds(
        &self,
        field: &FieldHandler,
        value: &Value,
        bound: BoundType,
        op: &mut dyn IndexScanOperation,
    ) -> Result<()>;

    /// Add a scan filter comparison on the field's column
    fn filter_compare_value(
        &self,
        field: &FieldHandler,
        value: &Value,
        condition: BinaryCondition,
        filter: &mut dyn ScanFilter,
    ) -> Result<()>;

    /// Whether the field may be part of a hash (`true`) or ordered
    /// (`false`) index
    fn is_valid_index_type(&self, field: &FieldHandler, hash_not_ordered: bool) -> bool;

    /// Append the field's value to a partition key
    fn partition_key_set_part(
        &self,
        _field: &FieldHandler,
        _key: &mut PartitionKey,
        _container: &dyn ValueHandler,
    ) -> Result<()> {
        Err(Error::unsupported_operation("partition_key_set_part", self.name()))
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

pub(crate) fn column_of(field: &FieldHandler) -> Result<&ColumnDescriptor> {
    field
        .column()
        .ok_or_else(|| Error::fatal(format!("Field {} is not mapped to a column", field.name())))
}

pub(crate) fn datastore(field: &FieldHandler, err: StoreError) -> Error {
    Error::from(err).context(format!("field {}", field.name()))
}

pub(crate) fn not_assignable(field: &FieldHandler, value: &Value) -> Error {
    Error::user(format!(
        "Value {} of type {} is not assignable to field {} of type {}",
        value,
        value.type_name(),
        field.name(),
        field.field_type()
    ))
}

// ============================================================================
// Registry
// ============================================================================

static BOOLEAN: Scalar<bool> = Scalar::primitive("boolean");
static OBJECT_BOOLEAN: Scalar<bool> = Scalar::object("Option<boolean>");
static BYTE: Scalar<i8> = Scalar::primitive("byte");
static OBJECT_BYTE: Scalar<i8> = Scalar::object("Option<byte>");
static SHORT: Scalar<i16> = Scalar::primitive("short");
static OBJECT_SHORT: Scalar<i16> = Scalar::object("Option<short>");
static INT: Scalar<i32> = Scalar::primitive("int");
static OBJECT_INT: Scalar<i32> = Scalar::object("Option<int>");
static LONG: Scalar<i64> = Scalar::primitive("long");
static OBJECT_LONG: Scalar<i64> = Scalar::object("Option<long>");
static FLOAT: Scalar<f32> = Scalar::primitive("float");
static OBJECT_FLOAT: Scalar<f32> = Scalar::object("Option<float>");
static DOUBLE: Scalar<f64> = Scalar::primitive("double");
static OBJECT_DOUBLE: Scalar<f64> = Scalar::object("Option<double>");
static DECIMAL: Scalar<Decimal> = Scalar::object("decimal");
static BIG_INTEGER: Scalar<i128> = Scalar::object("big integer");
static STRING: Scalar<String> = Scalar::object("string");
static BYTES: Scalar<Vec<u8>> = Scalar::object("bytes");
static DATE: Scalar<NaiveDate> = Scalar::object("date");
static TIME: Scalar<NaiveTime> = Scalar::object("time");
static TIMESTAMP: Scalar<NaiveDateTime> = Scalar::object("timestamp");

static KEY_INT: KeyScalar<i32> = KeyScalar::primitive("key int");
static KEY_OBJECT_INT: KeyScalar<i32> = KeyScalar::object("key Option<int>");
static KEY_LONG: KeyScalar<i64> = KeyScalar::primitive("key long");
static KEY_OBJECT_LONG: KeyScalar<i64> = KeyScalar::object("key Option<long>");
static KEY_STRING: KeyScalar<String> = KeyScalar::object("key string");
static KEY_BYTES: KeyScalar<Vec<u8>> = KeyScalar::object("key bytes");

static YEAR: Year = Year::new(true);
static OBJECT_YEAR: Year = Year::new(false);

static LOB_STRING: Lob = Lob::new(true);
static LOB_BYTES: Lob = Lob::new(false);

static UNSUPPORTED: Unsupported = Unsupported;
static VIRTUAL: Virtual = Virtual;

/// Strategy that fails every operation
pub fn unsupported() -> &'static dyn OperationHandler {
    &UNSUPPORTED
}

/// Strategy for fields without a column
pub fn virtual_handler() -> &'static dyn OperationHandler {
    &VIRTUAL
}

/// Classification of a field, the input of `select`
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerSelection<'a> {
    /// Declared field type
    pub field_type: &'a FieldType,
    /// Type of the mapped column; `None` for fields without a single column
    pub column_type: Option<ColumnType>,
    /// Whether the column accepts NULL
    pub nullable: bool,
    /// Whether the column is part of the primary key
    pub primary_key: bool,
    /// Whether the column is part of the partition key
    pub partition_key: bool,
    /// Whether the field is mapped as a large object
    pub lob: bool,
}

fn kind_of_storage(class: StorageClass) -> Option<FieldKind> {
    Some(match class {
        StorageClass::Bool => FieldKind::Boolean,
        StorageClass::Byte => FieldKind::Byte,
        StorageClass::Short => FieldKind::Short,
        StorageClass::Int => FieldKind::Int,
        StorageClass::Long => FieldKind::Long,
        StorageClass::Float => FieldKind::Float,
        StorageClass::Double => FieldKind::Double,
        StorageClass::Decimal => FieldKind::Decimal,
        StorageClass::BigInteger => FieldKind::BigInteger,
        StorageClass::String => FieldKind::String,
        StorageClass::Bytes => FieldKind::Bytes,
        StorageClass::Date => FieldKind::Date,
        StorageClass::Time => FieldKind::Time,
        StorageClass::Timestamp => FieldKind::Timestamp,
        StorageClass::Unsupported => return None,
    })
}

/// Choose the strategy for a field
///
/// Returns the reason as `Err` when the combination cannot be mapped; the
/// caller records it as a field error and binds the unsupported strategy.
pub fn select(selection: &HandlerSelection<'_>) -> std::result::Result<&'static dyn OperationHandler, String> {
    let chosen = choose(selection);
    match &chosen {
        Ok(handler) => debug!(
            target: "clusterbind::metadata",
            field_type = %selection.field_type,
            column_type = ?selection.column_type,
            nullable = selection.nullable,
            primary_key = selection.primary_key,
            handler = handler.name(),
            "Selected operation handler"
        ),
        Err(reason) => debug!(
            target: "clusterbind::metadata",
            field_type = %selection.field_type,
            column_type = ?selection.column_type,
            reason = %reason,
            "No operation handler"
        ),
    }
    chosen
}

fn choose(selection: &HandlerSelection<'_>) -> std::result::Result<&'static dyn OperationHandler, String> {
    let column_type = match selection.column_type {
        None => return Ok(&VIRTUAL),
        Some(t) => t,
    };
    let field_type = selection.field_type;
    let kind = match field_type {
        FieldType::Unsupported(name) => return Err(format!("Unsupported field type {}", name)),
        FieldType::Primitive(k) | FieldType::Object(k) => *k,
    };
    let primitive = field_type.is_primitive();

    if selection.partition_key && !selection.primary_key {
        return Err("A partition key column must be part of the primary key".to_string());
    }

    if column_type == ColumnType::Year && kind == FieldKind::Short {
        if selection.primary_key {
            return Err("A year column cannot be used as a primary key".to_string());
        }
        return Ok(if primitive { &YEAR } else { &OBJECT_YEAR });
    }

    if selection.lob || column_type.is_lob() {
        if selection.primary_key {
            return Err(format!("Large object column of type {} cannot be a primary key", column_type));
        }
        return match (kind, column_type) {
            (FieldKind::String, ColumnType::Text) => Ok(&LOB_STRING),
            (FieldKind::Bytes, ColumnType::Blob) => Ok(&LOB_BYTES),
            _ => Err(format!(
                "Field type {} cannot be mapped to large object column type {}",
                field_type, column_type
            )),
        };
    }

    let storage = kind_of_storage(column_type.storage_class());
    if storage != Some(kind) {
        return Err(format!(
            "Field type {} cannot be mapped to column type {}",
            field_type, column_type
        ));
    }

    if selection.primary_key {
        return match (kind, primitive) {
            (FieldKind::Int, true) => Ok(&KEY_INT),
            (FieldKind::Int, false) => Ok(&KEY_OBJECT_INT),
            (FieldKind::Long, true) => Ok(&KEY_LONG),
            (FieldKind::Long, false) => Ok(&KEY_OBJECT_LONG),
            (FieldKind::String, _) => Ok(&KEY_STRING),
            (FieldKind::Bytes, _) => Ok(&KEY_BYTES),
            _ => Err(format!("Field type {} is not valid for a primary key", field_type)),
        };
    }

    Ok(match (kind, primitive) {
        (FieldKind::Boolean, true) => &BOOLEAN,
        (FieldKind::Boolean, false) => &OBJECT_BOOLEAN,
        (FieldKind::Byte, true) => &BYTE,
        (FieldKind::Byte, false) => &OBJECT_BYTE,
        (FieldKind::Short, true) => &SHORT,
        (FieldKind::Short, false) => &OBJECT_SHORT,
        (FieldKind::Int, true) => &INT,
        (FieldKind::Int, false) => &OBJECT_INT,
        (FieldKind::Long, true) => &LONG,
        (FieldKind::Long, false) => &OBJECT_LONG,
        (FieldKind::Float, true) => &FLOAT,
        (FieldKind::Float, false) => &OBJECT_FLOAT,
        (FieldKind::Double, true) => &DOUBLE,
        (FieldKind::Double, false) => &OBJECT_DOUBLE,
        (FieldKind::Decimal, _) => &DECIMAL,
        (FieldKind::BigInteger, _) => &BIG_INTEGER,
        (FieldKind::String, _) => &STRING,
        (FieldKind::Bytes, _) => &BYTES,
        (FieldKind::Date, _) => &DATE,
        (FieldKind::Time, _) => &TIME,
        (FieldKind::Timestamp, _) => &TIMESTAMP,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pick(field_type: &FieldType, column_type: ColumnType, primary_key: bool) -> std::result::Result<&'static str, String> {
        select(&HandlerSelection {
            field_type,
            column_type: Some(column_type),
            nullable: !primary_key,
            primary_key,
            partition_key: false,
            lob: false,
        })
        .map(|h| h.name())
    }

    #[test]
    fn test_key_and_plain_handlers_differ() {
        assert_eq!(pick(&FieldType::INT, ColumnType::Int, true).unwrap(), "key int");
        assert_eq!(pick(&FieldType::INT, ColumnType::Int, false).unwrap(), "int");
        assert_eq!(pick(&FieldType::OBJECT_INT, ColumnType::Int, false).unwrap(), "Option<int>");
        assert_eq!(pick(&FieldType::STRING, ColumnType::Varchar, true).unwrap(), "key string");
        assert_eq!(pick(&FieldType::BYTES, ColumnType::Varbinary, true).unwrap(), "key bytes");
    }

    #[test]
    fn test_unsigned_is_int_storage() {
        assert_eq!(pick(&FieldType::INT, ColumnType::Unsigned, false).unwrap(), "int");
        assert!(pick(&FieldType::BYTES, ColumnType::Unsigned, false).is_err());
        assert_eq!(pick(&FieldType::BYTES, ColumnType::Varbinary, false).unwrap(), "bytes");
    }

    #[test]
    fn test_year_column_selects_year_handler() {
        assert_eq!(pick(&FieldType::SHORT, ColumnType::Year, false).unwrap(), "year");
        assert_eq!(pick(&FieldType::OBJECT_SHORT, ColumnType::Year, false).unwrap(), "Option<year>");
        assert!(pick(&FieldType::SHORT, ColumnType::Year, true).is_err());
    }

    #[test]
    fn test_lob_selection() {
        assert_eq!(pick(&FieldType::STRING, ColumnType::Text, false).unwrap(), "string lob");
        assert_eq!(pick(&FieldType::BYTES, ColumnType::Blob, false).unwrap(), "bytes lob");
        assert!(pick(&FieldType::BYTES, ColumnType::Blob, true).is_err());
        assert!(pick(&FieldType::STRING, ColumnType::Blob, false).is_err());
    }

    #[test]
    fn test_non_key_types_rejected_as_primary_key() {
        assert!(pick(&FieldType::DOUBLE, ColumnType::Double, true).is_err());
        assert!(pick(&FieldType::BOOLEAN, ColumnType::Bit, true).is_err());
        assert!(pick(&FieldType::DECIMAL, ColumnType::Decimal, true).is_err());
    }

    #[test]
    fn test_mismatch_and_unsupported() {
        assert!(pick(&FieldType::LONG, ColumnType::Int, false).is_err());
        assert!(pick(&FieldType::unsupported("HashMap<u8, u8>"), ColumnType::Int, false).is_err());
        assert!(pick(&FieldType::LONG, ColumnType::Undefined, false).is_err());
        assert_eq!(pick(&FieldType::BIG_INTEGER, ColumnType::Bigunsigned, false).unwrap(), "big integer");
    }

    #[test]
    fn test_no_column_is_virtual() {
        let handler = select(&HandlerSelection {
            field_type: &FieldType::INT,
            column_type: None,
            nullable: true,
            primary_key: false,
            partition_key: false,
            lob: false,
        })
        .unwrap();
        assert_eq!(handler.name(), "virtual");
    }

    #[test]
    fn test_partition_key_must_be_primary_key() {
        let result = select(&HandlerSelection {
            field_type: &FieldType::INT,
            column_type: Some(ColumnType::Int),
            nullable: false,
            primary_key: false,
            partition_key: true,
            lob: false,
        });
        assert!(result.is_err());
    }
}
