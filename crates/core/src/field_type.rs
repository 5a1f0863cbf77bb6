//! Declared types of mapped domain fields
//!
//! A field is declared either as a *primitive* (a non-nullable native
//! scalar such as `i32`, zero-initialised in a fresh instance) or as an
//! *object* type (`Option<i32>`, `String`, `Vec<u8>`, ...) which can hold
//! null. Types the binding layer cannot map are carried as
//! `FieldType::Unsupported` so that analysis can report them instead of
//! failing early.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::column::{ColumnType, StorageClass};
use crate::value::Value;

/// Scalar kind of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum FieldKind {
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Decimal,
    BigInteger,
    String,
    Bytes,
    Date,
    Time,
    Timestamp,
}

impl FieldKind {
    /// Kinds that have a primitive (non-nullable) form
    pub fn has_primitive_form(self) -> bool {
        matches!(
            self,
            FieldKind::Boolean
                | FieldKind::Byte
                | FieldKind::Short
                | FieldKind::Int
                | FieldKind::Long
                | FieldKind::Float
                | FieldKind::Double
        )
    }

    /// Native zero value for primitive kinds
    pub fn zero_value(self) -> Value {
        match self {
            FieldKind::Boolean => Value::Bool(false),
            FieldKind::Byte => Value::Byte(0),
            FieldKind::Short => Value::Short(0),
            FieldKind::Int => Value::Int(0),
            FieldKind::Long => Value::Long(0),
            FieldKind::Float => Value::Float(0.0),
            FieldKind::Double => Value::Double(0.0),
            _ => Value::Null,
        }
    }

    fn native_name(self) -> &'static str {
        match self {
            FieldKind::Boolean => "bool",
            FieldKind::Byte => "i8",
            FieldKind::Short => "i16",
            FieldKind::Int => "i32",
            FieldKind::Long => "i64",
            FieldKind::Float => "f32",
            FieldKind::Double => "f64",
            FieldKind::Decimal => "Decimal",
            FieldKind::BigInteger => "i128",
            FieldKind::String => "String",
            FieldKind::Bytes => "Vec<u8>",
            FieldKind::Date => "NaiveDate",
            FieldKind::Time => "NaiveTime",
            FieldKind::Timestamp => "NaiveDateTime",
        }
    }
}

/// Declared type of a domain field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// Non-nullable native scalar
    Primitive(FieldKind),
    /// Nullable boxed value
    Object(FieldKind),
    /// A type the binding layer has no handler for
    Unsupported(String),
}

impl FieldType {
    /// `bool`
    pub const BOOLEAN: FieldType = FieldType::Primitive(FieldKind::Boolean);
    /// `i8`
    pub const BYTE: FieldType = FieldType::Primitive(FieldKind::Byte);
    /// `i16`
    pub const SHORT: FieldType = FieldType::Primitive(FieldKind::Short);
    /// `i32`
    pub const INT: FieldType = FieldType::Primitive(FieldKind::Int);
    /// `i64`
    pub const LONG: FieldType = FieldType::Primitive(FieldKind::Long);
    /// `f32`
    pub const FLOAT: FieldType = FieldType::Primitive(FieldKind::Float);
    /// `f64`
    pub const DOUBLE: FieldType = FieldType::Primitive(FieldKind::Double);
    /// `Option<i32>`
    pub const OBJECT_INT: FieldType = FieldType::Object(FieldKind::Int);
    /// `Option<i64>`
    pub const OBJECT_LONG: FieldType = FieldType::Object(FieldKind::Long);
    /// `Option<i16>`
    pub const OBJECT_SHORT: FieldType = FieldType::Object(FieldKind::Short);
    /// `String`
    pub const STRING: FieldType = FieldType::Object(FieldKind::String);
    /// `Vec<u8>`
    pub const BYTES: FieldType = FieldType::Object(FieldKind::Bytes);
    /// `Decimal`
    pub const DECIMAL: FieldType = FieldType::Object(FieldKind::Decimal);
    /// `i128`
    pub const BIG_INTEGER: FieldType = FieldType::Object(FieldKind::BigInteger);
    /// `NaiveDate`
    pub const DATE: FieldType = FieldType::Object(FieldKind::Date);
    /// `NaiveTime`
    pub const TIME: FieldType = FieldType::Object(FieldKind::Time);
    /// `NaiveDateTime`
    pub const TIMESTAMP: FieldType = FieldType::Object(FieldKind::Timestamp);

    /// Boxed form of a kind
    pub fn object(kind: FieldKind) -> Self {
        FieldType::Object(kind)
    }

    /// Primitive form of a kind, or the boxed form if it has none
    pub fn primitive(kind: FieldKind) -> Self {
        if kind.has_primitive_form() {
            FieldType::Primitive(kind)
        } else {
            FieldType::Object(kind)
        }
    }

    /// An unmappable type, by name
    pub fn unsupported(name: impl Into<String>) -> Self {
        FieldType::Unsupported(name.into())
    }

    /// Scalar kind, if supported
    pub fn kind(&self) -> Option<FieldKind> {
        match self {
            FieldType::Primitive(k) | FieldType::Object(k) => Some(*k),
            FieldType::Unsupported(_) => None,
        }
    }

    /// Whether this is a primitive (non-nullable, zero-initialised) type
    pub fn is_primitive(&self) -> bool {
        matches!(self, FieldType::Primitive(_))
    }

    /// Whether a runtime value is assignable to this type
    ///
    /// Primitive and boxed forms of the same kind accept the same values;
    /// only object types accept `Null`.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (FieldType::Unsupported(_), _) => false,
            (FieldType::Primitive(_), Value::Null) => false,
            (FieldType::Object(_), Value::Null) => true,
            (t, v) => t.kind() == v.kind(),
        }
    }

    /// Natural field type for a column when deriving a mapping from a table
    pub fn for_column(column_type: ColumnType, nullable: bool) -> Self {
        let kind = match column_type.storage_class() {
            StorageClass::Bool => FieldKind::Boolean,
            StorageClass::Byte if column_type == ColumnType::Year => FieldKind::Short,
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
            StorageClass::Unsupported => return FieldType::unsupported(column_type.to_string()),
        };
        if nullable {
            FieldType::object(kind)
        } else {
            FieldType::primitive(kind)
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Primitive(k) => write!(f, "{}", k.native_name()),
            FieldType::Object(k) if k.has_primitive_form() => {
                write!(f, "Option<{}>", k.native_name())
            }
            FieldType::Object(k) => write!(f, "{}", k.native_name()),
            FieldType::Unsupported(name) => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_rejects_null() {
        assert!(!FieldType::INT.accepts(&Value::Null));
        assert!(FieldType::OBJECT_INT.accepts(&Value::Null));
    }

    #[test]
    fn test_primitive_and_object_accept_same_kind() {
        assert!(FieldType::INT.accepts(&Value::Int(3)));
        assert!(FieldType::OBJECT_INT.accepts(&Value::Int(3)));
        assert!(!FieldType::LONG.accepts(&Value::Int(3)));
    }

    #[test]
    fn test_primitive_of_string_is_object() {
        assert_eq!(FieldType::primitive(FieldKind::String), FieldType::STRING);
    }

    #[test]
    fn test_display() {
        assert_eq!(FieldType::INT.to_string(), "i32");
        assert_eq!(FieldType::OBJECT_INT.to_string(), "Option<i32>");
        assert_eq!(FieldType::BYTES.to_string(), "Vec<u8>");
        assert_eq!(FieldType::unsupported("HashMap<u8, u8>").to_string(), "HashMap<u8, u8>");
    }

    #[test]
    fn test_for_column() {
        assert_eq!(FieldType::for_column(ColumnType::Int, false), FieldType::INT);
        assert_eq!(FieldType::for_column(ColumnType::Int, true), FieldType::OBJECT_INT);
        assert_eq!(FieldType::for_column(ColumnType::Year, false), FieldType::SHORT);
        assert_eq!(FieldType::for_column(ColumnType::Text, true), FieldType::STRING);
        assert!(matches!(
            FieldType::for_column(ColumnType::Undefined, true),
            FieldType::Unsupported(_)
        ));
    }
}
