//! Column metadata
//!
//! A `ColumnDescriptor` is the normalized description of one dictionary
//! column. It is read once per table from the engine dictionary and copied
//! into every field handler that maps it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage type of a column, as reported by the engine dictionary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum ColumnType {
    Bigint,
    Bigunsigned,
    Binary,
    Bit,
    Blob,
    Char,
    Date,
    Datetime,
    Datetime2,
    Decimal,
    Decimalunsigned,
    Double,
    Float,
    Int,
    Longvarbinary,
    Longvarchar,
    Mediumint,
    Mediumunsigned,
    Olddecimal,
    Olddecimalunsigned,
    Smallint,
    Smallunsigned,
    Text,
    Time,
    Time2,
    Timestamp,
    Timestamp2,
    Tinyint,
    Tinyunsigned,
    Undefined,
    Unsigned,
    Varbinary,
    Varchar,
    Year,
}

/// Physical representation a column's values take inside the engine
///
/// Typed operation setters must match the storage class of the column they
/// address; the engine rejects e.g. `set_int` on a `Varchar` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageClass {
    /// Single bit / boolean
    Bool,
    /// 8-bit integer (also used by `Year`)
    Byte,
    /// 16-bit integer
    Short,
    /// 32-bit integer
    Int,
    /// 64-bit integer
    Long,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// Fixed-point decimal
    Decimal,
    /// 128-bit integer (unsigned bigint)
    BigInteger,
    /// Character data
    String,
    /// Binary data
    Bytes,
    /// Calendar date
    Date,
    /// Time of day
    Time,
    /// Date and time
    Timestamp,
    /// No usable representation
    Unsupported,
}

impl ColumnType {
    /// Storage class used by the engine for values of this column type
    ///
    /// `Unsigned` is a 32-bit integer column; it does not share the
    /// `Varbinary` representation.
    pub fn storage_class(self) -> StorageClass {
        use ColumnType::*;
        match self {
            Bit => StorageClass::Bool,
            Tinyint | Tinyunsigned | Year => StorageClass::Byte,
            Smallint | Smallunsigned => StorageClass::Short,
            Int | Mediumint | Mediumunsigned | Unsigned => StorageClass::Int,
            Bigint => StorageClass::Long,
            Bigunsigned => StorageClass::BigInteger,
            Float => StorageClass::Float,
            Double => StorageClass::Double,
            Decimal | Decimalunsigned | Olddecimal | Olddecimalunsigned => StorageClass::Decimal,
            Char | Varchar | Longvarchar | Text => StorageClass::String,
            Binary | Varbinary | Longvarbinary | Blob => StorageClass::Bytes,
            Date => StorageClass::Date,
            Time | Time2 => StorageClass::Time,
            Datetime | Datetime2 | Timestamp | Timestamp2 => StorageClass::Timestamp,
            Undefined => StorageClass::Unsupported,
        }
    }

    /// Byte columns whose stored byte is ordered as `u8`
    ///
    /// A `Year` column holds `year - 1900` truncated to a signed byte, so
    /// 2028..=2155 are negative bytes that must still sort after 2027.
    pub fn orders_unsigned(self) -> bool {
        matches!(self, ColumnType::Tinyunsigned | ColumnType::Year)
    }

    /// Large-object columns, written through blob handles
    pub fn is_lob(self) -> bool {
        matches!(self, ColumnType::Blob | ColumnType::Text)
    }

    /// Character columns (the charset applies)
    pub fn is_character(self) -> bool {
        matches!(
            self,
            ColumnType::Char | ColumnType::Varchar | ColumnType::Longvarchar | ColumnType::Text
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Normalized description of one database column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name
    pub name: String,
    /// Storage type
    pub column_type: ColumnType,
    /// Position of the column in its table
    pub ordinal: usize,
    /// Whether the column accepts NULL
    pub nullable: bool,
    /// Whether the column is part of the primary key
    pub primary_key: bool,
    /// Whether the column is part of the partition (distribution) key
    pub partition_key: bool,
    /// Decimal precision
    pub precision: u32,
    /// Decimal scale
    pub scale: u32,
    /// Maximum length in bytes for character and binary columns
    pub length: usize,
    /// Character set name for character columns
    pub charset: Option<String>,
    /// Column default, as dictionary text
    pub default_value: Option<String>,
}

impl ColumnDescriptor {
    /// Create a nullable, non-key column with zero precision
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        let charset = column_type.is_character().then(|| "utf8mb4".to_string());
        Self {
            name: name.into(),
            column_type,
            ordinal: 0,
            nullable: true,
            primary_key: false,
            partition_key: false,
            precision: 0,
            scale: 0,
            length: 0,
            charset,
            default_value: None,
        }
    }

    /// Mark the column NOT NULL
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Set precision and scale
    pub fn with_precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }

    /// Set maximum length
    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    /// Set the dictionary default text
    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }

    /// Set the character set name
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    /// Storage class of this column
    pub fn storage_class(&self) -> StorageClass {
        self.column_type.storage_class()
    }

    /// Whether this is a blob/text column
    pub fn is_lob(&self) -> bool {
        self.column_type.is_lob()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsigned_and_varbinary_are_distinct() {
        assert_eq!(ColumnType::Unsigned.storage_class(), StorageClass::Int);
        assert_eq!(ColumnType::Varbinary.storage_class(), StorageClass::Bytes);
    }

    #[test]
    fn test_year_is_byte_storage() {
        assert_eq!(ColumnType::Year.storage_class(), StorageClass::Byte);
        assert!(ColumnType::Year.orders_unsigned());
        assert!(!ColumnType::Tinyint.orders_unsigned());
    }

    #[test]
    fn test_lob_types() {
        assert!(ColumnType::Blob.is_lob());
        assert!(ColumnType::Text.is_lob());
        assert!(!ColumnType::Longvarbinary.is_lob());
    }

    #[test]
    fn test_descriptor_builder() {
        let col = ColumnDescriptor::new("salary", ColumnType::Decimal)
            .with_precision(10, 2)
            .with_default("0.00");
        assert!(col.nullable);
        assert_eq!(col.scale, 2);
        assert_eq!(col.default_value.as_deref(), Some("0.00"));
        assert!(col.charset.is_none());
    }

    #[test]
    fn test_character_column_gets_charset() {
        let col = ColumnDescriptor::new("name", ColumnType::Varchar).not_null();
        assert!(!col.nullable);
        assert_eq!(col.charset.as_deref(), Some("utf8mb4"));
    }
}
