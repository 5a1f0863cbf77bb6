//! Operation traits consumed by the binding layer
//!
//! The binding layer never touches rows directly. It drives engine
//! operations through these traits:
//! - `Operation`: one row operation (insert, update, delete, write, read).
//!   Key columns are addressed with `equal_*`, non-key columns with `set_*`,
//!   and columns to fetch are requested with `get_value`.
//! - `ScanOperation`: a table scan with an optional `ScanFilter`
//! - `IndexScanOperation`: an ordered index scan with bounds
//! - `ResultRow`: one fetched row
//!
//! Every typed accessor funnels into a single untyped method, which checks
//! the value against the column's storage class.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clusterbind_core::{ColumnDescriptor, StorageClass, Value};
use rust_decimal::Decimal;

use crate::blob::BlobHandle;
use crate::dictionary::{IndexMeta, TableMeta};
use crate::error::{StoreError, StoreResult};

/// Deferred action run after the owning transaction executes
pub type PostExecuteCallback = Box<dyn FnOnce() -> StoreResult<()> + Send>;

// ============================================================================
// Enums
// ============================================================================

/// Kind of a row operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Insert a new row; fails if the key exists
    Insert,
    /// Update an existing row; fails if the key is absent
    Update,
    /// Delete an existing row; fails if the key is absent
    Delete,
    /// Insert or overwrite
    Write,
    /// Read by primary key
    Read,
    /// Read by unique index
    UniqueRead,
    /// Full table scan
    TableScan,
    /// Ordered index scan
    IndexScan,
}

impl OperationKind {
    /// Whether operations of this kind change data
    pub fn is_write(self) -> bool {
        matches!(
            self,
            OperationKind::Insert | OperationKind::Update | OperationKind::Delete | OperationKind::Write
        )
    }

    /// Whether `set_*` accessors are valid
    pub fn accepts_values(self) -> bool {
        matches!(
            self,
            OperationKind::Insert | OperationKind::Update | OperationKind::Write
        )
    }

    /// Whether `get_value` is valid
    pub fn returns_rows(self) -> bool {
        matches!(
            self,
            OperationKind::Read
                | OperationKind::UniqueRead
                | OperationKind::TableScan
                | OperationKind::IndexScan
        )
    }
}

/// Bound type for an index scan
///
/// The bound is read as "column <op> value": `Ge` means the column must be
/// greater than or equal to the bound value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundType {
    /// column == value
    Eq,
    /// column >= value
    Ge,
    /// column > value
    Gt,
    /// column <= value
    Le,
    /// column < value
    Lt,
}

impl BoundType {
    /// Whether the bound constrains the low end of the range
    pub fn is_lower(self) -> bool {
        matches!(self, BoundType::Eq | BoundType::Ge | BoundType::Gt)
    }

    /// Whether the bound constrains the high end of the range
    pub fn is_upper(self) -> bool {
        matches!(self, BoundType::Eq | BoundType::Le | BoundType::Lt)
    }
}

/// Comparison used in scan filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryCondition {
    /// column == value
    Eq,
    /// column != value
    Ne,
    /// column < value
    Lt,
    /// column <= value
    Le,
    /// column > value
    Gt,
    /// column >= value
    Ge,
    /// column LIKE pattern
    Like,
    /// column NOT LIKE pattern
    NotLike,
}

/// Grouping operator of a scan filter group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterGroup {
    /// All members true
    And,
    /// Any member true
    Or,
    /// Not all members true
    Nand,
    /// No member true
    Nor,
}

/// Row lock mode for reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LockMode {
    /// Latest committed value, no lock
    #[default]
    ReadCommitted,
    /// Shared lock
    Shared,
    /// Exclusive lock
    Exclusive,
}

impl std::str::FromStr for LockMode {
    type Err = StoreError;

    fn from_str(s: &str) -> StoreResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "read_committed" | "readcommitted" => Ok(LockMode::ReadCommitted),
            "shared" => Ok(LockMode::Shared),
            "exclusive" => Ok(LockMode::Exclusive),
            other => Err(StoreError::InvalidOperation(format!("unknown lock mode {}", other))),
        }
    }
}

/// What `execute` does after running pending operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecType {
    /// Run operations, keep the transaction open
    NoCommit,
    /// Run operations and commit
    Commit,
    /// Discard everything
    Rollback,
}

/// Error handling for `execute`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AbortOption {
    /// The first failing operation fails the execute
    #[default]
    AbortOnError,
    /// Failing operations are recorded and skipped
    IgnoreError,
}

// ============================================================================
// Storage class checks
// ============================================================================

/// Check that a value may be stored in a column
///
/// `Null` is accepted for nullable columns only.
pub fn check_column_value(column: &ColumnDescriptor, value: &Value) -> StoreResult<()> {
    let ok = match (column.storage_class(), value) {
        (_, Value::Null) => {
            return if column.nullable {
                Ok(())
            } else {
                Err(StoreError::NullNotAllowed {
                    column: column.name.clone(),
                })
            }
        }
        (StorageClass::Bool, Value::Bool(_))
        | (StorageClass::Byte, Value::Byte(_))
        | (StorageClass::Short, Value::Short(_))
        | (StorageClass::Int, Value::Int(_))
        | (StorageClass::Long, Value::Long(_))
        | (StorageClass::Float, Value::Float(_))
        | (StorageClass::Double, Value::Double(_))
        | (StorageClass::Decimal, Value::Decimal(_))
        | (StorageClass::BigInteger, Value::BigInteger(_))
        | (StorageClass::String, Value::String(_))
        | (StorageClass::Bytes, Value::Bytes(_))
        | (StorageClass::Date, Value::Date(_))
        | (StorageClass::Time, Value::Time(_))
        | (StorageClass::Timestamp, Value::Timestamp(_)) => true,
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(mismatch(column, value))
    }
}

fn mismatch(column: &ColumnDescriptor, value: &Value) -> StoreError {
    StoreError::TypeMismatch {
        column: column.name.clone(),
        expected: column.storage_class(),
        actual: value.type_name(),
    }
}

// ============================================================================
// Operation
// ============================================================================

macro_rules! typed_equal {
    ($($name:ident($ty:ty) => $variant:ident;)*) => {
        $(
            #[doc = concat!("Equality on a key column from a `", stringify!($ty), "`")]
            fn $name(&mut self, column: &ColumnDescriptor, value: $ty) -> StoreResult<()> {
                self.equal_value(column, Value::$variant(value))
            }
        )*
    };
}

macro_rules! typed_set {
    ($($name:ident($ty:ty) => $variant:ident;)*) => {
        $(
            #[doc = concat!("Set a column from a `", stringify!($ty), "`")]
            fn $name(&mut self, column: &ColumnDescriptor, value: $ty) -> StoreResult<()> {
                self.set_value(column, Value::$variant(value))
            }
        )*
    };
}

/// One row operation
pub trait Operation {
    /// Table the operation addresses
    fn table(&self) -> &TableMeta;

    /// Kind of operation
    fn kind(&self) -> OperationKind;

    /// Constrain a key column to a value
    fn equal_value(&mut self, column: &ColumnDescriptor, value: Value) -> StoreResult<()>;

    /// Assign a non-key column
    fn set_value(&mut self, column: &ColumnDescriptor, value: Value) -> StoreResult<()>;

    /// Request a column to be fetched
    fn get_value(&mut self, column: &ColumnDescriptor) -> StoreResult<()>;

    /// Blob handle for a LOB column
    ///
    /// The handle becomes readable and writable once the owning transaction
    /// has executed this operation.
    fn get_blob_handle(&mut self, column: &ColumnDescriptor) -> StoreResult<BlobHandle>;

    /// Queue work to run after the owning transaction executes
    fn post_execute_callback(&mut self, callback: PostExecuteCallback);

    typed_equal! {
        equal_byte(i8) => Byte;
        equal_short(i16) => Short;
        equal_int(i32) => Int;
        equal_long(i64) => Long;
        equal_decimal(Decimal) => Decimal;
        equal_big_integer(i128) => BigInteger;
        equal_string(String) => String;
        equal_bytes(Vec<u8>) => Bytes;
        equal_date(NaiveDate) => Date;
        equal_time(NaiveTime) => Time;
        equal_timestamp(NaiveDateTime) => Timestamp;
    }

    typed_set! {
        set_bool(bool) => Bool;
        set_byte(i8) => Byte;
        set_short(i16) => Short;
        set_int(i32) => Int;
        set_long(i64) => Long;
        set_float(f32) => Float;
        set_double(f64) => Double;
        set_decimal(Decimal) => Decimal;
        set_big_integer(i128) => BigInteger;
        set_string(String) => String;
        set_bytes(Vec<u8>) => Bytes;
        set_date(NaiveDate) => Date;
        set_time(NaiveTime) => Time;
        set_timestamp(NaiveDateTime) => Timestamp;
    }

    /// Set a column to NULL
    fn set_null(&mut self, column: &ColumnDescriptor) -> StoreResult<()> {
        self.set_value(column, Value::Null)
    }
}

// ============================================================================
// Scans
// ============================================================================

macro_rules! typed_cmp {
    ($($name:ident($ty:ty) => $variant:ident;)*) => {
        $(
            #[doc = concat!("Compare a column against a `", stringify!($ty), "`")]
            fn $name(
                &mut self,
                condition: BinaryCondition,
                column: &ColumnDescriptor,
                value: $ty,
            ) -> StoreResult<()> {
                self.cmp(condition, column, Value::$variant(value))
            }
        )*
    };
}

/// Builder for a scan filter
///
/// Comparisons must be nested inside a `begin`/`end` group.
pub trait ScanFilter {
    /// Open a group
    fn begin(&mut self, group: FilterGroup) -> StoreResult<()>;

    /// Close the innermost group
    fn end(&mut self) -> StoreResult<()>;

    /// Add a comparison
    fn cmp(&mut self, condition: BinaryCondition, column: &ColumnDescriptor, value: Value) -> StoreResult<()>;

    /// Add an IS NULL test
    fn is_null(&mut self, column: &ColumnDescriptor) -> StoreResult<()>;

    /// Add an IS NOT NULL test
    fn is_not_null(&mut self, column: &ColumnDescriptor) -> StoreResult<()>;

    typed_cmp! {
        cmp_bool(bool) => Bool;
        cmp_byte(i8) => Byte;
        cmp_short(i16) => Short;
        cmp_int(i32) => Int;
        cmp_long(i64) => Long;
        cmp_float(f32) => Float;
        cmp_double(f64) => Double;
        cmp_decimal(Decimal) => Decimal;
        cmp_big_integer(i128) => BigInteger;
        cmp_string(String) => String;
        cmp_bytes(Vec<u8>) => Bytes;
        cmp_date(NaiveDate) => Date;
        cmp_time(NaiveTime) => Time;
        cmp_timestamp(NaiveDateTime) => Timestamp;
    }
}

/// A table scan
pub trait ScanOperation: Operation {
    /// Filter applied to every scanned row
    fn filter(&mut self) -> &mut dyn ScanFilter;

    /// Lock mode for scanned rows
    fn set_lock_mode(&mut self, mode: LockMode);
}

macro_rules! typed_bound {
    ($($name:ident($ty:ty) => $variant:ident;)*) => {
        $(
            #[doc = concat!("Bound a column by a `", stringify!($ty), "`")]
            fn $name(&mut self, column: &ColumnDescriptor, bound: BoundType, value: $ty) -> StoreResult<()> {
                self.set_bound(column, bound, Value::$variant(value))
            }
        )*
    };
}

/// An ordered index scan
pub trait IndexScanOperation: ScanOperation {
    /// Index being scanned
    fn index(&self) -> &IndexMeta;

    /// Bound an index column
    fn set_bound(&mut self, column: &ColumnDescriptor, bound: BoundType, value: Value) -> StoreResult<()>;

    typed_bound! {
        set_bound_byte(i8) => Byte;
        set_bound_short(i16) => Short;
        set_bound_int(i32) => Int;
        set_bound_long(i64) => Long;
        set_bound_float(f32) => Float;
        set_bound_double(f64) => Double;
        set_bound_decimal(Decimal) => Decimal;
        set_bound_big_integer(i128) => BigInteger;
        set_bound_string(String) => String;
        set_bound_bytes(Vec<u8>) => Bytes;
        set_bound_date(NaiveDate) => Date;
        set_bound_time(NaiveTime) => Time;
        set_bound_timestamp(NaiveDateTime) => Timestamp;
    }
}

// ============================================================================
// Result rows
// ============================================================================

macro_rules! primitive_get {
    ($($name:ident -> $ty:ty, $variant:ident, $zero:expr;)*) => {
        $(
            #[doc = concat!("Read a column as `", stringify!($ty), "`; NULL reads as zero")]
            fn $name(&self, column: &ColumnDescriptor) -> StoreResult<$ty> {
                match self.value(column)? {
                    Value::$variant(v) => Ok(v),
                    Value::Null => Ok($zero),
                    other => Err(mismatch(column, &other)),
                }
            }
        )*
    };
}

macro_rules! object_get {
    ($($name:ident -> $ty:ty, $variant:ident;)*) => {
        $(
            #[doc = concat!("Read a column as `Option<", stringify!($ty), ">`")]
            fn $name(&self, column: &ColumnDescriptor) -> StoreResult<Option<$ty>> {
                match self.value(column)? {
                    Value::$variant(v) => Ok(Some(v)),
                    Value::Null => Ok(None),
                    other => Err(mismatch(column, &other)),
                }
            }
        )*
    };
}

/// One fetched row
pub trait ResultRow {
    /// Raw value of a fetched column
    fn value(&self, column: &ColumnDescriptor) -> StoreResult<Value>;

    /// Blob handle for a fetched LOB column
    fn get_blob(&self, column: &ColumnDescriptor) -> StoreResult<BlobHandle>;

    /// Whether the column is NULL
    fn is_null(&self, column: &ColumnDescriptor) -> StoreResult<bool> {
        Ok(self.value(column)?.is_null())
    }

    primitive_get! {
        get_bool -> bool, Bool, false;
        get_byte -> i8, Byte, 0;
        get_short -> i16, Short, 0;
        get_int -> i32, Int, 0;
        get_long -> i64, Long, 0;
        get_float -> f32, Float, 0.0;
        get_double -> f64, Double, 0.0;
    }

    object_get! {
        get_decimal -> Decimal, Decimal;
        get_big_integer -> i128, BigInteger;
        get_string -> String, String;
        get_bytes -> Vec<u8>, Bytes;
        get_date -> NaiveDate, Date;
        get_time -> NaiveTime, Time;
        get_timestamp -> NaiveDateTime, Timestamp;
    }
}
