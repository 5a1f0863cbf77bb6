//! Native field types
//!
//! `Native` ties a Rust scalar type to its `Value` variant, its index
//! capabilities, its textual default syntax and the typed engine setters it
//! drives. Every scalar strategy is generic over one of these types.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clusterbind_core::{ColumnDescriptor, FieldKind, Value};
use clusterbind_storage::{
    BinaryCondition, BoundType, IndexScanOperation, Operation, PartitionKey, ScanFilter, StoreResult,
};
use rust_decimal::Decimal;
use std::str::FromStr;

pub(crate) trait Native: Sized + 'static {
    const KIND: FieldKind;
    const HASH_INDEXABLE: bool;
    const ORDERED_INDEXABLE: bool;

    /// Accepts the type's own variant plus lossless widenings
    fn from_value(value: Value) -> Option<Self>;

    fn into_value(self) -> Value;

    /// Zero of a primitive field, empty value of an object field
    fn zero() -> Self;

    fn parse_default(text: &str) -> Option<Self>;

    fn set(self, op: &mut dyn Operation, column: &ColumnDescriptor) -> StoreResult<()>;

    fn cmp(self, filter: &mut dyn ScanFilter, condition: BinaryCondition, column: &ColumnDescriptor) -> StoreResult<()>;

    fn equal(self, op: &mut dyn Operation, column: &ColumnDescriptor) -> StoreResult<()> {
        op.equal_value(column, self.into_value())
    }

    fn bound(self, op: &mut dyn IndexScanOperation, column: &ColumnDescriptor, bound: BoundType) -> StoreResult<()> {
        op.set_bound(column, bound, self.into_value())
    }
}

macro_rules! native {
    (
        $ty:ty => $variant:ident, $kind:ident {
            hash: $hash:expr,
            ordered: $ordered:expr,
            widen: [$($widen:ident),*],
            zero: $zero:expr,
            parse: $parse:expr,
            set: $set:ident,
            cmp: $cmp:ident
            $(, equal: $equal:ident)?
            $(, bound: $bound:ident)?
            $(,)?
        }
    ) => {
        impl Native for $ty {
            const KIND: FieldKind = FieldKind::$kind;
            const HASH_INDEXABLE: bool = $hash;
            const ORDERED_INDEXABLE: bool = $ordered;

            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v),
                    $(Value::$widen(v) => Some(<$ty>::from(v)),)*
                    _ => None,
                }
            }

            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn zero() -> Self {
                $zero
            }

            fn parse_default(text: &str) -> Option<Self> {
                let parse: fn(&str) -> Option<$ty> = $parse;
                parse(text)
            }

            fn set(self, op: &mut dyn Operation, column: &ColumnDescriptor) -> StoreResult<()> {
                op.$set(column, self)
            }

            fn cmp(
                self,
                filter: &mut dyn ScanFilter,
                condition: BinaryCondition,
                column: &ColumnDescriptor,
            ) -> StoreResult<()> {
                filter.$cmp(condition, column, self)
            }

            $(
                fn equal(self, op: &mut dyn Operation, column: &ColumnDescriptor) -> StoreResult<()> {
                    op.$equal(column, self)
                }
            )?

            $(
                fn bound(
                    self,
                    op: &mut dyn IndexScanOperation,
                    column: &ColumnDescriptor,
                    bound: BoundType,
                ) -> StoreResult<()> {
                    op.$bound(column, bound, self)
                }
            )?
        }
    };
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "b'1'" => Some(true),
        "0" | "false" | "b'0'" => Some(false),
        _ => None,
    }
}

fn unquote(text: &str) -> &str {
    let t = text.trim();
    t.strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(t)
}

native!(bool => Bool, Boolean {
    hash: false,
    ordered: false,
    widen: [],
    zero: false,
    parse: parse_bool,
    set: set_bool,
    cmp: cmp_bool,
});

native!(i8 => Byte, Byte {
    hash: true,
    ordered: true,
    widen: [],
    zero: 0,
    parse: |t| t.trim().parse().ok(),
    set: set_byte,
    cmp: cmp_byte,
    equal: equal_byte,
    bound: set_bound_byte,
});

native!(i16 => Short, Short {
    hash: true,
    ordered: true,
    widen: [Byte],
    zero: 0,
    parse: |t| t.trim().parse().ok(),
    set: set_short,
    cmp: cmp_short,
    equal: equal_short,
    bound: set_bound_short,
});

native!(i32 => Int, Int {
    hash: true,
    ordered: true,
    widen: [Byte, Short],
    zero: 0,
    parse: |t| t.trim().parse().ok(),
    set: set_int,
    cmp: cmp_int,
    equal: equal_int,
    bound: set_bound_int,
});

native!(i64 => Long, Long {
    hash: true,
    ordered: true,
    widen: [Byte, Short, Int],
    zero: 0,
    parse: |t| t.trim().parse().ok(),
    set: set_long,
    cmp: cmp_long,
    equal: equal_long,
    bound: set_bound_long,
});

native!(f32 => Float, Float {
    hash: false,
    ordered: true,
    widen: [],
    zero: 0.0,
    parse: |t| t.trim().parse().ok(),
    set: set_float,
    cmp: cmp_float,
    bound: set_bound_float,
});

native!(f64 => Double, Double {
    hash: false,
    ordered: true,
    widen: [Float],
    zero: 0.0,
    parse: |t| t.trim().parse().ok(),
    set: set_double,
    cmp: cmp_double,
    bound: set_bound_double,
});

native!(Decimal => Decimal, Decimal {
    hash: true,
    ordered: true,
    widen: [Int, Long],
    zero: Decimal::ZERO,
    parse: |t| Decimal::from_str(t.trim()).ok(),
    set: set_decimal,
    cmp: cmp_decimal,
    equal: equal_decimal,
    bound: set_bound_decimal,
});

native!(i128 => BigInteger, BigInteger {
    hash: true,
    ordered: true,
    widen: [Byte, Short, Int, Long],
    zero: 0,
    parse: |t| t.trim().parse().ok(),
    set: set_big_integer,
    cmp: cmp_big_integer,
    equal: equal_big_integer,
    bound: set_bound_big_integer,
});

native!(String => String, String {
    hash: true,
    ordered: true,
    widen: [],
    zero: String::new(),
    parse: |t| Some(unquote(t).to_string()),
    set: set_string,
    cmp: cmp_string,
    equal: equal_string,
    bound: set_bound_string,
});

native!(Vec<u8> => Bytes, Bytes {
    hash: true,
    ordered: true,
    widen: [],
    zero: Vec::new(),
    parse: |t| Some(unquote(t).as_bytes().to_vec()),
    set: set_bytes,
    cmp: cmp_bytes,
    equal: equal_bytes,
    bound: set_bound_bytes,
});

native!(NaiveDate => Date, Date {
    hash: true,
    ordered: true,
    widen: [],
    zero: NaiveDate::default(),
    parse: |t| NaiveDate::parse_from_str(unquote(t), "%Y-%m-%d").ok(),
    set: set_date,
    cmp: cmp_date,
    equal: equal_date,
    bound: set_bound_date,
});

native!(NaiveTime => Time, Time {
    hash: true,
    ordered: true,
    widen: [],
    zero: NaiveTime::default(),
    parse: |t| NaiveTime::parse_from_str(unquote(t), "%H:%M:%S").ok(),
    set: set_time,
    cmp: cmp_time,
    equal: equal_time,
    bound: set_bound_time,
});

native!(NaiveDateTime => Timestamp, Timestamp {
    hash: true,
    ordered: true,
    widen: [],
    zero: NaiveDateTime::default(),
    parse: |t| NaiveDateTime::parse_from_str(unquote(t), "%Y-%m-%d %H:%M:%S").ok(),
    set: set_timestamp,
    cmp: cmp_timestamp,
    equal: equal_timestamp,
    bound: set_bound_timestamp,
});

/// Types allowed in primary and partition keys
pub(crate) trait KeyNative: Native {
    fn add_part(&self, key: &mut PartitionKey) -> StoreResult<()>;
}

impl KeyNative for i32 {
    fn add_part(&self, key: &mut PartitionKey) -> StoreResult<()> {
        key.add_int_key(*self)
    }
}

impl KeyNative for i64 {
    fn add_part(&self, key: &mut PartitionKey) -> StoreResult<()> {
        key.add_long_key(*self)
    }
}

impl KeyNative for String {
    fn add_part(&self, key: &mut PartitionKey) -> StoreResult<()> {
        key.add_string_key(self)
    }
}

impl KeyNative for Vec<u8> {
    fn add_part(&self, key: &mut PartitionKey) -> StoreResult<()> {
        key.add_bytes_key(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widening() {
        assert_eq!(i64::from_value(Value::Int(4)), Some(4));
        assert_eq!(i32::from_value(Value::Long(4)), None);
        assert_eq!(Decimal::from_value(Value::Int(3)), Some(Decimal::from(3)));
        assert_eq!(String::from_value(Value::Bytes(vec![1])), None);
    }

    #[test]
    fn test_parse_defaults() {
        assert_eq!(bool::parse_default("b'1'"), Some(true));
        assert_eq!(i32::parse_default(" 42 "), Some(42));
        assert_eq!(i32::parse_default("abc"), None);
        assert_eq!(String::parse_default("'hello'"), Some("hello".to_string()));
        assert_eq!(Decimal::parse_default("0.00"), Some(Decimal::ZERO));
        assert_eq!(
            NaiveDate::parse_default("2024-02-29"),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
    }

    #[test]
    fn test_index_capabilities() {
        assert!(!bool::HASH_INDEXABLE && !bool::ORDERED_INDEXABLE);
        assert!(!f64::HASH_INDEXABLE && f64::ORDERED_INDEXABLE);
        assert!(String::HASH_INDEXABLE && String::ORDERED_INDEXABLE);
    }
}
