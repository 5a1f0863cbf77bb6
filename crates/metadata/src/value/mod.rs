//! Value containers
//!
//! A `ValueHandler` stores the field values of one object instance (or one
//! row of query parameters), addressed by field number, plus a modified bit
//! per field. Three variants share the interface:
//! - `LiveValueHandler`: backs a user-visible instance; every accessor works
//! - `KeyValueHandler`: read-only primary key values for lookups; only the
//!   key-capable accessors (int, long, string, bytes) work
//! - `BatchValueHandler`: read view over positional statement parameters;
//!   "modified" means "has a bound parameter"

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clusterbind_core::{Error, Result, Value};
use rust_decimal::Decimal;

/// Error for a typed read of a field holding another type
pub(crate) fn type_error(field: usize, expected: &str, actual: &Value) -> Error {
    Error::user(format!(
        "Field number {} holds a {} value, not {}",
        field,
        actual.type_name(),
        expected
    ))
}

macro_rules! primitive_getters {
    ($($name:ident -> $ty:ty, $variant:ident, $zero:expr;)*) => {
        $(
            #[doc = concat!("Read a field as `", stringify!($ty), "`; NULL reads as zero")]
            fn $name(&self, field: usize) -> Result<$ty> {
                match self.get_object(field)? {
                    Value::$variant(v) => Ok(v),
                    Value::Null => Ok($zero),
                    other => Err(type_error(field, stringify!($ty), &other)),
                }
            }
        )*
    };
}

macro_rules! object_getters {
    ($($name:ident -> $ty:ty, $variant:ident;)*) => {
        $(
            #[doc = concat!("Read a field as `Option<", stringify!($ty), ">`")]
            fn $name(&self, field: usize) -> Result<Option<$ty>> {
                match self.get_object(field)? {
                    Value::$variant(v) => Ok(Some(v)),
                    Value::Null => Ok(None),
                    other => Err(type_error(field, stringify!($ty), &other)),
                }
            }
        )*
    };
}

macro_rules! primitive_setters {
    ($($name:ident($ty:ty) => $variant:ident;)*) => {
        $(
            #[doc = concat!("Write a `", stringify!($ty), "` field")]
            fn $name(&mut self, field: usize, value: $ty) -> Result<()> {
                self.set_object(field, Value::$variant(value))
            }
        )*
    };
}

macro_rules! object_setters {
    ($($name:ident($ty:ty) => $variant:ident;)*) => {
        $(
            #[doc = concat!("Write an `Option<", stringify!($ty), ">` field")]
            fn $name(&mut self, field: usize, value: Option<$ty>) -> Result<()> {
                self.set_object(field, value.map_or(Value::Null, Value::$variant))
            }
        )*
    };
}

/// Typed getters a container does not support
macro_rules! unsupported_getters {
    ($on:expr; $($name:ident -> $ty:ty;)*) => {
        $(
            fn $name(&self, _field: usize) -> Result<$ty> {
                Err(Error::unsupported_operation(stringify!($name), $on))
            }
        )*
    };
}

mod batch;
mod key;
mod live;

pub use batch::BatchValueHandler;
pub use key::KeyValueHandler;
pub use live::{LiveValueHandler, ModificationObserver};

/// Field-number-indexed value storage
pub trait ValueHandler {
    /// Short description used in error messages
    fn describe(&self) -> &'static str;

    /// Number of field slots
    fn number_of_fields(&self) -> usize;

    /// Boxed value of a field
    fn get_object(&self, field: usize) -> Result<Value>;

    /// Replace the value of a field, marking it modified
    fn set_object(&mut self, field: usize, value: Value) -> Result<()>;

    /// Whether a field is modified
    fn is_modified(&self, field: usize) -> bool;

    /// Mark a field modified without changing it
    fn mark_modified(&mut self, field: usize) -> Result<()>;

    /// Clear every modified bit
    fn reset_modified(&mut self);

    /// Whether a field holds NULL
    fn is_null(&self, field: usize) -> Result<bool> {
        Ok(self.get_object(field)?.is_null())
    }

    /// Result of the last load: `Some(true)` found, `Some(false)` not
    /// found, `None` never loaded
    fn found(&self) -> Option<bool> {
        None
    }

    /// Record the result of a load
    fn set_found(&mut self, _found: bool) -> Result<()> {
        Err(Error::unsupported_operation("set_found", self.describe()))
    }

    primitive_getters! {
        get_boolean -> bool, Bool, false;
        get_byte -> i8, Byte, 0;
        get_short -> i16, Short, 0;
        get_int -> i32, Int, 0;
        get_long -> i64, Long, 0;
        get_float -> f32, Float, 0.0;
        get_double -> f64, Double, 0.0;
    }

    object_getters! {
        get_object_boolean -> bool, Bool;
        get_object_byte -> i8, Byte;
        get_object_short -> i16, Short;
        get_object_int -> i32, Int;
        get_object_long -> i64, Long;
        get_object_float -> f32, Float;
        get_object_double -> f64, Double;
        get_decimal -> Decimal, Decimal;
        get_big_integer -> i128, BigInteger;
        get_string -> String, String;
        get_bytes -> Vec<u8>, Bytes;
        get_date -> NaiveDate, Date;
        get_time -> NaiveTime, Time;
        get_timestamp -> NaiveDateTime, Timestamp;
    }

    primitive_setters! {
        set_boolean(bool) => Bool;
        set_byte(i8) => Byte;
        set_short(i16) => Short;
        set_int(i32) => Int;
        set_long(i64) => Long;
        set_float(f32) => Float;
        set_double(f64) => Double;
    }

    object_setters! {
        set_object_boolean(bool) => Bool;
        set_object_byte(i8) => Byte;
        set_object_short(i16) => Short;
        set_object_int(i32) => Int;
        set_object_long(i64) => Long;
        set_object_float(f32) => Float;
        set_object_double(f64) => Double;
        set_decimal(Decimal) => Decimal;
        set_big_integer(i128) => BigInteger;
        set_string(String) => String;
        set_bytes(Vec<u8>) => Bytes;
        set_date(NaiveDate) => Date;
        set_time(NaiveTime) => Time;
        set_timestamp(NaiveDateTime) => Timestamp;
    }
}
