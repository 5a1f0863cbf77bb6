//! Key-only container

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clusterbind_core::{Error, Result, Value};
use rust_decimal::Decimal;

use super::ValueHandler;

const DESCRIPTION: &str = "key value handler";

/// Read-only container of primary key values for lookups
///
/// Slots that are not key fields hold NULL. Only the accessors for the
/// types usable as keys work; everything else is a fatal error.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValueHandler {
    values: Vec<Value>,
}

impl KeyValueHandler {
    /// Container over expanded key values
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// All slots
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

impl ValueHandler for KeyValueHandler {
    fn describe(&self) -> &'static str {
        DESCRIPTION
    }

    fn number_of_fields(&self) -> usize {
        self.values.len()
    }

    fn get_object(&self, field: usize) -> Result<Value> {
        self.values.get(field).cloned().ok_or_else(|| {
            Error::fatal(format!(
                "Field number {} out of range for a key with {} fields",
                field,
                self.values.len()
            ))
        })
    }

    fn set_object(&mut self, _field: usize, _value: Value) -> Result<()> {
        Err(Error::unsupported_operation("set_object", DESCRIPTION))
    }

    fn is_modified(&self, _field: usize) -> bool {
        false
    }

    fn mark_modified(&mut self, _field: usize) -> Result<()> {
        Err(Error::unsupported_operation("mark_modified", DESCRIPTION))
    }

    fn reset_modified(&mut self) {}

    unsupported_getters! { DESCRIPTION;
        get_boolean -> bool;
        get_byte -> i8;
        get_short -> i16;
        get_float -> f32;
        get_double -> f64;
        get_object_boolean -> Option<bool>;
        get_object_byte -> Option<i8>;
        get_object_short -> Option<i16>;
        get_object_float -> Option<f32>;
        get_object_double -> Option<f64>;
        get_decimal -> Option<Decimal>;
        get_big_integer -> Option<i128>;
        get_date -> Option<NaiveDate>;
        get_time -> Option<NaiveTime>;
        get_timestamp -> Option<NaiveDateTime>;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> KeyValueHandler {
        KeyValueHandler::new(vec![Value::Int(7), Value::Null, Value::from("k")])
    }

    #[test]
    fn test_key_accessors() {
        let k = key();
        assert_eq!(k.get_int(0).unwrap(), 7);
        assert_eq!(k.get_object_int(0).unwrap(), Some(7));
        assert_eq!(k.get_string(2).unwrap(), Some("k".to_string()));
        assert!(k.is_null(1).unwrap());
        assert!(!k.is_modified(0));
    }

    #[test]
    fn test_non_key_accessors_are_fatal() {
        let k = key();
        assert!(k.get_double(0).unwrap_err().is_fatal());
        assert!(k.get_decimal(0).unwrap_err().is_fatal());
        assert!(k.get_timestamp(1).unwrap_err().is_fatal());
    }

    #[test]
    fn test_read_only() {
        let mut k = key();
        assert!(k.set_int(0, 1).unwrap_err().is_fatal());
        assert!(k.set_found(true).unwrap_err().is_fatal());
        assert_eq!(k.found(), None);
    }
}
