//! Mapped instances
//!
//! A `DynamicObject` pairs a domain type handler with a live value
//! container. Fields are addressed by name or by field number; every write
//! goes through the field handler, so type checks, LOB validation and the
//! modified bit behave exactly as they do for the binding layer itself.

use clusterbind_core::{Error, Result, Value};
use clusterbind_metadata::{DomainTypeHandler, FieldHandler, LiveValueHandler, ModificationObserver, ValueHandler};
use clusterbind_storage::ResultRow;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;

/// One instance of a mapped type
pub struct DynamicObject {
    handler: Arc<DomainTypeHandler>,
    values: LiveValueHandler,
}

impl fmt::Debug for DynamicObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.handler.type_name());
        for field in self.handler.fields() {
            match self.values.get_object(field.number()) {
                Ok(value) => s.field(field.name(), &value),
                Err(_) => s.field(field.name(), &"<unreadable>"),
            };
        }
        s.finish()
    }
}

impl DynamicObject {
    /// New instance with every field at its default and nothing modified
    pub fn new(handler: Arc<DomainTypeHandler>) -> Result<Self> {
        let values = handler.new_instance()?;
        Ok(Self { handler, values })
    }

    /// Instance loaded from a fetched row
    ///
    /// Fields whose columns were not fetched keep their defaults.
    pub fn from_row(handler: Arc<DomainTypeHandler>, row: &dyn ResultRow) -> Result<Self> {
        let mut object = Self::new(handler)?;
        object.handler.object_set_values(row, &mut object.values)?;
        object.values.reset_modified();
        object.values.set_found(true)?;
        Ok(object)
    }

    /// Type handler
    pub fn handler(&self) -> &Arc<DomainTypeHandler> {
        &self.handler
    }

    /// Mapped type name
    pub fn type_name(&self) -> &str {
        self.handler.type_name()
    }

    /// Underlying container
    pub fn values(&self) -> &LiveValueHandler {
        &self.values
    }

    /// Underlying container, mutably
    pub fn values_mut(&mut self) -> &mut LiveValueHandler {
        &mut self.values
    }

    // ------------------------------------------------------------------------
    // Field access
    // ------------------------------------------------------------------------

    /// Read a field by name
    pub fn get(&self, field: &str) -> Result<Value> {
        self.handler.require_field(field)?.object_get_value(&self.values)
    }

    /// Write a field by name
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        let number = self.handler.require_field(field)?.number();
        self.set_number(number, value)
    }

    /// Read a field by number
    pub fn get_number(&self, number: usize) -> Result<Value> {
        self.field(number)?.object_get_value(&self.values)
    }

    /// Write a field by number
    pub fn set_number(&mut self, number: usize, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let handler = Arc::clone(&self.handler);
        let field = handler
            .field(number)
            .ok_or_else(|| no_such_field(&handler, number))?;
        if !field.field_type().accepts(&value) {
            return Err(Error::user(format!(
                "Field {} of type {} cannot hold a {} value",
                field.name(),
                field.field_type(),
                value.type_name()
            )));
        }
        field.object_set_value(&mut self.values, value)
    }

    fn field(&self, number: usize) -> Result<&FieldHandler> {
        self.handler
            .field(number)
            .ok_or_else(|| no_such_field(&self.handler, number))
    }

    /// Read an `INT` field
    pub fn get_int(&self, field: &str) -> Result<Option<i32>> {
        match self.get(field)? {
            Value::Int(v) => Ok(Some(v)),
            Value::Null => Ok(None),
            other => Err(wrong_type(field, "int", &other)),
        }
    }

    /// Read a `BIGINT` field
    pub fn get_long(&self, field: &str) -> Result<Option<i64>> {
        match self.get(field)? {
            Value::Long(v) => Ok(Some(v)),
            Value::Null => Ok(None),
            other => Err(wrong_type(field, "long", &other)),
        }
    }

    /// Read a character field
    pub fn get_string(&self, field: &str) -> Result<Option<String>> {
        match self.get(field)? {
            Value::String(v) => Ok(Some(v)),
            Value::Null => Ok(None),
            other => Err(wrong_type(field, "string", &other)),
        }
    }

    /// Read a decimal field
    pub fn get_decimal(&self, field: &str) -> Result<Option<Decimal>> {
        match self.get(field)? {
            Value::Decimal(v) => Ok(Some(v)),
            Value::Null => Ok(None),
            other => Err(wrong_type(field, "decimal", &other)),
        }
    }

    /// Primary key values in key column order
    pub fn key(&self) -> Result<Vec<Value>> {
        self.handler
            .id_field_numbers()
            .iter()
            .map(|n| self.values.get_object(*n))
            .collect()
    }

    // ------------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------------

    /// Whether a field was written since the last load or save
    pub fn is_modified(&self, field: &str) -> Result<bool> {
        let number = self.handler.require_field(field)?.number();
        Ok(self.values.is_modified(number))
    }

    /// Whether any persistent field is modified
    pub fn is_dirty(&self) -> bool {
        self.handler
            .persistent_field_numbers()
            .iter()
            .any(|n| self.values.is_modified(*n))
    }

    /// `Some(true)` once loaded from the database
    pub fn found(&self) -> Option<bool> {
        self.values.found()
    }

    /// Get told when the instance first becomes dirty
    pub fn set_observer(&mut self, observer: Arc<dyn ModificationObserver>) {
        self.values.set_observer(observer);
    }
}

fn no_such_field(handler: &DomainTypeHandler, number: usize) -> Error {
    Error::user(format!(
        "Type {} has no field number {}",
        handler.type_name(),
        number
    ))
}

fn wrong_type(field: &str, expected: &str, actual: &Value) -> Error {
    Error::user(format!(
        "Field {} holds a {} value, not {}",
        field,
        actual.type_name(),
        expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clusterbind_core::{ColumnDescriptor, ColumnType, FieldType};
    use clusterbind_metadata::{FieldMapping, TypeMapping};
    use clusterbind_storage::{Dictionary, TableBuilder};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn handler() -> Arc<DomainTypeHandler> {
        let dictionary = Dictionary::new();
        dictionary
            .create_table(
                TableBuilder::new("employee")
                    .column(ColumnDescriptor::new("id", ColumnType::Int))
                    .column(ColumnDescriptor::new("name", ColumnType::Varchar).with_length(32))
                    .column(ColumnDescriptor::new("salary", ColumnType::Decimal).with_precision(10, 2))
                    .primary_key(&["id"])
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let mapping = TypeMapping::new("Employee", "employee")
            .field(FieldMapping::new("id", FieldType::INT))
            .field(FieldMapping::new("name", FieldType::STRING))
            .field(FieldMapping::new("salary", FieldType::DECIMAL));
        Arc::new(DomainTypeHandler::new(&mapping, &dictionary).unwrap())
    }

    #[test]
    fn test_defaults_are_clean() {
        let object = DynamicObject::new(handler()).unwrap();
        assert_eq!(object.get_int("id").unwrap(), Some(0));
        assert_eq!(object.get_string("name").unwrap(), None);
        assert!(!object.is_dirty());
        assert_eq!(object.found(), None);
    }

    #[test]
    fn test_set_by_name_and_number() {
        let mut object = DynamicObject::new(handler()).unwrap();
        object.set("id", 7).unwrap();
        object.set_number(1, "Ann").unwrap();
        object.set("salary", Decimal::new(1_000_050, 2)).unwrap();
        assert_eq!(object.get_number(0).unwrap(), Value::Int(7));
        assert_eq!(object.get_string("name").unwrap().as_deref(), Some("Ann"));
        assert_eq!(object.get_decimal("salary").unwrap(), Some(Decimal::new(1_000_050, 2)));
        assert!(object.is_modified("name").unwrap());
        assert_eq!(object.key().unwrap(), vec![Value::Int(7)]);
    }

    #[test]
    fn test_type_checked() {
        let mut object = DynamicObject::new(handler()).unwrap();
        assert!(object.set("id", "seven").is_err());
        assert!(object.set("id", Value::Null).is_err());
        assert!(object.set("name", Value::Null).is_ok());
        assert!(object.set("missing", 1).is_err());
        assert!(object.get_number(9).is_err());
        assert!(object.get_long("id").is_err());
    }

    #[test]
    fn test_observer_sees_first_write() {
        struct Counter(AtomicUsize);
        impl ModificationObserver for Counter {
            fn on_first_modification(&self, _field: usize) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let mut object = DynamicObject::new(handler()).unwrap();
        object.set_observer(counter.clone());
        object.set("name", "a").unwrap();
        object.set("name", "b").unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }
}
