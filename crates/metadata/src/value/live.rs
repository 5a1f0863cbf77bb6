//! Live instance container

use clusterbind_core::{Error, Result, Value};
use std::fmt;
use std::sync::Arc;

use super::ValueHandler;
use crate::bitset::FieldSet;

/// Receives a notification when a clean instance is first modified
///
/// A cache manager registers one observer per instance to learn which
/// instances became dirty.
pub trait ModificationObserver: Send + Sync {
    /// Called once per clean-to-dirty transition, with the field that
    /// caused it
    fn on_first_modification(&self, field: usize);
}

/// Container backing one user-visible instance
pub struct LiveValueHandler {
    values: Vec<Value>,
    modified: FieldSet,
    found: Option<bool>,
    observer: Option<Arc<dyn ModificationObserver>>,
}

impl LiveValueHandler {
    /// Container with every field NULL and nothing modified
    pub fn new(number_of_fields: usize) -> Self {
        Self {
            values: vec![Value::Null; number_of_fields],
            modified: FieldSet::new(number_of_fields),
            found: None,
            observer: None,
        }
    }

    /// Container over existing values, nothing modified
    pub fn from_values(values: Vec<Value>) -> Self {
        let modified = FieldSet::new(values.len());
        Self {
            values,
            modified,
            found: None,
            observer: None,
        }
    }

    /// Register the single modification observer
    pub fn set_observer(&mut self, observer: Arc<dyn ModificationObserver>) {
        self.observer = Some(observer);
    }

    /// All field values
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Modified fields
    pub fn modified_fields(&self) -> &FieldSet {
        &self.modified
    }

    fn check(&self, field: usize) -> Result<()> {
        if field < self.values.len() {
            Ok(())
        } else {
            Err(Error::fatal(format!(
                "Field number {} out of range for an instance with {} fields",
                field,
                self.values.len()
            )))
        }
    }

    fn mark(&mut self, field: usize) {
        let was_clean = self.modified.is_empty();
        self.modified.insert(field);
        if was_clean {
            if let Some(observer) = &self.observer {
                observer.on_first_modification(field);
            }
        }
    }
}

impl ValueHandler for LiveValueHandler {
    fn describe(&self) -> &'static str {
        "instance"
    }

    fn number_of_fields(&self) -> usize {
        self.values.len()
    }

    fn get_object(&self, field: usize) -> Result<Value> {
        self.check(field)?;
        Ok(self.values[field].clone())
    }

    fn set_object(&mut self, field: usize, value: Value) -> Result<()> {
        self.check(field)?;
        self.values[field] = value;
        self.mark(field);
        Ok(())
    }

    fn is_modified(&self, field: usize) -> bool {
        self.modified.contains(field)
    }

    fn mark_modified(&mut self, field: usize) -> Result<()> {
        self.check(field)?;
        self.mark(field);
        Ok(())
    }

    fn reset_modified(&mut self) {
        self.modified.clear();
    }

    fn found(&self) -> Option<bool> {
        self.found
    }

    fn set_found(&mut self, found: bool) -> Result<()> {
        self.found = Some(found);
        Ok(())
    }
}

impl fmt::Debug for LiveValueHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveValueHandler")
            .field("values", &self.values)
            .field("modified", &self.modified)
            .field("found", &self.found)
            .field("observed", &self.observer.is_some())
            .finish()
    }
}
