//! Batched statement parameter view

use clusterbind_core::{Error, Result, Value};

use super::ValueHandler;

const DESCRIPTION: &str = "parameter value handler";

#[derive(Debug, Clone, PartialEq)]
enum Source {
    /// One parameter set per batch row
    Sets(Vec<Vec<Value>>),
    /// A single row of raw bindings
    Raw(Vec<Value>),
}

impl Source {
    fn len(&self) -> usize {
        match self {
            Source::Sets(sets) => sets.len(),
            Source::Raw(_) => 1,
        }
    }

    fn row(&self, n: usize) -> Option<&[Value]> {
        match self {
            Source::Sets(sets) => sets.get(n).map(Vec::as_slice),
            Source::Raw(values) if n == 0 => Some(values),
            Source::Raw(_) => None,
        }
    }
}

/// Read view of statement parameters as field values
///
/// `field_to_parameter[field]` is the 0-based position of the parameter
/// bound to the field, if any. The view starts before the first row; call
/// `next` to advance. A field counts as modified when it has a bound
/// parameter in the current row.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchValueHandler {
    source: Source,
    field_to_parameter: Vec<Option<usize>>,
    current: Option<usize>,
}

impl BatchValueHandler {
    /// View over a list of parameter sets
    pub fn from_parameter_sets(sets: Vec<Vec<Value>>, field_to_parameter: Vec<Option<usize>>) -> Self {
        Self {
            source: Source::Sets(sets),
            field_to_parameter,
            current: None,
        }
    }

    /// View over one raw binding array
    pub fn from_bindings(bindings: Vec<Value>, field_to_parameter: Vec<Option<usize>>) -> Self {
        Self {
            source: Source::Raw(bindings),
            field_to_parameter,
            current: None,
        }
    }

    /// Advance to the next row; false when the batch is exhausted
    pub fn next(&mut self) -> bool {
        let next = self.current.map_or(0, |c| c + 1);
        if next < self.source.len() {
            self.current = Some(next);
            true
        } else {
            self.current = Some(self.source.len());
            false
        }
    }

    /// Number of rows in the batch
    pub fn row_count(&self) -> usize {
        self.source.len()
    }

    fn current_row(&self) -> Result<&[Value]> {
        self.current
            .and_then(|n| self.source.row(n))
            .ok_or_else(|| Error::fatal("Parameter view is not positioned on a row"))
    }

    fn parameter(&self, field: usize) -> Option<usize> {
        self.field_to_parameter.get(field).copied().flatten()
    }
}

impl ValueHandler for BatchValueHandler {
    fn describe(&self) -> &'static str {
        DESCRIPTION
    }

    fn number_of_fields(&self) -> usize {
        self.field_to_parameter.len()
    }

    fn get_object(&self, field: usize) -> Result<Value> {
        let row = self.current_row()?;
        match self.parameter(field) {
            None => Ok(Value::Null),
            Some(p) => row.get(p).cloned().ok_or_else(|| {
                Error::user(format!(
                    "Parameter {} is not bound ({} parameters given)",
                    p + 1,
                    row.len()
                ))
            }),
        }
    }

    fn set_object(&mut self, _field: usize, _value: Value) -> Result<()> {
        Err(Error::unsupported_operation("set_object", DESCRIPTION))
    }

    fn is_modified(&self, field: usize) -> bool {
        match (self.parameter(field), self.current_row()) {
            (Some(p), Ok(row)) => p < row.len(),
            _ => false,
        }
    }

    fn mark_modified(&mut self, _field: usize) -> Result<()> {
        Err(Error::unsupported_operation("mark_modified", DESCRIPTION))
    }

    fn reset_modified(&mut self) {}
}
