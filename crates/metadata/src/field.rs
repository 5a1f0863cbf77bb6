//! Field handlers
//!
//! A `FieldHandler` binds one domain field to its column, owns the
//! operation handler chosen for it, and adds the null-value policy on top of
//! the handler's write path. Field handlers are built once, while their
//! domain type handler is built, and never change afterwards.

use clusterbind_core::{ColumnDescriptor, Error, FieldType, Result, Value};
use clusterbind_storage::{
    BinaryCondition, BoundType, IndexScanOperation, Operation, PartitionKey, ResultRow, ScanFilter, TableMeta,
};
use std::fmt;
use std::str::FromStr;

use crate::candidate::CandidateIndex;
use crate::handler::{self, HandlerSelection, OperationHandler};
use crate::index::IndexHandler;
use crate::value::ValueHandler;

// ============================================================================
// Null-value policy
// ============================================================================

/// What writing a null field value does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullValue {
    /// Delegate to the operation handler, which writes NULL
    #[default]
    None,
    /// Fail with a user error
    Exception,
    /// Write the field's default value instead
    Default,
}

impl FromStr for NullValue {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(NullValue::None),
            "exception" => Ok(NullValue::Exception),
            "default" => Ok(NullValue::Default),
            other => Err(Error::user(format!(
                "Unknown null value policy '{}' (expected none, exception or default)",
                other
            ))),
        }
    }
}

impl fmt::Display for NullValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NullValue::None => "none",
            NullValue::Exception => "exception",
            NullValue::Default => "default",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Mapping
// ============================================================================

/// Declared mapping of one field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMapping {
    pub(crate) name: String,
    pub(crate) field_type: FieldType,
    pub(crate) columns: Vec<String>,
    pub(crate) null_value: Option<NullValue>,
    pub(crate) lob: bool,
    pub(crate) persistent: bool,
    pub(crate) index: Option<(String, bool)>,
}

impl FieldMapping {
    /// Field mapped to the column of the same name
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            columns: vec![name.clone()],
            name,
            field_type,
            null_value: None,
            lob: false,
            persistent: true,
            index: None,
        }
    }

    /// Map to a differently named column
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.columns = vec![column.into()];
        self
    }

    /// Map to several columns; such a field has no operation handler of its
    /// own
    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Null-value policy for this field
    pub fn null_value(mut self, policy: NullValue) -> Self {
        self.null_value = Some(policy);
        self
    }

    /// Map as a large object
    pub fn lob(mut self) -> Self {
        self.lob = true;
        self
    }

    /// Keep the field in memory only
    pub fn transient(mut self) -> Self {
        self.persistent = false;
        self.columns.clear();
        self
    }

    /// Declare an index over this field's column(s)
    pub fn index(mut self, name: impl Into<String>, unique: bool) -> Self {
        self.index = Some((name.into(), unique));
        self
    }

    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Owning-type bookkeeping a field registers itself with while it is built
pub(crate) struct Registration<'a> {
    pub(crate) table: &'a TableMeta,
    pub(crate) indexes: &'a mut Vec<IndexHandler>,
    /// One slot per primary key column, in key order
    pub(crate) id_fields: &'a mut [Option<usize>],
    /// One slot per partition key column, in key order
    pub(crate) partition_fields: &'a mut [Option<usize>],
    pub(crate) default_null_value: NullValue,
    pub(crate) errors: &'a mut Vec<String>,
}

// ============================================================================
// Field handler
// ============================================================================

/// One field of a domain type
pub struct FieldHandler {
    number: usize,
    name: String,
    field_type: FieldType,
    columns: Vec<String>,
    column: Option<ColumnDescriptor>,
    primary_key: bool,
    partition_key: bool,
    lob: bool,
    nullable: bool,
    persistent: bool,
    null_value: NullValue,
    handler: &'static dyn OperationHandler,
    default_value: Value,
    index_names: Vec<String>,
    indices: Vec<(usize, usize)>,
}

impl FieldHandler {
    /// Build field number `number` from its mapping
    ///
    /// Problems are pushed onto `reg.errors`; the field is still returned,
    /// bound to the unsupported handler, so that every field of the type is
    /// analysed before the errors are reported.
    pub(crate) fn new(number: usize, mapping: &FieldMapping, reg: &mut Registration<'_>) -> Self {
        let mut field = Self {
            number,
            name: mapping.name.clone(),
            field_type: mapping.field_type.clone(),
            columns: mapping.columns.clone(),
            column: None,
            primary_key: false,
            partition_key: false,
            lob: mapping.lob,
            nullable: true,
            persistent: mapping.persistent,
            null_value: NullValue::None,
            handler: handler::virtual_handler(),
            default_value: Value::Null,
            index_names: Vec::new(),
            indices: Vec::new(),
        };
        if !field.persistent {
            return field;
        }

        // 1. resolve the column
        if field.columns.len() == 1 {
            match reg.table.column(&field.columns[0]) {
                Some(column) => field.column = Some(column.clone()),
                None => {
                    reg.errors.push(format!(
                        "Field {}: column {} does not exist in table {}",
                        field.name, field.columns[0], reg.table.name
                    ));
                    field.handler = handler::unsupported();
                    return field;
                }
            }
        } else {
            for name in &field.columns {
                if reg.table.column(name).is_none() {
                    reg.errors.push(format!(
                        "Field {}: column {} does not exist in table {}",
                        field.name, name, reg.table.name
                    ));
                }
            }
        }

        // 2. classify
        if let Some(column) = &field.column {
            field.primary_key = column.primary_key;
            field.partition_key = column.partition_key;
            field.nullable = column.nullable;
            field.lob = field.lob || column.is_lob();
        }

        // 3. select the operation handler
        let selection = HandlerSelection {
            field_type: &field.field_type,
            column_type: field.column.as_ref().map(|c| c.column_type),
            nullable: field.nullable,
            primary_key: field.primary_key,
            partition_key: field.partition_key,
            lob: field.lob,
        };
        let supported = match handler::select(&selection) {
            Ok(chosen) => {
                field.handler = chosen;
                true
            }
            Err(reason) => {
                reg.errors.push(format!("Field {}: {}", field.name, reason));
                field.handler = handler::unsupported();
                false
            }
        };

        // 4. key roles
        if let Some(column) = &field.column {
            if field.primary_key {
                if let Some(pos) = reg.table.primary_key.iter().position(|c| *c == column.name) {
                    reg.id_fields[pos] = Some(number);
                }
            }
            if field.partition_key {
                if let Some(pos) = reg.table.partition_key.iter().position(|c| *c == column.name) {
                    reg.partition_fields[pos] = Some(number);
                }
            }
        }

        // 5. index membership
        for (ordinal, index) in reg.indexes.iter_mut().enumerate() {
            field.join_index(ordinal, index, reg.errors);
        }
        let declared = mapping
            .index
            .as_ref()
            .filter(|(name, _)| !reg.indexes.iter().any(|i| i.name() == name.as_str()));
        if let Some((index_name, unique)) = declared {
            match IndexHandler::from_field(&reg.table.name, index_name, *unique, &field) {
                Ok(mut index) => {
                    let ordinal = reg.indexes.len();
                    field.join_index(ordinal, &mut index, reg.errors);
                    reg.indexes.push(index);
                }
                Err(e) => reg.errors.push(format!("Field {}: {}", field.name, e)),
            }
        }

        // 6. default value
        if supported && field.column.is_some() {
            let text = field.column.as_ref().and_then(|c| c.default_value.clone());
            match field.handler.default_value_for(&field, text.as_deref()) {
                Ok(value) => field.default_value = value,
                Err(e) => reg.errors.push(format!("Field {}: {}", field.name, e)),
            }
        }

        // 7. null-value policy
        field.null_value = mapping.null_value.unwrap_or(reg.default_null_value);
        field
    }

    fn join_index(&mut self, ordinal: usize, index: &mut IndexHandler, errors: &mut Vec<String>) {
        let mut joined = false;
        for position in 0..index.columns().len() {
            if !self.columns.iter().any(|c| *c == index.columns()[position]) {
                continue;
            }
            if let Err(e) = index.bind(position, self.number) {
                errors.push(format!("Field {}: {}", self.name, e));
                continue;
            }
            self.indices.push((ordinal, position));
            joined = true;
        }
        if joined {
            self.index_names.push(index.name().to_string());
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Field number
    pub fn number(&self) -> usize {
        self.number
    }

    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type
    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    /// Mapped column names
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The single mapped column, if any
    pub fn column(&self) -> Option<&ColumnDescriptor> {
        self.column.as_ref()
    }

    /// Name of the single mapped column
    pub fn column_name(&self) -> Option<&str> {
        self.column.as_ref().map(|c| c.name.as_str())
    }

    /// Whether the column is part of the primary key
    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    /// Whether the column is part of the partition key
    pub fn is_partition_key(&self) -> bool {
        self.partition_key
    }

    /// Whether the field is a large object
    pub fn is_lob(&self) -> bool {
        self.lob
    }

    /// Whether the column accepts NULL
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Whether the field is stored
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// Whether the field is a non-nullable native type
    pub fn is_primitive(&self) -> bool {
        self.handler.is_primitive()
    }

    /// Null-value policy
    pub fn null_value(&self) -> NullValue {
        self.null_value
    }

    /// The bound operation handler
    pub fn handler(&self) -> &'static dyn OperationHandler {
        self.handler
    }

    /// Default value derived from the column default
    pub fn default_value(&self) -> &Value {
        &self.default_value
    }

    /// Names of the indexes this field participates in
    pub fn index_names(&self) -> &[String] {
        &self.index_names
    }

    /// `(index ordinal, position in index)` pairs
    pub fn indices(&self) -> &[(usize, usize)] {
        &self.indices
    }

    // ------------------------------------------------------------------------
    // Value transfer
    // ------------------------------------------------------------------------

    /// Prime a fresh container
    pub fn object_initialize_default(&self, container: &mut dyn ValueHandler) -> Result<()> {
        self.handler.object_initialize_default(self, container)
    }

    /// Read the field from a container
    pub fn object_get_value(&self, container: &dyn ValueHandler) -> Result<Value> {
        self.handler.object_get_value(self, container)
    }

    /// Write the field into a container
    pub fn object_set_value(&self, container: &mut dyn ValueHandler, value: Value) -> Result<()> {
        self.handler.object_set_value(self, container, value)
    }

    /// Copy the field out of a fetched row
    pub fn object_set_value_from_row(&self, row: &dyn ResultRow, container: &mut dyn ValueHandler) -> Result<()> {
        self.handler.object_set_value_from_row(self, row, container)
    }

    /// Fetch the field's column with a read operation
    pub fn operation_get_value(&self, op: &mut dyn Operation) -> Result<()> {
        self.handler.operation_get_value(self, op)
    }

    /// Push the container's value into a write operation, applying the
    /// null-value policy
    pub fn operation_set_value(&self, container: &dyn ValueHandler, op: &mut dyn Operation) -> Result<()> {
        if self.persistent && container.is_null(self.number)? {
            return self.operation_set_value_from(&Value::Null, op);
        }
        self.handler.operation_set_value(self, container, op)
    }

    /// Push a given value into a write operation, applying the null-value
    /// policy
    pub fn operation_set_value_from(&self, value: &Value, op: &mut dyn Operation) -> Result<()> {
        if value.is_null() {
            match self.null_value {
                NullValue::Exception => {
                    return Err(Error::user(format!(
                        "Field {} of type {} must not be null",
                        self.name, self.field_type
                    )))
                }
                NullValue::Default => {
                    return self.handler.operation_set_value_from(self, &self.default_value, op);
                }
                NullValue::None => {}
            }
        }
        self.handler.operation_set_value_from(self, value, op)
    }

    /// Equality predicate on the field's column
    pub fn operation_equal(&self, value: &Value, op: &mut dyn Operation) -> Result<()> {
        self.handler.operation_equal(self, value, op)
    }

    /// Index scan bound on the field's column
    pub fn operation_set_bounds(&self, value: &Value, bound: BoundType, op: &mut dyn IndexScanOperation) -> Result<()> {
        self.handler.operation_set_bounds(self, value, bound, op)
    }

    /// Scan filter comparison on the field's column
    pub fn filter_compare_value(
        &self,
        value: &Value,
        condition: BinaryCondition,
        filter: &mut dyn ScanFilter,
    ) -> Result<()> {
        self.handler.filter_compare_value(self, value, condition, filter)
    }

    /// Whether the field may be part of a hash or ordered index
    pub fn is_valid_index_type(&self, hash_not_ordered: bool) -> bool {
        self.handler.is_valid_index_type(self, hash_not_ordered)
    }

    /// Append the field's value to a partition key
    pub fn partition_key_set_part(&self, key: &mut PartitionKey, container: &dyn ValueHandler) -> Result<()> {
        self.handler.partition_key_set_part(self, key, container)
    }

    // ------------------------------------------------------------------------
    // Candidate index bounds
    // ------------------------------------------------------------------------

    /// Mark an equality bound in every index this field participates in
    pub fn mark_equal_bound(&self, candidates: &mut [CandidateIndex]) {
        for &(ordinal, position) in &self.indices {
            if let Some(candidate) = candidates.get_mut(ordinal) {
                candidate.mark_equal(position);
            }
        }
    }

    /// Mark a lower bound in every index this field participates in
    pub fn mark_lower_bound(&self, candidates: &mut [CandidateIndex]) {
        for &(ordinal, position) in &self.indices {
            if let Some(candidate) = candidates.get_mut(ordinal) {
                candidate.mark_lower(position);
            }
        }
    }

    /// Mark an upper bound in every index this field participates in
    pub fn mark_upper_bound(&self, candidates: &mut [CandidateIndex]) {
        for &(ordinal, position) in &self.indices {
            if let Some(candidate) = candidates.get_mut(ordinal) {
                candidate.mark_upper(position);
            }
        }
    }
}

impl fmt::Debug for FieldHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldHandler")
            .field("number", &self.number)
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("columns", &self.columns)
            .field("primary_key", &self.primary_key)
            .field("handler", &self.handler.name())
            .field("null_value", &self.null_value)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{employee_table, RecordingOperation};
    use crate::value::LiveValueHandler;
    use rust_decimal::Decimal;

    fn build(mapping: FieldMapping, default_null_value: NullValue) -> (FieldHandler, Vec<String>) {
        let table = employee_table();
        let mut indexes = vec![IndexHandler::primary(&table)];
        let mut id_fields = vec![None; table.primary_key.len()];
        let mut partition_fields = vec![None; table.partition_key.len()];
        let mut errors = Vec::new();
        let field = {
            let mut reg = Registration {
                table: &table,
                indexes: &mut indexes,
                id_fields: &mut id_fields,
                partition_fields: &mut partition_fields,
                default_null_value,
                errors: &mut errors,
            };
            FieldHandler::new(0, &mapping, &mut reg)
        };
        (field, errors)
    }

    #[test]
    fn test_key_field_uses_equal() {
        let (field, errors) = build(FieldMapping::new("id", FieldType::INT), NullValue::None);
        assert!(errors.is_empty());
        assert!(field.is_primary_key());
        assert_eq!(field.indices(), &[(0, 0)]);

        let mut container = LiveValueHandler::new(1);
        container.set_int(0, 5).unwrap();
        let mut op = RecordingOperation::new(employee_table());
        field.operation_set_value(&container, &mut op).unwrap();
        assert_eq!(op.calls, vec![("equal".to_string(), "id".to_string(), Value::Int(5))]);
    }

    #[test]
    fn test_null_policy_exception() {
        let (field, _) = build(
            FieldMapping::new("salary", FieldType::DECIMAL).null_value(NullValue::Exception),
            NullValue::None,
        );
        let container = LiveValueHandler::new(1);
        let mut op = RecordingOperation::new(employee_table());
        assert!(field.operation_set_value(&container, &mut op).is_err());
        assert!(op.calls.is_empty());
    }

    #[test]
    fn test_null_policy_default() {
        let (field, _) = build(
            FieldMapping::new("salary", FieldType::DECIMAL),
            NullValue::Default,
        );
        assert_eq!(field.default_value(), &Value::Decimal(Decimal::ZERO));
        let container = LiveValueHandler::new(1);
        let mut op = RecordingOperation::new(employee_table());
        field.operation_set_value(&container, &mut op).unwrap();
        assert_eq!(
            op.calls,
            vec![("set".to_string(), "salary".to_string(), Value::Decimal(Decimal::ZERO))]
        );
    }

    #[test]
    fn test_null_policy_none_writes_null() {
        let (field, _) = build(FieldMapping::new("salary", FieldType::DECIMAL), NullValue::None);
        let container = LiveValueHandler::new(1);
        let mut op = RecordingOperation::new(employee_table());
        field.operation_set_value(&container, &mut op).unwrap();
        assert_eq!(op.calls, vec![("set".to_string(), "salary".to_string(), Value::Null)]);
    }

    #[test]
    fn test_missing_column_is_reported() {
        let (field, errors) = build(FieldMapping::new("bonus", FieldType::INT), NullValue::None);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("bonus"));
        assert_eq!(field.handler().name(), "unsupported");
    }

    #[test]
    fn test_transient_field_is_virtual() {
        let (field, errors) = build(FieldMapping::new("scratch", FieldType::INT).transient(), NullValue::None);
        assert!(errors.is_empty());
        assert!(!field.is_persistent());
        assert_eq!(field.handler().name(), "virtual");
        assert!(field.column().is_none());
    }

    #[test]
    fn test_null_value_parse() {
        assert_eq!("Exception".parse::<NullValue>().unwrap(), NullValue::Exception);
        assert!("sometimes".parse::<NullValue>().is_err());
        assert_eq!(NullValue::Default.to_string(), "default");
    }
}
