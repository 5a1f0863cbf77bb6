//! Domain type handlers
//!
//! A `DomainTypeHandler` holds every field and index handler of one mapped
//! type and is the unit the session layer and the SQL bridge work with. It
//! is built in one pass, in dependency order:
//!
//! 1. primary key and partition key slots from the table
//! 2. the primary hash index, then every dictionary index
//! 3. one field handler per mapping, each registering its key roles and
//!    index positions
//! 4. index usability
//! 5. persistent / transient / primitive bookkeeping
//!
//! Field problems are collected across the whole type and reported as one
//! `Error::Mapping`, so a caller sees every mistake in a mapping at once.
//! A handler that is returned is complete and never changes.

use clusterbind_core::{Error, FieldKind, FieldType, Result, Value};
use clusterbind_storage::{Dictionary, Operation, PartitionKey, ResultRow, TableMeta};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::bitset::FieldSet;
use crate::candidate::CandidateIndex;
use crate::field::{FieldHandler, FieldMapping, NullValue, Registration};
use crate::index::IndexHandler;
use crate::value::{KeyValueHandler, LiveValueHandler, ValueHandler};

// ============================================================================
// Mapping
// ============================================================================

/// Declared mapping of a domain type onto a table
#[derive(Debug, Clone, PartialEq)]
pub struct TypeMapping {
    type_name: String,
    table: String,
    fields: Vec<FieldMapping>,
    default_null_value: Option<NullValue>,
}

impl TypeMapping {
    /// Empty mapping of `type_name` onto `table`
    pub fn new(type_name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            table: table.into(),
            fields: Vec::new(),
            default_null_value: None,
        }
    }

    /// Append a field; field numbers follow declaration order
    pub fn field(mut self, field: FieldMapping) -> Self {
        self.fields.push(field);
        self
    }

    /// Null-value policy for fields that do not declare one
    pub fn default_null_value(mut self, policy: NullValue) -> Self {
        self.default_null_value = Some(policy);
        self
    }

    /// Type-wide null-value policy, if one was declared
    pub fn declared_null_value(&self) -> Option<NullValue> {
        self.default_null_value
    }

    /// Mapped type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Table name
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Declared fields
    pub fn fields(&self) -> &[FieldMapping] {
        &self.fields
    }
}

/// Construction progress of a domain type handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HandlerState {
    /// Nothing built yet
    Uninitialized,
    /// Every field handler exists
    FieldsResolved,
    /// Index usability has been decided
    IndexesValidated,
    /// Complete and shareable
    Ready,
}

// ============================================================================
// Domain type handler
// ============================================================================

/// All field and index handlers of one mapped type
#[derive(Debug)]
pub struct DomainTypeHandler {
    type_name: String,
    table: Arc<TableMeta>,
    fields: Vec<FieldHandler>,
    field_numbers: HashMap<String, usize>,
    id_fields: Vec<usize>,
    partition_fields: Vec<usize>,
    indexes: Vec<IndexHandler>,
    persistent: Vec<usize>,
    non_persistent: Vec<usize>,
    primitive: Vec<usize>,
    state: HandlerState,
}

impl DomainTypeHandler {
    /// Build the handler for a mapping
    pub fn new(mapping: &TypeMapping, dictionary: &Dictionary) -> Result<Self> {
        let table = dictionary
            .get_table(&mapping.table)
            .map_err(|e| Error::from(e).context(format!("type {}", mapping.type_name)))?;
        if table.primary_key.is_empty() {
            return Err(Error::user(format!(
                "Table {} mapped by type {} has no primary key",
                table.name, mapping.type_name
            )));
        }

        let mut handler = Self {
            type_name: mapping.type_name.clone(),
            table: Arc::clone(&table),
            fields: Vec::with_capacity(mapping.fields.len()),
            field_numbers: HashMap::new(),
            id_fields: Vec::new(),
            partition_fields: Vec::new(),
            indexes: Vec::new(),
            persistent: Vec::new(),
            non_persistent: Vec::new(),
            primitive: Vec::new(),
            state: HandlerState::Uninitialized,
        };
        let mut errors = Vec::new();

        // keys and indexes come first so fields can register with them
        let mut id_slots: Vec<Option<usize>> = vec![None; table.primary_key.len()];
        let mut partition_slots: Vec<Option<usize>> = vec![None; table.partition_key.len()];
        handler.indexes.push(IndexHandler::primary(&table));
        for meta in &table.indexes {
            match IndexHandler::from_dictionary(meta) {
                Ok(index) => handler.indexes.push(index),
                Err(e) => errors.push(e.to_string()),
            }
        }

        for (number, field_mapping) in mapping.fields.iter().enumerate() {
            if handler.field_numbers.contains_key(field_mapping.name()) {
                errors.push(format!("Field {} is mapped more than once", field_mapping.name()));
            }
            let mut reg = Registration {
                table: &table,
                indexes: &mut handler.indexes,
                id_fields: &mut id_slots,
                partition_fields: &mut partition_slots,
                default_null_value: mapping.default_null_value.unwrap_or_default(),
                errors: &mut errors,
            };
            let field = FieldHandler::new(number, field_mapping, &mut reg);
            handler.field_numbers.insert(field.name().to_string(), number);
            handler.fields.push(field);
        }
        handler.advance(HandlerState::FieldsResolved)?;

        for (position, slot) in id_slots.iter().enumerate() {
            match slot {
                Some(number) => handler.id_fields.push(*number),
                None => errors.push(format!(
                    "Primary key column {} of table {} is not mapped by any field",
                    table.primary_key[position], table.name
                )),
            }
        }
        handler.partition_fields = partition_slots.iter().flatten().copied().collect();

        for (ordinal, index) in handler.indexes.iter_mut().enumerate() {
            if index.assert_all_columns_have_fields(&handler.fields) {
                continue;
            }
            let reason = index.reason().unwrap_or("unknown reason").to_string();
            if ordinal == 0 {
                errors.push(format!("Primary key index of table {} is unusable: {}", table.name, reason));
            } else {
                warn!(
                    target: "clusterbind::metadata",
                    type_name = %handler.type_name,
                    index = index.name(),
                    reason = %reason,
                    "Index is not usable for queries"
                );
            }
        }
        handler.advance(HandlerState::IndexesValidated)?;

        if !errors.is_empty() {
            return Err(Error::Mapping {
                type_name: handler.type_name,
                errors,
            });
        }

        for field in &handler.fields {
            if field.is_persistent() {
                handler.persistent.push(field.number());
            } else {
                handler.non_persistent.push(field.number());
            }
            if field.is_primitive() {
                handler.primitive.push(field.number());
            }
        }
        handler.advance(HandlerState::Ready)?;

        info!(
            target: "clusterbind::metadata",
            type_name = %handler.type_name,
            table = %handler.table.name,
            fields = handler.fields.len(),
            indexes = handler.indexes.len(),
            "Domain type registered"
        );
        Ok(handler)
    }

    /// Build a handler with one field per column of a table
    ///
    /// Columns whose type has no field counterpart become transient fields,
    /// so the type can still be used for the other columns.
    pub fn for_table(table_name: &str, dictionary: &Dictionary) -> Result<Self> {
        let table = dictionary.get_table(table_name).map_err(Error::from)?;
        let mut mapping = TypeMapping::new(table_name, table_name);
        for column in &table.columns {
            let field_type = FieldType::for_column(column.column_type, column.nullable);
            let field = match field_type {
                FieldType::Unsupported(_) => {
                    debug!(
                        target: "clusterbind::metadata",
                        table = table_name,
                        column = %column.name,
                        column_type = %column.column_type,
                        "Column has no field type, mapped as transient"
                    );
                    FieldMapping::new(column.name.clone(), field_type).transient()
                }
                _ => FieldMapping::new(column.name.clone(), field_type),
            };
            mapping = mapping.field(field);
        }
        Self::new(&mapping, dictionary)
    }

    fn advance(&mut self, next: HandlerState) -> Result<()> {
        if next <= self.state {
            return Err(Error::fatal(format!(
                "Domain type {} cannot move from {:?} to {:?}",
                self.type_name, self.state, next
            )));
        }
        self.state = next;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Mapped type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Table metadata
    pub fn table(&self) -> &Arc<TableMeta> {
        &self.table
    }

    /// Lifecycle state
    pub fn state(&self) -> HandlerState {
        self.state
    }

    /// Field handlers in field number order
    pub fn fields(&self) -> &[FieldHandler] {
        &self.fields
    }

    /// Field by number
    pub fn field(&self, number: usize) -> Option<&FieldHandler> {
        self.fields.get(number)
    }

    /// Number of fields, persistent or not
    pub fn number_of_fields(&self) -> usize {
        self.fields.len()
    }

    /// Field number by name
    pub fn field_number(&self, name: &str) -> Option<usize> {
        self.field_numbers.get(name).copied()
    }

    /// Field by name, failing if absent
    pub fn require_field(&self, name: &str) -> Result<&FieldHandler> {
        self.field_number(name)
            .map(|n| &self.fields[n])
            .ok_or_else(|| Error::user(format!("Type {} has no field {}", self.type_name, name)))
    }

    /// Field mapping a column
    pub fn field_for_column(&self, column: &str) -> Option<&FieldHandler> {
        self.fields.iter().find(|f| f.column_name() == Some(column))
    }

    /// Primary key field numbers, in key order
    pub fn id_field_numbers(&self) -> &[usize] {
        &self.id_fields
    }

    /// Partition key field numbers, in key order
    pub fn partition_key_field_numbers(&self) -> &[usize] {
        &self.partition_fields
    }

    /// Persistent field numbers
    pub fn persistent_field_numbers(&self) -> &[usize] {
        &self.persistent
    }

    /// Transient field numbers
    pub fn non_persistent_field_numbers(&self) -> &[usize] {
        &self.non_persistent
    }

    /// Fields of non-nullable native type
    pub fn primitive_field_numbers(&self) -> &[usize] {
        &self.primitive
    }

    /// Index handlers; index 0 is the primary key
    pub fn indexes(&self) -> &[IndexHandler] {
        &self.indexes
    }

    fn persistent_fields(&self) -> impl Iterator<Item = &FieldHandler> {
        self.persistent.iter().map(move |n| &self.fields[*n])
    }

    // ------------------------------------------------------------------------
    // Instances
    // ------------------------------------------------------------------------

    /// Fresh container with every field at its initial value and nothing
    /// marked modified
    pub fn new_instance(&self) -> Result<LiveValueHandler> {
        let mut container = LiveValueHandler::new(self.fields.len());
        for field in &self.fields {
            field.object_initialize_default(&mut container)?;
        }
        container.reset_modified();
        Ok(container)
    }

    fn check_container(&self, container: &dyn ValueHandler) -> Result<()> {
        if container.number_of_fields() != self.fields.len() {
            return Err(Error::fatal(format!(
                "{} container has {} fields, type {} has {}",
                container.describe(),
                container.number_of_fields(),
                self.type_name,
                self.fields.len()
            )));
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Bulk transfer
    // ------------------------------------------------------------------------

    /// Write every persistent field of the container into the operation
    pub fn operation_set_values(&self, container: &dyn ValueHandler, op: &mut dyn Operation) -> Result<()> {
        self.check_container(container)?;
        for field in self.persistent_fields() {
            field.operation_set_value(container, op)?;
        }
        Ok(())
    }

    /// Set the primary key of the operation from the container
    pub fn operation_set_keys(&self, container: &dyn ValueHandler, op: &mut dyn Operation) -> Result<()> {
        self.check_container(container)?;
        for &number in &self.id_fields {
            let field = &self.fields[number];
            let value = field.object_get_value(container)?;
            if value.is_null() {
                return Err(Error::user(format!(
                    "Primary key field {} of type {} is null",
                    field.name(),
                    self.type_name
                )));
            }
            field.operation_equal(&value, op)?;
        }
        Ok(())
    }

    /// Write only the persistent fields marked modified
    pub fn operation_set_modified_values(&self, container: &dyn ValueHandler, op: &mut dyn Operation) -> Result<()> {
        self.check_container(container)?;
        for field in self.persistent_fields() {
            if container.is_modified(field.number()) {
                field.operation_set_value(container, op)?;
            }
        }
        Ok(())
    }

    /// Write the modified persistent fields outside the primary key
    pub fn operation_set_non_pk_modified_values(
        &self,
        container: &dyn ValueHandler,
        op: &mut dyn Operation,
    ) -> Result<()> {
        self.check_container(container)?;
        for field in self.persistent_fields() {
            if !field.is_primary_key() && container.is_modified(field.number()) {
                field.operation_set_value(container, op)?;
            }
        }
        Ok(())
    }

    /// Ask a read operation for the persistent fields, or the given subset
    pub fn operation_get_values(&self, op: &mut dyn Operation, only: Option<&FieldSet>) -> Result<()> {
        for field in self.persistent_fields() {
            if only.map_or(true, |set| set.contains(field.number())) {
                field.operation_get_value(op)?;
            }
        }
        Ok(())
    }

    /// Copy every persistent field of a fetched row into the container
    pub fn object_set_values(&self, row: &dyn ResultRow, container: &mut dyn ValueHandler) -> Result<()> {
        self.check_container(container)?;
        for field in self.persistent_fields() {
            field.object_set_value_from_row(row, container)?;
        }
        Ok(())
    }

    /// Copy the given persistent fields of a fetched row into the container
    pub fn object_set_values_filtered(
        &self,
        row: &dyn ResultRow,
        container: &mut dyn ValueHandler,
        only: &FieldSet,
    ) -> Result<()> {
        self.check_container(container)?;
        for field in self.persistent_fields() {
            if only.contains(field.number()) {
                field.object_set_value_from_row(row, container)?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Keys
    // ------------------------------------------------------------------------

    /// Partition key of the instance held in the container
    pub fn create_partition_key(&self, container: &dyn ValueHandler) -> Result<PartitionKey> {
        let mut key = PartitionKey::new(&self.table);
        for &number in &self.partition_fields {
            self.fields[number].partition_key_set_part(&mut key, container)?;
        }
        Ok(key)
    }

    /// Validate a key value against a primary key field's declared type
    ///
    /// Narrower integers widen to the field's integer kind. Returns the
    /// value as the field stores it.
    pub fn check_key_type(&self, field_number: usize, value: &Value) -> Result<Value> {
        let field = self
            .fields
            .get(field_number)
            .ok_or_else(|| Error::fatal(format!("Type {} has no field number {}", self.type_name, field_number)))?;
        if value.is_null() {
            return Err(Error::user(format!(
                "Key value for field {} of type {} must not be null",
                field.name(),
                self.type_name
            )));
        }
        if field.field_type().accepts(value) {
            return Ok(value.clone());
        }
        let widened = match (field.field_type().kind(), value) {
            (Some(FieldKind::Int), Value::Byte(v)) => Some(Value::Int(i32::from(*v))),
            (Some(FieldKind::Int), Value::Short(v)) => Some(Value::Int(i32::from(*v))),
            (Some(FieldKind::Long), Value::Byte(v)) => Some(Value::Long(i64::from(*v))),
            (Some(FieldKind::Long), Value::Short(v)) => Some(Value::Long(i64::from(*v))),
            (Some(FieldKind::Long), Value::Int(v)) => Some(Value::Long(i64::from(*v))),
            _ => None,
        };
        widened.ok_or_else(|| {
            Error::user(format!(
                "Key value of type {} is not assignable to field {} of type {} in {}",
                value.type_name(),
                field.name(),
                field.field_type(),
                self.type_name
            ))
        })
    }

    /// Spread primary key values over a field-number-indexed slot array
    ///
    /// `keys` holds one value per primary key field, in key order; every
    /// other slot is null.
    pub fn expand_key_values(&self, keys: &[Value]) -> Result<Vec<Value>> {
        if keys.len() != self.id_fields.len() {
            return Err(Error::user(format!(
                "Type {} has {} primary key field(s) but {} key value(s) were given",
                self.type_name,
                self.id_fields.len(),
                keys.len()
            )));
        }
        let mut slots = vec![Value::Null; self.fields.len()];
        for (&number, value) in self.id_fields.iter().zip(keys) {
            slots[number] = self.check_key_type(number, value)?;
        }
        Ok(slots)
    }

    /// Read-only container holding just the primary key
    pub fn create_key_value_handler(&self, keys: &[Value]) -> Result<KeyValueHandler> {
        Ok(KeyValueHandler::new(self.expand_key_values(keys)?))
    }

    // ------------------------------------------------------------------------
    // Planning
    // ------------------------------------------------------------------------

    /// One fresh candidate per index, in index order
    pub fn create_candidate_indexes(&self) -> Vec<CandidateIndex> {
        self.indexes
            .iter()
            .enumerate()
            .map(|(ordinal, index)| CandidateIndex::new(ordinal, index))
            .collect()
    }
}
