//! Index handlers
//!
//! An `IndexHandler` is one index of a mapped table as an ordered list of
//! columns, each bound to the field that maps it. Index handlers are created
//! before the fields (from the dictionary, with fields registering
//! themselves later) or from a field's own index declaration. Once every
//! field exists, `assert_all_columns_have_fields` decides whether the index
//! is usable for queries.
//!
//! Index 0 of every domain type is the primary key hash index.

use clusterbind_core::{Error, Result};
use clusterbind_storage::{IndexKind, IndexMeta, TableMeta, PRIMARY_INDEX};
use std::collections::HashSet;

use crate::field::FieldHandler;

/// One index with its columns resolved to field numbers
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHandler {
    name: String,
    internal_name: String,
    table: String,
    unique: bool,
    kind: IndexKind,
    primary: bool,
    columns: Vec<String>,
    fields: Vec<Option<usize>>,
    usable: bool,
    reason: Option<String>,
}

fn check_columns(table: &str, index: &str, columns: &[String]) -> Result<()> {
    if columns.is_empty() {
        return Err(Error::user(format!("Index {} of table {} has no columns", index, table)));
    }
    let mut seen = HashSet::new();
    for column in columns {
        if !seen.insert(column.as_str()) {
            return Err(Error::user(format!(
                "Duplicate column {} in index {} of table {}",
                column, index, table
            )));
        }
    }
    Ok(())
}

impl IndexHandler {
    /// The primary key hash index of a table
    pub fn primary(table: &TableMeta) -> Self {
        Self {
            name: PRIMARY_INDEX.to_string(),
            internal_name: PRIMARY_INDEX.to_string(),
            table: table.name.clone(),
            unique: true,
            kind: IndexKind::Hash,
            primary: true,
            fields: vec![None; table.primary_key.len()],
            columns: table.primary_key.clone(),
            usable: true,
            reason: None,
        }
    }

    /// Index read from the dictionary; fields register themselves later
    pub fn from_dictionary(meta: &IndexMeta) -> Result<Self> {
        check_columns(&meta.table, &meta.name, &meta.columns)?;
        Ok(Self {
            name: meta.alias().to_string(),
            internal_name: meta.name.clone(),
            table: meta.table.clone(),
            unique: meta.unique,
            kind: meta.kind,
            primary: false,
            fields: vec![None; meta.columns.len()],
            columns: meta.columns.clone(),
            usable: true,
            reason: None,
        })
    }

    /// Index declared on a single field over that field's columns
    ///
    /// Such an index is not known to the dictionary, so it is never usable
    /// for access path selection; it is kept so that the declaration is
    /// reported.
    pub fn from_field(table: &str, name: &str, unique: bool, field: &FieldHandler) -> Result<Self> {
        let columns = field.columns().to_vec();
        check_columns(table, name, &columns)?;
        Ok(Self {
            name: name.to_string(),
            internal_name: name.to_string(),
            table: table.to_string(),
            unique,
            kind: if unique { IndexKind::Hash } else { IndexKind::Ordered },
            primary: false,
            fields: vec![None; columns.len()],
            columns,
            usable: false,
            reason: Some(format!("index {} is not defined in table {}", name, table)),
        })
    }

    /// Bind the column at `position` to a field
    pub(crate) fn bind(&mut self, position: usize, field_number: usize) -> Result<()> {
        match self.fields.get(position) {
            None => Err(Error::fatal(format!(
                "Position {} is out of range for index {}",
                position, self.name
            ))),
            Some(Some(other)) if *other != field_number => Err(Error::user(format!(
                "Column {} of index {} is already mapped by field number {}",
                self.columns[position], self.name, other
            ))),
            Some(_) => {
                self.fields[position] = Some(field_number);
                Ok(())
            }
        }
    }

    /// Decide usability now that every field exists
    ///
    /// Returns whether the index is usable.
    pub fn assert_all_columns_have_fields(&mut self, fields: &[FieldHandler]) -> bool {
        if self.reason.is_some() {
            self.usable = false;
            return false;
        }
        let hash = self.is_hash();
        for (position, column) in self.columns.iter().enumerate() {
            let field = self.fields[position].and_then(|n| fields.get(n));
            let problem = match field {
                None => Some(format!("column {} is not mapped by any field", column)),
                Some(f) if !f.columns().iter().any(|c| c == column) => {
                    Some(format!("field {} does not map column {}", f.name(), column))
                }
                Some(f) if !f.is_valid_index_type(hash) => Some(format!(
                    "field {} of type {} cannot be part of {} index",
                    f.name(),
                    f.field_type(),
                    if hash { "a hash" } else { "an ordered" }
                )),
                Some(_) => None,
            };
            if let Some(problem) = problem {
                self.usable = false;
                self.reason = Some(problem);
                return false;
            }
        }
        self.usable = true;
        true
    }

    /// User-visible name (unique suffix stripped)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name the engine knows the index by
    pub fn internal_name(&self) -> &str {
        &self.internal_name
    }

    /// Owning table
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Whether keys are unique
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Hash or ordered
    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    /// Whether this is a hash index
    pub fn is_hash(&self) -> bool {
        self.kind == IndexKind::Hash
    }

    /// Whether this is the primary key hash index
    pub fn is_primary(&self) -> bool {
        self.primary
    }

    /// Columns in index order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Field number per column, `None` until resolved
    pub fn fields(&self) -> &[Option<usize>] {
        &self.fields
    }

    /// Whether the index can be used for queries
    pub fn is_usable(&self) -> bool {
        self.usable
    }

    /// Why the index is unusable
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}
