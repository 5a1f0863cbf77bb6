//! Rows returned by reads and scans

use clusterbind_core::{ColumnDescriptor, Value};
use clusterbind_storage::{BlobHandle, ResultRow, StoreError, StoreResult, TableMeta};
use std::collections::BTreeSet;
use std::sync::Arc;

/// One fetched row
///
/// Only the columns requested with `get_value` (or `get_blob_handle`) on the
/// originating operation can be read.
#[derive(Debug, Clone)]
pub struct FetchedRow {
    table: Arc<TableMeta>,
    values: Vec<Value>,
    fetched: BTreeSet<usize>,
}

impl FetchedRow {
    pub(crate) fn new(table: Arc<TableMeta>, values: Vec<Value>, fetched: BTreeSet<usize>) -> Self {
        Self {
            table,
            values,
            fetched,
        }
    }

    /// Table the row came from
    pub fn table(&self) -> &TableMeta {
        &self.table
    }

    /// Primary key of the row
    pub fn key(&self) -> Vec<Value> {
        self.table.key_of(&self.values)
    }

    /// Value at a column ordinal, if it was fetched
    pub fn value_at(&self, ordinal: usize) -> Option<&Value> {
        if self.fetched.contains(&ordinal) {
            self.values.get(ordinal)
        } else {
            None
        }
    }

    fn fetched_value(&self, column: &ColumnDescriptor) -> StoreResult<&Value> {
        let column = self.table.require_column(&column.name)?;
        self.value_at(column.ordinal).ok_or_else(|| {
            StoreError::InvalidOperation(format!(
                "column {} of {} was not requested",
                column.name, self.table.name
            ))
        })
    }
}

impl ResultRow for FetchedRow {
    fn value(&self, column: &ColumnDescriptor) -> StoreResult<Value> {
        self.fetched_value(column).cloned()
    }

    fn get_blob(&self, column: &ColumnDescriptor) -> StoreResult<BlobHandle> {
        let value = self.fetched_value(column)?;
        if !column.is_lob() {
            return Err(StoreError::InvalidOperation(format!(
                "column {} is not a blob column",
                column.name
            )));
        }
        Ok(BlobHandle::with_value(column, value))
    }
}
