//! Shared fixtures for unit tests

use clusterbind_core::{ColumnDescriptor, ColumnType, Value};
use clusterbind_storage::{
    BlobHandle, Dictionary, Operation, OperationKind, PostExecuteCallback, StoreResult, TableBuilder, TableMeta,
};

/// `employee(id INT PK, name VARCHAR NOT NULL, salary DECIMAL DEFAULT 0.00,
/// born YEAR, photo BLOB)` with a unique index on `name`
pub(crate) fn employee_table() -> TableMeta {
    TableBuilder::new("employee")
        .column(ColumnDescriptor::new("id", ColumnType::Int))
        .column(ColumnDescriptor::new("name", ColumnType::Varchar).not_null().with_length(64))
        .column(
            ColumnDescriptor::new("salary", ColumnType::Decimal)
                .with_precision(10, 2)
                .with_default("0.00"),
        )
        .column(ColumnDescriptor::new("born", ColumnType::Year))
        .column(ColumnDescriptor::new("photo", ColumnType::Blob))
        .primary_key(&["id"])
        .unique_index("idx_name", &["name"])
        .build()
        .unwrap()
}

pub(crate) fn employee_dictionary() -> Dictionary {
    let dictionary = Dictionary::new();
    dictionary.create_table(employee_table()).unwrap();
    dictionary
}

/// Operation that records every value-level call
pub(crate) struct RecordingOperation {
    table: TableMeta,
    pub(crate) calls: Vec<(String, String, Value)>,
    pub(crate) callbacks: Vec<PostExecuteCallback>,
}

impl RecordingOperation {
    pub(crate) fn new(table: TableMeta) -> Self {
        Self {
            table,
            calls: Vec::new(),
            callbacks: Vec::new(),
        }
    }

    fn record(&mut self, call: &str, column: &ColumnDescriptor, value: Value) {
        self.calls.push((call.to_string(), column.name.clone(), value));
    }
}

impl Operation for RecordingOperation {
    fn table(&self) -> &TableMeta {
        &self.table
    }

    fn kind(&self) -> OperationKind {
        OperationKind::Write
    }

    fn equal_value(&mut self, column: &ColumnDescriptor, value: Value) -> StoreResult<()> {
        self.record("equal", column, value);
        Ok(())
    }

    fn set_value(&mut self, column: &ColumnDescriptor, value: Value) -> StoreResult<()> {
        self.record("set", column, value);
        Ok(())
    }

    fn get_value(&mut self, column: &ColumnDescriptor) -> StoreResult<()> {
        self.record("get", column, Value::Null);
        Ok(())
    }

    fn get_blob_handle(&mut self, column: &ColumnDescriptor) -> StoreResult<BlobHandle> {
        self.record("blob", column, Value::Null);
        Ok(BlobHandle::new(column))
    }

    fn post_execute_callback(&mut self, callback: PostExecuteCallback) {
        self.callbacks.push(callback);
    }
}
