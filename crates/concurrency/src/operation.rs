//! Concrete operations
//!
//! Operations are created by a `Transaction` and only buffer their
//! definition; nothing touches data until the transaction executes.
//!
//! Columns are always resolved against the operation's own table, so a
//! descriptor from another source (e.g. a field handler's copy) addresses
//! the dictionary column of the same name.

use clusterbind_core::{ColumnDescriptor, Value};
use clusterbind_storage::operation::check_column_value;
use clusterbind_storage::{
    BlobHandle, BoundType, IndexMeta, IndexScanOperation, LockMode, Operation, OperationKind,
    PostExecuteCallback, ScanFilter, ScanFilterBuilder, ScanOperation, StoreError, StoreResult,
    TableMeta,
};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::callback::PostExecuteQueue;

/// Identifier of an operation within its transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OpId(pub(crate) u64);

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

/// State shared by every operation kind
#[derive(Debug)]
pub(crate) struct OperationCore {
    pub(crate) id: OpId,
    pub(crate) kind: OperationKind,
    pub(crate) table: Arc<TableMeta>,
    pub(crate) keys: BTreeMap<usize, Value>,
    pub(crate) values: BTreeMap<usize, Value>,
    pub(crate) fetch: BTreeSet<usize>,
    pub(crate) blobs: Vec<BlobHandle>,
    callbacks: PostExecuteQueue,
}

impl OperationCore {
    pub(crate) fn new(id: OpId, kind: OperationKind, table: Arc<TableMeta>, callbacks: PostExecuteQueue) -> Self {
        Self {
            id,
            kind,
            table,
            keys: BTreeMap::new(),
            values: BTreeMap::new(),
            fetch: BTreeSet::new(),
            blobs: Vec::new(),
            callbacks,
        }
    }

    fn resolve(&self, column: &ColumnDescriptor) -> StoreResult<ColumnDescriptor> {
        self.table.require_column(&column.name).cloned()
    }

    fn invalid(&self, what: String) -> StoreError {
        StoreError::InvalidOperation(format!("{:?} on {}: {}", self.kind, self.table.name, what))
    }

    fn equal(&mut self, key_columns: &[String], column: &ColumnDescriptor, value: Value) -> StoreResult<()> {
        let column = self.resolve(column)?;
        if !key_columns.contains(&column.name) {
            return Err(self.invalid(format!("column {} is not a key column", column.name)));
        }
        if value.is_null() {
            return Err(StoreError::NullNotAllowed { column: column.name });
        }
        check_column_value(&column, &value)?;
        self.keys.insert(column.ordinal, value);
        Ok(())
    }

    fn set(&mut self, column: &ColumnDescriptor, value: Value) -> StoreResult<()> {
        if !self.kind.accepts_values() {
            return Err(self.invalid(format!("cannot set column {}", column.name)));
        }
        let column = self.resolve(column)?;
        if column.primary_key {
            return Err(self.invalid(format!(
                "key column {} must be given with an equal predicate",
                column.name
            )));
        }
        check_column_value(&column, &value)?;
        self.values.insert(column.ordinal, value);
        Ok(())
    }

    fn get(&mut self, column: &ColumnDescriptor) -> StoreResult<()> {
        if !self.kind.returns_rows() {
            return Err(self.invalid(format!("cannot fetch column {}", column.name)));
        }
        let column = self.resolve(column)?;
        self.fetch.insert(column.ordinal);
        Ok(())
    }

    fn blob_handle(&mut self, column: &ColumnDescriptor) -> StoreResult<BlobHandle> {
        let column = self.resolve(column)?;
        if !column.is_lob() {
            return Err(self.invalid(format!("column {} is not a blob column", column.name)));
        }
        match self.kind {
            OperationKind::Insert | OperationKind::Update | OperationKind::Write => {}
            OperationKind::Read | OperationKind::UniqueRead => {
                self.fetch.insert(column.ordinal);
            }
            _ => return Err(self.invalid(format!("no blob handle for column {}", column.name))),
        }
        let handle = BlobHandle::new(&column);
        self.blobs.push(handle.clone());
        Ok(handle)
    }

    fn post_execute(&mut self, callback: PostExecuteCallback) {
        self.callbacks.push(callback);
    }
}

// ============================================================================
// Primary key and unique index operations
// ============================================================================

/// Insert, update, delete, write, primary key read or unique index read
#[derive(Debug)]
pub struct RowOperation {
    pub(crate) core: OperationCore,
    pub(crate) index: Option<IndexMeta>,
    pub(crate) lock_mode: LockMode,
}

impl RowOperation {
    pub(crate) fn new(core: OperationCore, index: Option<IndexMeta>) -> Self {
        Self {
            core,
            index,
            lock_mode: LockMode::default(),
        }
    }

    /// Operation id, used to fetch results after execute
    pub fn id(&self) -> OpId {
        self.core.id
    }

    /// Lock mode for reads
    pub fn set_lock_mode(&mut self, mode: LockMode) {
        self.lock_mode = mode;
    }

    /// Columns identifying the row: the unique index columns for a unique
    /// read, the primary key otherwise
    pub fn key_columns(&self) -> &[String] {
        match &self.index {
            Some(index) => &index.columns,
            None => &self.core.table.primary_key,
        }
    }

    /// Key values in key column order; fails naming the first missing column
    pub(crate) fn key_values(&self) -> StoreResult<Vec<Value>> {
        self.key_columns()
            .iter()
            .map(|name| {
                let column = self.core.table.require_column(name)?;
                self.core
                    .keys
                    .get(&column.ordinal)
                    .cloned()
                    .ok_or_else(|| StoreError::IncompleteKey {
                        target: self
                            .index
                            .as_ref()
                            .map_or_else(|| self.core.table.name.clone(), |i| i.alias().to_string()),
                        missing: name.clone(),
                    })
            })
            .collect()
    }
}

impl Operation for RowOperation {
    fn table(&self) -> &TableMeta {
        &self.core.table
    }

    fn kind(&self) -> OperationKind {
        self.core.kind
    }

    fn equal_value(&mut self, column: &ColumnDescriptor, value: Value) -> StoreResult<()> {
        let key_columns = self.key_columns().to_vec();
        self.core.equal(&key_columns, column, value)
    }

    fn set_value(&mut self, column: &ColumnDescriptor, value: Value) -> StoreResult<()> {
        self.core.set(column, value)
    }

    fn get_value(&mut self, column: &ColumnDescriptor) -> StoreResult<()> {
        self.core.get(column)
    }

    fn get_blob_handle(&mut self, column: &ColumnDescriptor) -> StoreResult<BlobHandle> {
        self.core.blob_handle(column)
    }

    fn post_execute_callback(&mut self, callback: PostExecuteCallback) {
        self.core.post_execute(callback)
    }
}

// ============================================================================
// Scans
// ============================================================================

/// Full table scan
#[derive(Debug)]
pub struct TableScan {
    pub(crate) core: OperationCore,
    pub(crate) filter: ScanFilterBuilder,
    pub(crate) lock_mode: LockMode,
}

impl TableScan {
    pub(crate) fn new(core: OperationCore) -> Self {
        Self {
            core,
            filter: ScanFilterBuilder::new(),
            lock_mode: LockMode::default(),
        }
    }

    /// Operation id, used to fetch results after execute
    pub fn id(&self) -> OpId {
        self.core.id
    }
}

/// Ordered index scan
#[derive(Debug)]
pub struct IndexScan {
    pub(crate) core: OperationCore,
    pub(crate) index: IndexMeta,
    pub(crate) bounds: Vec<(usize, BoundType, Value)>,
    pub(crate) filter: ScanFilterBuilder,
    pub(crate) lock_mode: LockMode,
}

impl IndexScan {
    pub(crate) fn new(core: OperationCore, index: IndexMeta) -> Self {
        Self {
            core,
            index,
            bounds: Vec::new(),
            filter: ScanFilterBuilder::new(),
            lock_mode: LockMode::default(),
        }
    }

    /// Operation id, used to fetch results after execute
    pub fn id(&self) -> OpId {
        self.core.id
    }
}

macro_rules! impl_scan_operation {
    ($ty:ty) => {
        impl Operation for $ty {
            fn table(&self) -> &TableMeta {
                &self.core.table
            }

            fn kind(&self) -> OperationKind {
                self.core.kind
            }

            fn equal_value(&mut self, column: &ColumnDescriptor, _value: Value) -> StoreResult<()> {
                Err(self
                    .core
                    .invalid(format!("equal on column {} in a scan", column.name)))
            }

            fn set_value(&mut self, column: &ColumnDescriptor, value: Value) -> StoreResult<()> {
                self.core.set(column, value)
            }

            fn get_value(&mut self, column: &ColumnDescriptor) -> StoreResult<()> {
                self.core.get(column)
            }

            fn get_blob_handle(&mut self, column: &ColumnDescriptor) -> StoreResult<BlobHandle> {
                self.core.blob_handle(column)
            }

            fn post_execute_callback(&mut self, callback: PostExecuteCallback) {
                self.core.post_execute(callback)
            }
        }

        impl ScanOperation for $ty {
            fn filter(&mut self) -> &mut dyn ScanFilter {
                &mut self.filter
            }

            fn set_lock_mode(&mut self, mode: LockMode) {
                self.lock_mode = mode;
            }
        }
    };
}

impl_scan_operation!(TableScan);
impl_scan_operation!(IndexScan);

impl IndexScanOperation for IndexScan {
    fn index(&self) -> &IndexMeta {
        &self.index
    }

    fn set_bound(&mut self, column: &ColumnDescriptor, bound: BoundType, value: Value) -> StoreResult<()> {
        let column = self.core.resolve(column)?;
        let position = self
            .index
            .columns
            .iter()
            .position(|c| *c == column.name)
            .ok_or_else(|| {
                self.core.invalid(format!(
                    "column {} is not part of index {}",
                    column.name,
                    self.index.alias()
                ))
            })?;
        if value.is_null() {
            return Err(self
                .core
                .invalid(format!("NULL bound on column {}", column.name)));
        }
        check_column_value(&column, &value)?;
        self.bounds.push((position, bound, value));
        Ok(())
    }
}
