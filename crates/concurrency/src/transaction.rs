//! Transactions
//!
//! A `Transaction` buffers operations and runs them when `execute` is
//! called. Results of reads and scans are kept by operation id until the
//! transaction ends.
//!
//! ## Execute protocol
//!
//! `execute(exec_type, abort_option, force)`:
//! 1. `Rollback` discards everything.
//! 2. `Commit` with post-execute callbacks pending first runs a forced
//!    `NoCommit` execute, so that callbacks registered by operations run
//!    (and the blob writes they stage are flushed) before the commit.
//! 3. Pending operations run in creation order against the transaction's
//!    private overlay. Blob handles of executed operations become active.
//! 4. Post-execute callbacks run in registration order; the queue is always
//!    emptied, and the first failure is returned.
//! 5. Blob writes staged through active handles are flushed into the
//!    overlay.
//! 6. `Commit` publishes the overlay to the cluster atomically.
//!
//! With `AbortOption::AbortOnError` the first failing operation aborts the
//! transaction. With `IgnoreError` the failure is recorded against the
//! operation and the remaining operations still run.

use clusterbind_core::{ColumnType, Value};
use clusterbind_storage::{
    column_cmp, AbortOption, BlobHandle, BoundType, Cluster, ExecType, IndexKind, OperationKind, PartitionKey,
    RowKey, RowWrite, StoreError, StoreResult, TableMeta,
};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::callback::PostExecuteQueue;
use crate::operation::{IndexScan, OpId, OperationCore, RowOperation, TableScan};
use crate::row::FetchedRow;

/// Status of a transaction in its lifecycle
///
/// `Active` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Operations can be defined and executed
    Active,
    /// Writes were published
    Committed,
    /// Discarded by the caller
    RolledBack,
    /// Discarded after a failure
    Aborted,
}

#[derive(Debug)]
enum Outcome {
    Done,
    Row(Option<FetchedRow>),
    Rows(Vec<FetchedRow>),
    Failed(StoreError),
}

enum Pending {
    Row(RowOperation),
    TableScan(TableScan),
    IndexScan(IndexScan),
}

impl Pending {
    fn id(&self) -> OpId {
        match self {
            Pending::Row(op) => op.id(),
            Pending::TableScan(op) => op.id(),
            Pending::IndexScan(op) => op.id(),
        }
    }
}

struct ActiveBlob {
    table: String,
    key: RowKey,
    handle: BlobHandle,
}

type OverlayKey = (String, RowKey);

/// A transaction against a cluster
pub struct Transaction {
    id: u64,
    cluster: Arc<Cluster>,
    status: TransactionStatus,
    partition: Option<u32>,
    next_op: u64,
    rows: Vec<RowOperation>,
    table_scans: Vec<TableScan>,
    index_scans: Vec<IndexScan>,
    results: HashMap<OpId, Outcome>,
    overlay: BTreeMap<OverlayKey, Option<Vec<Value>>>,
    inserted: BTreeSet<OverlayKey>,
    active_blobs: Vec<ActiveBlob>,
    callbacks: PostExecuteQueue,
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("cluster", &self.cluster.name())
            .field("status", &self.status)
            .field("pending", &self.pending_operations())
            .field("callbacks", &self.callbacks)
            .finish()
    }
}

impl Transaction {
    /// Start a transaction
    pub fn begin(cluster: Arc<Cluster>) -> Self {
        let id = cluster.next_transaction_id();
        debug!(target: "clusterbind::txn", txn_id = id, cluster = %cluster.name(), "Transaction started");
        Self {
            id,
            cluster,
            status: TransactionStatus::Active,
            partition: None,
            next_op: 1,
            rows: Vec::new(),
            table_scans: Vec::new(),
            index_scans: Vec::new(),
            results: HashMap::new(),
            overlay: BTreeMap::new(),
            inserted: BTreeSet::new(),
            active_blobs: Vec::new(),
            callbacks: PostExecuteQueue::new(),
        }
    }

    /// Start a transaction routed by a partition key
    pub fn begin_with_partition_key(cluster: Arc<Cluster>, key: &PartitionKey) -> StoreResult<Self> {
        let partition = key.partition_id(cluster.partition_count())?;
        let mut tx = Self::begin(cluster);
        tx.partition = Some(partition);
        debug!(target: "clusterbind::txn", txn_id = tx.id, partition, "Transaction routed by partition key");
        Ok(tx)
    }

    /// Transaction id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current status
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Whether operations may still be defined and executed
    pub fn is_active(&self) -> bool {
        self.status == TransactionStatus::Active
    }

    /// Partition the transaction was routed to, if a partition key was given
    pub fn partition(&self) -> Option<u32> {
        self.partition
    }

    /// The cluster this transaction runs against
    pub fn cluster(&self) -> &Arc<Cluster> {
        &self.cluster
    }

    /// Number of defined but not yet executed operations
    pub fn pending_operations(&self) -> usize {
        self.rows.len() + self.table_scans.len() + self.index_scans.len()
    }

    /// Number of post-execute callbacks waiting to run
    pub fn pending_callbacks(&self) -> usize {
        self.callbacks.len()
    }

    fn require_active(&self) -> StoreResult<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(StoreError::TransactionNotActive {
                state: format!("{:?}", self.status),
            })
        }
    }

    fn core(&mut self, kind: OperationKind, table: &str) -> StoreResult<OperationCore> {
        self.require_active()?;
        let table = self.cluster.dictionary().get_table(table)?;
        let id = OpId(self.next_op);
        self.next_op += 1;
        Ok(OperationCore::new(id, kind, table, self.callbacks.clone()))
    }

    fn push_row(&mut self, kind: OperationKind, table: &str) -> StoreResult<&mut RowOperation> {
        let op = RowOperation::new(self.core(kind, table)?, None);
        let n = self.rows.len();
        self.rows.push(op);
        Ok(&mut self.rows[n])
    }

    // ========================================================================
    // Operation factories
    // ========================================================================

    /// Insert a row
    pub fn insert(&mut self, table: &str) -> StoreResult<&mut RowOperation> {
        self.push_row(OperationKind::Insert, table)
    }

    /// Update an existing row
    pub fn update(&mut self, table: &str) -> StoreResult<&mut RowOperation> {
        self.push_row(OperationKind::Update, table)
    }

    /// Delete an existing row
    pub fn delete(&mut self, table: &str) -> StoreResult<&mut RowOperation> {
        self.push_row(OperationKind::Delete, table)
    }

    /// Insert or overwrite a row
    pub fn write(&mut self, table: &str) -> StoreResult<&mut RowOperation> {
        self.push_row(OperationKind::Write, table)
    }

    /// Read a row by primary key
    pub fn read(&mut self, table: &str) -> StoreResult<&mut RowOperation> {
        self.push_row(OperationKind::Read, table)
    }

    /// Read a row by unique index
    pub fn unique_read(&mut self, table: &str, index: &str) -> StoreResult<&mut RowOperation> {
        let core = self.core(OperationKind::UniqueRead, table)?;
        let index = self.cluster.dictionary().get_index(index, table)?;
        if !index.unique {
            return Err(StoreError::InvalidOperation(format!(
                "index {} on {} is not unique",
                index.alias(),
                table
            )));
        }
        let n = self.rows.len();
        self.rows.push(RowOperation::new(core, Some(index)));
        Ok(&mut self.rows[n])
    }

    /// Scan a whole table
    pub fn table_scan(&mut self, table: &str) -> StoreResult<&mut TableScan> {
        let core = self.core(OperationKind::TableScan, table)?;
        let n = self.table_scans.len();
        self.table_scans.push(TableScan::new(core));
        Ok(&mut self.table_scans[n])
    }

    /// Scan an ordered index
    pub fn index_scan(&mut self, table: &str, index: &str) -> StoreResult<&mut IndexScan> {
        let core = self.core(OperationKind::IndexScan, table)?;
        let meta = core
            .table
            .index(index, false)
            .filter(|i| i.kind == IndexKind::Ordered)
            .cloned()
            .ok_or_else(|| StoreError::NoSuchIndex {
                table: table.to_string(),
                index: index.to_string(),
            })?;
        let n = self.index_scans.len();
        self.index_scans.push(IndexScan::new(core, meta));
        Ok(&mut self.index_scans[n])
    }

    // ========================================================================
    // Results
    // ========================================================================

    /// Row fetched by a read operation (`None` if not found or not run)
    pub fn row(&self, op: OpId) -> Option<&FetchedRow> {
        match self.results.get(&op) {
            Some(Outcome::Row(row)) => row.as_ref(),
            _ => None,
        }
    }

    /// Whether a read operation found its row
    pub fn was_found(&self, op: OpId) -> bool {
        self.row(op).is_some()
    }

    /// Rows produced by a scan operation
    pub fn rows(&self, op: OpId) -> &[FetchedRow] {
        match self.results.get(&op) {
            Some(Outcome::Rows(rows)) => rows,
            _ => &[],
        }
    }

    /// Take the rows produced by a scan operation
    pub fn take_rows(&mut self, op: OpId) -> Vec<FetchedRow> {
        match self.results.remove(&op) {
            Some(Outcome::Rows(rows)) => rows,
            Some(other) => {
                self.results.insert(op, other);
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    /// Error recorded for an operation executed with `IgnoreError`
    pub fn error(&self, op: OpId) -> Option<&StoreError> {
        match self.results.get(&op) {
            Some(Outcome::Failed(e)) => Some(e),
            _ => None,
        }
    }

    /// Whether an operation has been executed successfully
    pub fn is_done(&self, op: OpId) -> bool {
        matches!(
            self.results.get(&op),
            Some(Outcome::Done | Outcome::Row(_) | Outcome::Rows(_))
        )
    }

    // ========================================================================
    // Execute / commit / rollback
    // ========================================================================

    /// Run pending operations and callbacks, then commit or roll back
    pub fn execute(&mut self, exec: ExecType, abort: AbortOption, force: bool) -> StoreResult<()> {
        self.require_active()?;
        debug!(
            target: "clusterbind::txn",
            txn_id = self.id,
            exec = ?exec,
            abort = ?abort,
            force,
            pending = self.pending_operations(),
            callbacks = self.callbacks.len(),
            "Execute"
        );

        match exec {
            ExecType::Rollback => return self.rollback(),
            ExecType::Commit if !self.callbacks.is_empty() => {
                debug!(target: "clusterbind::txn", txn_id = self.id, "Flushing post-execute callbacks before commit");
                self.execute(ExecType::NoCommit, abort, true)?;
            }
            _ => {}
        }

        let result = self
            .run_pending(abort)
            .and_then(|_| self.run_callbacks())
            .and_then(|_| self.flush_blob_writes());
        if let Err(e) = result {
            self.abort(&e);
            return Err(e);
        }

        if exec == ExecType::Commit {
            self.publish()?;
        }
        Ok(())
    }

    /// Execute everything and commit
    pub fn commit(&mut self) -> StoreResult<()> {
        self.execute(ExecType::Commit, AbortOption::AbortOnError, false)
    }

    /// Discard all operations and buffered writes
    pub fn rollback(&mut self) -> StoreResult<()> {
        match self.status {
            TransactionStatus::Committed => Err(StoreError::TransactionNotActive {
                state: "Committed".to_string(),
            }),
            TransactionStatus::Active => {
                self.discard();
                self.status = TransactionStatus::RolledBack;
                debug!(target: "clusterbind::txn", txn_id = self.id, "Transaction rolled back");
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// End the transaction, rolling back if still active
    pub fn close(mut self) {
        if self.is_active() {
            if let Err(e) = self.rollback() {
                warn!(target: "clusterbind::txn", txn_id = self.id, error = %e, "Rollback on close failed");
            }
        }
    }

    fn discard(&mut self) {
        self.rows.clear();
        self.table_scans.clear();
        self.index_scans.clear();
        self.overlay.clear();
        self.inserted.clear();
        self.active_blobs.clear();
        self.callbacks.clear();
    }

    fn abort(&mut self, error: &StoreError) {
        warn!(target: "clusterbind::txn", txn_id = self.id, error = %error, "Transaction aborted");
        self.discard();
        self.status = TransactionStatus::Aborted;
    }

    fn run_pending(&mut self, abort: AbortOption) -> StoreResult<()> {
        let mut pending: Vec<Pending> = Vec::with_capacity(self.pending_operations());
        pending.extend(self.rows.drain(..).map(Pending::Row));
        pending.extend(self.table_scans.drain(..).map(Pending::TableScan));
        pending.extend(self.index_scans.drain(..).map(Pending::IndexScan));
        pending.sort_by_key(Pending::id);

        for op in pending {
            let id = op.id();
            let outcome = match op {
                Pending::Row(op) => self.run_row(op),
                Pending::TableScan(op) => self.run_table_scan(op),
                Pending::IndexScan(op) => self.run_index_scan(op),
            };
            match outcome {
                Ok(outcome) => {
                    self.results.insert(id, outcome);
                }
                Err(e) if abort == AbortOption::IgnoreError => {
                    debug!(target: "clusterbind::txn", txn_id = self.id, op = %id, error = %e, "Operation failed, ignored");
                    self.results.insert(id, Outcome::Failed(e));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn run_callbacks(&mut self) -> StoreResult<()> {
        let ran = self.callbacks.run_all()?;
        if ran > 0 {
            debug!(target: "clusterbind::txn", txn_id = self.id, callbacks = ran, "Post-execute callbacks done");
        }
        Ok(())
    }

    fn flush_blob_writes(&mut self) -> StoreResult<()> {
        let blobs = std::mem::take(&mut self.active_blobs);
        let mut result = Ok(());
        for blob in &blobs {
            if let Err(e) = self.flush_blob(blob) {
                result = Err(e);
                break;
            }
        }
        self.active_blobs = blobs;
        result
    }

    fn flush_blob(&mut self, blob: &ActiveBlob) -> StoreResult<()> {
        let Some(value) = blob.handle.take_pending()? else {
            return Ok(());
        };
        let mut row = self
            .current_row(&blob.table, &blob.key)?
            .ok_or_else(|| StoreError::RowNotFound {
                table: blob.table.clone(),
            })?;
        row[blob.handle.column().ordinal] = value;
        self.overlay
            .insert((blob.table.clone(), blob.key.clone()), Some(row));
        Ok(())
    }

    fn publish(&mut self) -> StoreResult<()> {
        let overlay = std::mem::take(&mut self.overlay);
        let writes: Vec<RowWrite> = overlay
            .into_iter()
            .map(|((table, key), row)| match row {
                Some(row) if self.inserted.contains(&(table.clone(), key.clone())) => {
                    RowWrite::Insert { table, key, row }
                }
                Some(row) => RowWrite::Put { table, key, row },
                None => RowWrite::Delete { table, key },
            })
            .collect();
        match self.cluster.apply(writes) {
            Ok(count) => {
                self.discard();
                self.status = TransactionStatus::Committed;
                info!(target: "clusterbind::txn", txn_id = self.id, writes = count, "Transaction committed");
                Ok(())
            }
            Err(e) => {
                self.abort(&e);
                Err(e)
            }
        }
    }

    // ========================================================================
    // Data access
    // ========================================================================

    fn current_row(&self, table: &str, key: &[Value]) -> StoreResult<Option<Vec<Value>>> {
        match self.overlay.get(&(table.to_string(), key.to_vec())) {
            Some(row) => Ok(row.clone()),
            None => self.cluster.read_row(table, key),
        }
    }

    fn merged_rows(&self, table: &str) -> StoreResult<BTreeMap<RowKey, Vec<Value>>> {
        let mut rows: BTreeMap<RowKey, Vec<Value>> = self.cluster.scan_rows(table)?.into_iter().collect();
        for ((t, key), row) in &self.overlay {
            if t != table {
                continue;
            }
            match row {
                Some(row) => {
                    rows.insert(key.clone(), row.clone());
                }
                None => {
                    rows.remove(key);
                }
            }
        }
        Ok(rows)
    }

    fn run_row(&mut self, op: RowOperation) -> StoreResult<Outcome> {
        let table = Arc::clone(&op.core.table);
        let name = table.name.clone();
        match op.core.kind {
            OperationKind::Insert => {
                let key = op.key_values()?;
                if self.current_row(&name, &key)?.is_some() {
                    return Err(StoreError::DuplicateKey { table: name });
                }
                let row = build_row(&table, &op, None)?;
                if self.cluster.read_row(&name, &key)?.is_none() {
                    self.inserted.insert((name.clone(), key.clone()));
                }
                self.store(&op, name, key, row);
                Ok(Outcome::Done)
            }
            OperationKind::Update => {
                let key = op.key_values()?;
                let existing = self
                    .current_row(&name, &key)?
                    .ok_or_else(|| StoreError::RowNotFound { table: name.clone() })?;
                let row = build_row(&table, &op, Some(existing))?;
                self.store(&op, name, key, row);
                Ok(Outcome::Done)
            }
            OperationKind::Write => {
                let key = op.key_values()?;
                let row = build_row(&table, &op, None)?;
                if self.current_row(&name, &key)?.is_none() && self.cluster.read_row(&name, &key)?.is_none() {
                    self.inserted.insert((name.clone(), key.clone()));
                }
                self.store(&op, name, key, row);
                Ok(Outcome::Done)
            }
            OperationKind::Delete => {
                let key = op.key_values()?;
                if self.current_row(&name, &key)?.is_none() {
                    return Err(StoreError::RowNotFound { table: name });
                }
                self.inserted.remove(&(name.clone(), key.clone()));
                self.overlay.insert((name, key), None);
                Ok(Outcome::Done)
            }
            OperationKind::Read => {
                let key = op.key_values()?;
                let row = self.current_row(&name, &key)?;
                Ok(Outcome::Row(row.map(|row| self.fetched(&op, key, row))))
            }
            OperationKind::UniqueRead => {
                let values = op.key_values()?;
                let ordinals = ordinals(&table, op.key_columns())?;
                let found = self
                    .merged_rows(&name)?
                    .into_iter()
                    .find(|(_, row)| ordinals.iter().zip(&values).all(|(o, v)| &row[*o] == v));
                Ok(Outcome::Row(found.map(|(key, row)| self.fetched(&op, key, row))))
            }
            OperationKind::TableScan | OperationKind::IndexScan => Err(StoreError::InvalidOperation(
                format!("{:?} is not a row operation", op.core.kind),
            )),
        }
    }

    fn store(&mut self, op: &RowOperation, table: String, key: RowKey, row: Vec<Value>) {
        for handle in &op.core.blobs {
            handle.activate(&row[handle.column().ordinal]);
            self.active_blobs.push(ActiveBlob {
                table: table.clone(),
                key: key.clone(),
                handle: handle.clone(),
            });
        }
        self.overlay.insert((table, key), Some(row));
    }

    fn fetched(&mut self, op: &RowOperation, key: RowKey, row: Vec<Value>) -> FetchedRow {
        for handle in &op.core.blobs {
            handle.activate(&row[handle.column().ordinal]);
            self.active_blobs.push(ActiveBlob {
                table: op.core.table.name.clone(),
                key: key.clone(),
                handle: handle.clone(),
            });
        }
        FetchedRow::new(Arc::clone(&op.core.table), row, op.core.fetch.clone())
    }

    fn run_table_scan(&mut self, op: TableScan) -> StoreResult<Outcome> {
        let filter = op.filter.finish()?;
        let rows = self
            .merged_rows(&op.core.table.name)?
            .into_values()
            .filter(|row| filter.as_ref().map_or(true, |f| f.evaluate(row)))
            .map(|row| FetchedRow::new(Arc::clone(&op.core.table), row, op.core.fetch.clone()))
            .collect();
        Ok(Outcome::Rows(rows))
    }

    fn run_index_scan(&mut self, op: IndexScan) -> StoreResult<Outcome> {
        let filter = op.filter.finish()?;
        let columns = index_columns(&op.core.table, &op.index.columns)?;
        let mut rows: Vec<Vec<Value>> = self
            .merged_rows(&op.core.table.name)?
            .into_values()
            .filter(|row| within_bounds(row, &columns, &op.bounds))
            .filter(|row| filter.as_ref().map_or(true, |f| f.evaluate(row)))
            .collect();
        rows.sort_by(|a, b| {
            columns
                .iter()
                .map(|(o, column_type)| column_cmp(*column_type, &a[*o], &b[*o]))
                .find(|c| *c != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
        Ok(Outcome::Rows(
            rows.into_iter()
                .map(|row| FetchedRow::new(Arc::clone(&op.core.table), row, op.core.fetch.clone()))
                .collect(),
        ))
    }
}

fn ordinals(table: &TableMeta, columns: &[String]) -> StoreResult<Vec<usize>> {
    columns
        .iter()
        .map(|c| table.require_column(c).map(|c| c.ordinal))
        .collect()
}

/// Ordinal and type of each index column, in index order
fn index_columns(table: &TableMeta, columns: &[String]) -> StoreResult<Vec<(usize, ColumnType)>> {
    columns
        .iter()
        .map(|c| table.require_column(c).map(|c| (c.ordinal, c.column_type)))
        .collect()
}

fn build_row(table: &TableMeta, op: &RowOperation, base: Option<Vec<Value>>) -> StoreResult<Vec<Value>> {
    let mut row = base.unwrap_or_else(|| vec![Value::Null; table.columns.len()]);
    for (ordinal, value) in op.core.keys.iter().chain(op.core.values.iter()) {
        row[*ordinal] = value.clone();
    }
    if let Some(column) = table
        .columns
        .iter()
        .find(|c| !c.nullable && row[c.ordinal].is_null())
    {
        return Err(StoreError::NullNotAllowed {
            column: column.name.clone(),
        });
    }
    Ok(row)
}

fn within_bounds(row: &[Value], columns: &[(usize, ColumnType)], bounds: &[(usize, BoundType, Value)]) -> bool {
    bounds.iter().all(|(position, bound, value)| {
        let (ordinal, column_type) = columns[*position];
        let column_value = &row[ordinal];
        if column_value.is_null() {
            return false;
        }
        let ordering = column_cmp(column_type, column_value, value);
        match bound {
            BoundType::Eq => ordering == Ordering::Equal,
            BoundType::Ge => ordering != Ordering::Less,
            BoundType::Gt => ordering == Ordering::Greater,
            BoundType::Le => ordering != Ordering::Greater,
            BoundType::Lt => ordering == Ordering::Less,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clusterbind_core::ColumnDescriptor;
    use clusterbind_storage::{
        BinaryCondition, FilterGroup, IndexScanOperation, Operation, ResultRow, ScanFilter,
        ScanOperation, TableBuilder,
    };

    fn cluster() -> Arc<Cluster> {
        let cluster = Cluster::new("test", 4);
        cluster
            .create_table(
                TableBuilder::new("employee")
                    .column(ColumnDescriptor::new("id", ColumnType::Int))
                    .column(ColumnDescriptor::new("name", ColumnType::Varchar))
                    .column(ColumnDescriptor::new("email", ColumnType::Varchar))
                    .column(ColumnDescriptor::new("photo", ColumnType::Blob))
                    .primary_key(&["id"])
                    .unique_index("idx_email", &["email"])
                    .ordered_index("idx_name", &["name"])
                    .build()
                    .unwrap(),
            )
            .unwrap();
        Arc::new(cluster)
    }

    fn col(cluster: &Cluster, name: &str) -> ColumnDescriptor {
        cluster
            .dictionary()
            .get_table("employee")
            .unwrap()
            .column(name)
            .unwrap()
            .clone()
    }

    fn insert(tx: &mut Transaction, cluster: &Cluster, id: i32, name: &str) {
        let op = tx.insert("employee").unwrap();
        op.equal_int(&col(cluster, "id"), id).unwrap();
        op.set_string(&col(cluster, "name"), name.into()).unwrap();
        op.set_string(&col(cluster, "email"), format!("{}@x", name)).unwrap();
    }

    #[test]
    fn test_insert_commit_read() {
        let c = cluster();
        let mut tx = Transaction::begin(Arc::clone(&c));
        insert(&mut tx, &c, 1, "ann");
        tx.commit().unwrap();
        assert_eq!(tx.status(), TransactionStatus::Committed);

        let mut tx = Transaction::begin(Arc::clone(&c));
        let op = tx.read("employee").unwrap();
        op.equal_int(&col(&c, "id"), 1).unwrap();
        op.get_value(&col(&c, "name")).unwrap();
        let id = op.id();
        tx.execute(ExecType::NoCommit, AbortOption::AbortOnError, false).unwrap();
        let row = tx.row(id).unwrap();
        assert_eq!(row.get_string(&col(&c, "name")).unwrap(), Some("ann".to_string()));
    }

    #[test]
    fn test_read_miss_is_not_an_error() {
        let c = cluster();
        let mut tx = Transaction::begin(Arc::clone(&c));
        let op = tx.read("employee").unwrap();
        op.equal_int(&col(&c, "id"), 9).unwrap();
        let id = op.id();
        tx.execute(ExecType::NoCommit, AbortOption::AbortOnError, false).unwrap();
        assert!(!tx.was_found(id));
        assert!(tx.is_done(id));
    }

    #[test]
    fn test_uncommitted_writes_are_private() {
        let c = cluster();
        let mut tx = Transaction::begin(Arc::clone(&c));
        insert(&mut tx, &c, 1, "ann");
        tx.execute(ExecType::NoCommit, AbortOption::AbortOnError, false).unwrap();
        assert_eq!(c.row_count("employee").unwrap(), 0);
        tx.rollback().unwrap();
        assert_eq!(c.row_count("employee").unwrap(), 0);
    }

    #[test]
    fn test_duplicate_insert_aborts() {
        let c = cluster();
        let mut tx = Transaction::begin(Arc::clone(&c));
        insert(&mut tx, &c, 1, "ann");
        insert(&mut tx, &c, 1, "bob");
        let err = tx.commit().unwrap_err();
        assert!(err.is_duplicate_key());
        assert_eq!(tx.status(), TransactionStatus::Aborted);
        assert!(tx.insert("employee").is_err());
    }

    #[test]
    fn test_racing_insert_fails_at_publish() {
        let c = cluster();
        let mut first = Transaction::begin(Arc::clone(&c));
        insert(&mut first, &c, 1, "ann");
        first.execute(ExecType::NoCommit, AbortOption::AbortOnError, false).unwrap();

        let mut second = Transaction::begin(Arc::clone(&c));
        insert(&mut second, &c, 1, "bob");
        second.commit().unwrap();

        assert!(first.commit().unwrap_err().is_duplicate_key());
        let row = c.read_row("employee", &[Value::Int(1)]).unwrap().unwrap();
        assert_eq!(row[col(&c, "name").ordinal], Value::from("bob"));
    }

    #[test]
    fn test_insert_then_delete_writes_nothing() {
        let c = cluster();
        let mut tx = Transaction::begin(Arc::clone(&c));
        insert(&mut tx, &c, 1, "ann");
        let op = tx.delete("employee").unwrap();
        op.equal_int(&col(&c, "id"), 1).unwrap();
        tx.commit().unwrap();
        assert_eq!(c.row_count("employee").unwrap(), 0);
    }

    #[test]
    fn test_ignore_error_records_failure() {
        let c = cluster();
        let mut tx = Transaction::begin(Arc::clone(&c));
        let op = tx.delete("employee").unwrap();
        op.equal_int(&col(&c, "id"), 5).unwrap();
        let failed = op.id();
        insert(&mut tx, &c, 2, "bob");
        tx.execute(ExecType::Commit, AbortOption::IgnoreError, false).unwrap();
        assert!(tx.error(failed).unwrap().is_row_not_found());
        assert_eq!(c.row_count("employee").unwrap(), 1);
    }

    #[test]
    fn test_update_missing_row() {
        let c = cluster();
        let mut tx = Transaction::begin(Arc::clone(&c));
        let op = tx.update("employee").unwrap();
        op.equal_int(&col(&c, "id"), 5).unwrap();
        op.set_string(&col(&c, "name"), "x".into()).unwrap();
        assert!(tx.commit().unwrap_err().is_row_not_found());
    }

    #[test]
    fn test_unique_read_and_scans() {
        let c = cluster();
        let mut tx = Transaction::begin(Arc::clone(&c));
        insert(&mut tx, &c, 1, "carl");
        insert(&mut tx, &c, 2, "ann");
        insert(&mut tx, &c, 3, "bob");
        tx.commit().unwrap();

        let mut tx = Transaction::begin(Arc::clone(&c));
        let op = tx.unique_read("employee", "idx_email").unwrap();
        op.equal_string(&col(&c, "email"), "bob@x".into()).unwrap();
        op.get_value(&col(&c, "id")).unwrap();
        let unique = op.id();

        let scan = tx.index_scan("employee", "idx_name").unwrap();
        scan.set_bound_string(&col(&c, "name"), BoundType::Ge, "b".into()).unwrap();
        scan.get_value(&col(&c, "name")).unwrap();
        let ranged = scan.id();

        let scan = tx.table_scan("employee").unwrap();
        scan.get_value(&col(&c, "id")).unwrap();
        let filter = scan.filter();
        filter.begin(FilterGroup::And).unwrap();
        filter.cmp_int(BinaryCondition::Le, &col(&c, "id"), 2).unwrap();
        filter.end().unwrap();
        let filtered = scan.id();

        tx.execute(ExecType::NoCommit, AbortOption::AbortOnError, false).unwrap();
        assert_eq!(tx.row(unique).unwrap().get_int(&col(&c, "id")).unwrap(), 3);
        let names: Vec<_> = tx
            .rows(ranged)
            .iter()
            .map(|r| r.get_string(&col(&c, "name")).unwrap().unwrap())
            .collect();
        assert_eq!(names, vec!["bob".to_string(), "carl".to_string()]);
        assert_eq!(tx.take_rows(filtered).len(), 2);
    }

    #[test]
    fn test_blob_two_phase_write() {
        let c = cluster();
        let photo = col(&c, "photo");
        let mut tx = Transaction::begin(Arc::clone(&c));
        insert(&mut tx, &c, 1, "ann");
        let op = tx.insert("employee").unwrap();
        op.equal_int(&col(&c, "id"), 2).unwrap();
        op.set_string(&col(&c, "name"), "bob".into()).unwrap();
        op.set_bytes(&photo, Vec::new()).unwrap();
        let handle = op.get_blob_handle(&photo).unwrap();
        let h = handle.clone();
        op.post_execute_callback(Box::new(move || h.write_data(&[1, 2, 3])));
        assert_eq!(tx.pending_callbacks(), 1);
        tx.commit().unwrap();

        let row = c.read_row("employee", &[Value::Int(2)]).unwrap().unwrap();
        assert_eq!(row[photo.ordinal], Value::Bytes(vec![1, 2, 3]));
    }

    #[test]
    fn test_failing_callback_aborts_and_clears() {
        let c = cluster();
        let mut tx = Transaction::begin(Arc::clone(&c));
        let op = tx.insert("employee").unwrap();
        op.equal_int(&col(&c, "id"), 1).unwrap();
        op.post_execute_callback(Box::new(|| Err(StoreError::InvalidOperation("nope".into()))));
        let err = tx.commit().unwrap_err();
        assert!(matches!(err, StoreError::Callback(_)));
        assert_eq!(tx.pending_callbacks(), 0);
        assert_eq!(c.row_count("employee").unwrap(), 0);
    }

    #[test]
    fn test_partition_routing() {
        let c = cluster();
        let table = c.dictionary().get_table("employee").unwrap();
        let mut key = PartitionKey::new(&table);
        key.add_int_key(7).unwrap();
        let tx = Transaction::begin_with_partition_key(Arc::clone(&c), &key).unwrap();
        assert!(tx.partition().unwrap() < 4);
        tx.close();
    }
}
