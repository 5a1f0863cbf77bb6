//! Cluster: committed row data
//!
//! One ordered map per table, keyed by primary key values. Transactions
//! read committed rows through `read_row` / `scan_rows` and publish their
//! writes atomically through `apply`, which validates every write before
//! touching any table.

use clusterbind_core::Value;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::dictionary::{Dictionary, TableMeta};
use crate::error::{StoreError, StoreResult};

/// Primary key values, in key column order
pub type RowKey = Vec<Value>;

type TableData = RwLock<BTreeMap<RowKey, Vec<Value>>>;

/// A single committed change
#[derive(Debug, Clone, PartialEq)]
pub enum RowWrite {
    /// Insert a row that must not exist yet
    Insert {
        /// Table name
        table: String,
        /// Primary key
        key: RowKey,
        /// Full row, in column ordinal order
        row: Vec<Value>,
    },
    /// Insert or overwrite a row
    Put {
        /// Table name
        table: String,
        /// Primary key
        key: RowKey,
        /// Full row, in column ordinal order
        row: Vec<Value>,
    },
    /// Remove a row if present
    Delete {
        /// Table name
        table: String,
        /// Primary key
        key: RowKey,
    },
}

impl RowWrite {
    fn table(&self) -> &str {
        match self {
            RowWrite::Insert { table, .. } | RowWrite::Put { table, .. } | RowWrite::Delete { table, .. } => {
                table
            }
        }
    }
}

/// An in-memory cluster
#[derive(Debug)]
pub struct Cluster {
    name: String,
    partition_count: u32,
    dictionary: Dictionary,
    tables: DashMap<String, Arc<TableData>>,
    commit_lock: Mutex<()>,
    next_txn_id: AtomicU64,
}

impl Cluster {
    /// Create an empty cluster
    pub fn new(name: impl Into<String>, partition_count: u32) -> Self {
        let name = name.into();
        info!(target: "clusterbind::storage", cluster = %name, partition_count, "Cluster created");
        Self {
            name,
            partition_count: partition_count.max(1),
            dictionary: Dictionary::new(),
            tables: DashMap::new(),
            commit_lock: Mutex::new(()),
            next_txn_id: AtomicU64::new(1),
        }
    }

    /// Cluster name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of data partitions
    pub fn partition_count(&self) -> u32 {
        self.partition_count
    }

    /// The dictionary
    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// Allocate a transaction id
    pub fn next_transaction_id(&self) -> u64 {
        self.next_txn_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Define a table
    pub fn create_table(&self, table: TableMeta) -> StoreResult<Arc<TableMeta>> {
        let table = self.dictionary.create_table(table)?;
        self.tables
            .insert(table.name.clone(), Arc::new(RwLock::new(BTreeMap::new())));
        debug!(target: "clusterbind::storage", table = %table.name, "Table created");
        Ok(table)
    }

    /// Drop a table and its data
    pub fn drop_table(&self, name: &str) -> StoreResult<()> {
        let _guard = self.commit_lock.lock();
        self.dictionary.drop_table(name)?;
        self.tables.remove(name);
        debug!(target: "clusterbind::storage", table = %name, "Table dropped");
        Ok(())
    }

    fn data(&self, table: &str) -> StoreResult<Arc<TableData>> {
        self.tables
            .get(table)
            .map(|t| Arc::clone(t.value()))
            .ok_or_else(|| StoreError::NoSuchTable(table.to_string()))
    }

    /// Committed row by primary key
    pub fn read_row(&self, table: &str, key: &[Value]) -> StoreResult<Option<Vec<Value>>> {
        Ok(self.data(table)?.read().get(key).cloned())
    }

    /// Snapshot of all committed rows, in primary key order
    pub fn scan_rows(&self, table: &str) -> StoreResult<Vec<(RowKey, Vec<Value>)>> {
        Ok(self
            .data(table)?
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    /// Number of committed rows
    pub fn row_count(&self, table: &str) -> StoreResult<usize> {
        Ok(self.data(table)?.read().len())
    }

    /// Apply a set of writes atomically
    ///
    /// Every write is validated first; if any insert collides with a
    /// committed row nothing is applied.
    pub fn apply(&self, writes: Vec<RowWrite>) -> StoreResult<usize> {
        let _guard = self.commit_lock.lock();

        for write in &writes {
            let data = self.data(write.table())?;
            if let RowWrite::Insert { table, key, .. } = write {
                if data.read().contains_key(key) {
                    return Err(StoreError::DuplicateKey {
                        table: table.clone(),
                    });
                }
            }
        }

        let count = writes.len();
        for write in writes {
            let data = self.data(write.table())?;
            let mut rows = data.write();
            match write {
                RowWrite::Insert { key, row, .. } | RowWrite::Put { key, row, .. } => {
                    rows.insert(key, row);
                }
                RowWrite::Delete { key, .. } => {
                    rows.remove(&key);
                }
            }
        }
        debug!(target: "clusterbind::storage", cluster = %self.name, writes = count, "Writes applied");
        Ok(count)
    }
}
