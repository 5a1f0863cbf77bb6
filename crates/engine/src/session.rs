//! Sessions
//!
//! A `Session` runs persistence operations against its factory's cluster.
//! Outside an explicit transaction every operation runs in its own
//! transaction, committed on success and rolled back on failure. Inside one
//! (between `begin` and `commit`/`rollback`) writes are buffered in the
//! engine transaction and executed by the next read, `flush` or `commit`.
//!
//! Single-key operations route their automatic transaction by partition key.

use clusterbind_concurrency::Transaction;
use clusterbind_core::{Error, Result, Value};
use clusterbind_metadata::{DomainTypeHandler, Parameters, Predicate, ValueHandler};
use clusterbind_storage::{AbortOption, ExecType, PartitionKey, StoreError};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::factory::SessionFactory;
use crate::object::DynamicObject;
use crate::query;

/// A unit of work against one cluster
pub struct Session {
    factory: Arc<SessionFactory>,
    txn: Option<Transaction>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("cluster", &self.factory.cluster().name())
            .field("transaction", &self.txn.as_ref().map(|t| t.id()))
            .finish()
    }
}

impl Session {
    pub(crate) fn new(factory: Arc<SessionFactory>) -> Self {
        Self { factory, txn: None }
    }

    /// Factory the session was opened from
    pub fn factory(&self) -> &Arc<SessionFactory> {
        &self.factory
    }

    /// New instance of a registered type
    pub fn new_instance(&self, type_name: &str) -> Result<DynamicObject> {
        DynamicObject::new(self.factory.handler(type_name)?)
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Start an explicit transaction
    pub fn begin(&mut self) -> Result<()> {
        if self.is_active() {
            return Err(Error::user("Transaction is already active"));
        }
        let txn = Transaction::begin(Arc::clone(self.factory.cluster()));
        debug!(target: "clusterbind::session", txn_id = txn.id(), "Explicit transaction started");
        self.txn = Some(txn);
        Ok(())
    }

    /// Commit the explicit transaction
    pub fn commit(&mut self) -> Result<()> {
        let mut txn = self
            .txn
            .take()
            .ok_or_else(|| Error::user("No transaction is active"))?;
        txn.commit()?;
        info!(target: "clusterbind::session", txn_id = txn.id(), "Explicit transaction committed");
        Ok(())
    }

    /// Roll back the explicit transaction
    pub fn rollback(&mut self) -> Result<()> {
        let mut txn = self
            .txn
            .take()
            .ok_or_else(|| Error::user("No transaction is active"))?;
        txn.rollback()?;
        Ok(())
    }

    /// Whether an explicit transaction is open
    pub fn is_active(&self) -> bool {
        self.txn.as_ref().map_or(false, Transaction::is_active)
    }

    /// Execute the buffered writes of the explicit transaction
    ///
    /// A no-op outside an explicit transaction.
    pub fn flush(&mut self) -> Result<()> {
        if self.txn.is_none() {
            return Ok(());
        }
        self.with_transaction(|txn| {
            txn.execute(ExecType::NoCommit, AbortOption::AbortOnError, false)?;
            Ok(())
        })
    }

    /// Run `f` in the explicit transaction, or in a transaction of its own
    /// that is committed when `f` succeeds
    pub fn with_transaction<T>(&mut self, f: impl FnOnce(&mut Transaction) -> Result<T>) -> Result<T> {
        self.with_transaction_routed(None, f)
    }

    fn with_transaction_routed<T>(
        &mut self,
        key: Option<&PartitionKey>,
        f: impl FnOnce(&mut Transaction) -> Result<T>,
    ) -> Result<T> {
        if let Some(txn) = self.txn.as_mut() {
            let result = f(txn);
            if !txn.is_active() {
                warn!(target: "clusterbind::session", txn_id = txn.id(), "Explicit transaction ended by a failed operation");
                self.txn = None;
            }
            return result;
        }

        let cluster = Arc::clone(self.factory.cluster());
        let mut txn = match key {
            Some(key) => Transaction::begin_with_partition_key(cluster, key)?,
            None => Transaction::begin(cluster),
        };
        let result = f(&mut txn).and_then(|value| {
            txn.commit()?;
            Ok(value)
        });
        if let Err(e) = &result {
            if txn.is_active() {
                warn!(target: "clusterbind::session", txn_id = txn.id(), error = %e, "Rolling back after error");
                txn.rollback()?;
            }
        }
        result
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Insert a new row for the instance
    pub fn persist(&mut self, object: &mut DynamicObject) -> Result<()> {
        let handler = Arc::clone(object.handler());
        let key = handler.create_partition_key(object.values())?;
        debug!(target: "clusterbind::session", type_name = handler.type_name(), "Persist");
        self.with_transaction_routed(Some(&key), |txn| {
            let op = txn.insert(&handler.table().name)?;
            handler.operation_set_values(object.values(), op)
        })?;
        object.values_mut().reset_modified();
        Ok(())
    }

    /// Insert the instance, or overwrite the row with its key
    pub fn save_or_update(&mut self, object: &mut DynamicObject) -> Result<()> {
        let handler = Arc::clone(object.handler());
        let key = handler.create_partition_key(object.values())?;
        debug!(target: "clusterbind::session", type_name = handler.type_name(), "Save or update");
        self.with_transaction_routed(Some(&key), |txn| {
            let op = txn.write(&handler.table().name)?;
            handler.operation_set_values(object.values(), op)
        })?;
        object.values_mut().reset_modified();
        Ok(())
    }

    /// Write the modified fields of the instance to its row
    ///
    /// Fails with a datastore error if the row does not exist.
    pub fn update(&mut self, object: &mut DynamicObject) -> Result<()> {
        let handler = Arc::clone(object.handler());
        let key = handler.create_partition_key(object.values())?;
        debug!(target: "clusterbind::session", type_name = handler.type_name(), "Update");
        self.with_transaction_routed(Some(&key), |txn| {
            let op = txn.update(&handler.table().name)?;
            handler.operation_set_keys(object.values(), op)?;
            handler.operation_set_non_pk_modified_values(object.values(), op)
        })?;
        object.values_mut().reset_modified();
        Ok(())
    }

    /// Delete the row of the instance; false if there was none
    pub fn remove(&mut self, object: &DynamicObject) -> Result<bool> {
        let key = object.key()?;
        let handler = Arc::clone(object.handler());
        self.delete_key(&handler, &key)
    }

    /// Delete a row by primary key; false if there was none
    ///
    /// `key` holds one value per primary key column, in key order; any other
    /// count is a user error.
    pub fn delete_by_key(&mut self, type_name: &str, key: &[Value]) -> Result<bool> {
        let handler = self.factory.handler(type_name)?;
        self.delete_key(&handler, key)
    }

    fn delete_key(&mut self, handler: &DomainTypeHandler, key: &[Value]) -> Result<bool> {
        let keys = handler.create_key_value_handler(key)?;
        let partition = handler.create_partition_key(&keys)?;
        self.with_transaction_routed(Some(&partition), |txn| {
            // Earlier failures must not be mistaken for a missing row.
            if txn.pending_operations() > 0 {
                txn.execute(ExecType::NoCommit, AbortOption::AbortOnError, false)?;
            }
            let op = txn.delete(&handler.table().name)?;
            handler.operation_set_keys(&keys, op)?;
            let id = op.id();
            txn.execute(ExecType::NoCommit, AbortOption::IgnoreError, false)?;
            match txn.error(id) {
                None => Ok(true),
                Some(StoreError::RowNotFound { .. }) => Ok(false),
                Some(other) => Err(other.clone().into()),
            }
        })
    }

    /// Delete every row of a type's table, returning how many went
    pub fn delete_all(&mut self, type_name: &str) -> Result<usize> {
        self.delete_query(type_name, None, &Parameters::new())
    }

    /// Delete the rows matching a predicate, returning how many went
    pub fn delete_query(
        &mut self,
        type_name: &str,
        predicate: Option<&Predicate>,
        params: &Parameters,
    ) -> Result<usize> {
        let handler = self.factory.handler(type_name)?;
        self.delete_matching(&handler, predicate, params)
    }

    /// Delete the rows of a handler's table matching a predicate
    pub fn delete_matching(
        &mut self,
        handler: &DomainTypeHandler,
        predicate: Option<&Predicate>,
        params: &Parameters,
    ) -> Result<usize> {
        let lock_mode = self.factory.lock_mode();
        let deleted = self.with_transaction(|txn| {
            let rows = query::fetch_rows(txn, handler, predicate, params, lock_mode, None)?;
            delete_rows(txn, handler, rows.iter().map(|row| row.key()))
        })?;
        debug!(target: "clusterbind::session", type_name = handler.type_name(), deleted, "Rows deleted");
        Ok(deleted)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Load an instance by primary key
    pub fn find(&mut self, type_name: &str, key: &[Value]) -> Result<Option<DynamicObject>> {
        let handler = self.factory.handler(type_name)?;
        let keys = handler.create_key_value_handler(key)?;
        let partition = handler.create_partition_key(&keys)?;
        let lock_mode = self.factory.lock_mode();
        let row = self.with_transaction_routed(Some(&partition), |txn| {
            let op = txn.read(&handler.table().name)?;
            op.set_lock_mode(lock_mode);
            handler.operation_set_keys(&keys, op)?;
            handler.operation_get_values(op, None)?;
            let id = op.id();
            txn.execute(ExecType::NoCommit, AbortOption::AbortOnError, false)?;
            Ok(txn.row(id).cloned())
        })?;
        row.map(|row| DynamicObject::from_row(handler, &row)).transpose()
    }

    /// Load the instances matching a predicate
    pub fn query(
        &mut self,
        type_name: &str,
        predicate: Option<&Predicate>,
        params: &Parameters,
    ) -> Result<Vec<DynamicObject>> {
        let handler = self.factory.handler(type_name)?;
        let lock_mode = self.factory.lock_mode();
        let rows = self.with_transaction(|txn| query::fetch_rows(txn, &handler, predicate, params, lock_mode, None))?;
        rows.iter()
            .map(|row| DynamicObject::from_row(Arc::clone(&handler), row))
            .collect()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(mut txn) = self.txn.take() {
            if txn.is_active() {
                warn!(target: "clusterbind::session", txn_id = txn.id(), "Session closed with an open transaction, rolling back");
                if let Err(e) = txn.rollback() {
                    warn!(target: "clusterbind::session", txn_id = txn.id(), error = %e, "Rollback on drop failed");
                }
            }
        }
    }
}

/// Delete rows by primary key values in one execute
fn delete_rows(
    txn: &mut Transaction,
    handler: &DomainTypeHandler,
    keys: impl Iterator<Item = Vec<Value>>,
) -> Result<usize> {
    let mut count = 0;
    for key in keys {
        let keys = handler.create_key_value_handler(&key)?;
        let op = txn.delete(&handler.table().name)?;
        handler.operation_set_keys(&keys, op)?;
        count += 1;
    }
    if count > 0 {
        txn.execute(ExecType::NoCommit, AbortOption::AbortOnError, false)?;
    }
    Ok(count)
}
