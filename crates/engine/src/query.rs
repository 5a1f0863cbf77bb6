//! Query planning and row fetching
//!
//! Shared by `Session::query` and the SQL bridge's select and delete
//! executors. A predicate is turned into an access path once per call:
//!
//! | Access path  | Engine operation                          |
//! |--------------|-------------------------------------------|
//! | PrimaryKey   | `read` with the key set by equality       |
//! | UniqueKey    | `unique_read` on the unique hash index    |
//! | IndexScan    | `index_scan` with bounds plus a filter    |
//! | TableScan    | `table_scan`, filtered when there is a predicate |
//!
//! Scans always carry the full predicate as a scan filter; bounds only
//! narrow the range the engine walks.

use clusterbind_concurrency::{FetchedRow, Transaction};
use clusterbind_core::{Error, Result};
use clusterbind_metadata::{choose_access_path, AccessPath, DomainTypeHandler, FieldSet, Parameters, Predicate, ScanType};
use clusterbind_storage::{AbortOption, ExecType, LockMode, ScanOperation};
use tracing::debug;

/// Pick the access path for a predicate
///
/// No predicate means a full table scan.
pub fn plan(handler: &DomainTypeHandler, predicate: Option<&Predicate>) -> AccessPath {
    let Some(predicate) = predicate else {
        return AccessPath {
            scan_type: ScanType::TableScan,
            index: None,
        };
    };
    let mut candidates = handler.create_candidate_indexes();
    predicate.mark_bounds(handler.fields(), &mut candidates);
    let equality = predicate.equality_fields();
    choose_access_path(&candidates, equality.as_ref())
}

/// Run a predicate against a type's table and return the matching rows
///
/// Pending operations of `txn` are executed along with the read, so the
/// rows reflect the transaction's own writes. `only` restricts the columns
/// fetched; `None` fetches every persistent field.
pub fn fetch_rows(
    txn: &mut Transaction,
    handler: &DomainTypeHandler,
    predicate: Option<&Predicate>,
    params: &Parameters,
    lock_mode: LockMode,
    only: Option<&FieldSet>,
) -> Result<Vec<FetchedRow>> {
    let path = plan(handler, predicate);
    let table = handler.table().name.as_str();
    debug!(
        target: "clusterbind::session",
        type_name = handler.type_name(),
        scan_type = ?path.scan_type,
        index = ?path.index,
        "Query planned"
    );

    match (path.scan_type, predicate) {
        (ScanType::PrimaryKey | ScanType::UniqueKey, Some(predicate)) => {
            if predicate.binds_null_equality(params)? {
                return Ok(Vec::new());
            }
            let op = if path.scan_type == ScanType::PrimaryKey {
                txn.read(table)?
            } else {
                let index = index_name(handler, path)?;
                txn.unique_read(table, &index)?
            };
            op.set_lock_mode(lock_mode);
            predicate.operation_equal(handler.fields(), params, op)?;
            handler.operation_get_values(op, only)?;
            let id = op.id();
            txn.execute(ExecType::NoCommit, AbortOption::AbortOnError, false)?;
            Ok(txn.row(id).cloned().into_iter().collect())
        }
        (ScanType::IndexScan, Some(predicate)) => {
            let index = index_name(handler, path)?;
            let scan = txn.index_scan(table, &index)?;
            scan.set_lock_mode(lock_mode);
            predicate.operation_set_bounds(handler.fields(), params, scan)?;
            predicate.filter_cmp(handler.fields(), params, scan.filter())?;
            handler.operation_get_values(scan, only)?;
            let id = scan.id();
            txn.execute(ExecType::NoCommit, AbortOption::AbortOnError, false)?;
            Ok(txn.take_rows(id))
        }
        _ => {
            let scan = txn.table_scan(table)?;
            scan.set_lock_mode(lock_mode);
            if let Some(predicate) = predicate {
                predicate.filter_cmp(handler.fields(), params, scan.filter())?;
            }
            handler.operation_get_values(scan, only)?;
            let id = scan.id();
            txn.execute(ExecType::NoCommit, AbortOption::AbortOnError, false)?;
            Ok(txn.take_rows(id))
        }
    }
}

fn index_name(handler: &DomainTypeHandler, path: AccessPath) -> Result<String> {
    path.index
        .and_then(|ordinal| handler.indexes().get(ordinal))
        .map(|index| index.internal_name().to_string())
        .ok_or_else(|| Error::fatal(format!("Access path {:?} names no index of {}", path, handler.type_name())))
}
