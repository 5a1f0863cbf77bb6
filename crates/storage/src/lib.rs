//! Storage engine surface for Clusterbind
//!
//! This crate defines the narrow interface the binding layer consumes from
//! the clustered storage engine, plus the in-memory reference store that
//! backs it:
//! - Dictionary: table and index metadata lookup
//! - Operation traits: typed equal/set/get accessors, index-scan bounds,
//!   scan filters, result rows
//! - BlobHandle: deferred large-object reads and writes
//! - PartitionKey: distribution key accumulator
//! - Cluster: committed row data, one ordered map per table
//!
//! Transactions and the concrete operation types live in
//! `clusterbind-concurrency`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod blob;
pub mod cluster;
pub mod dictionary;
pub mod error;
pub mod filter;
pub mod operation;
pub mod partition;

pub use blob::BlobHandle;
pub use cluster::{Cluster, RowKey, RowWrite};
pub use dictionary::{Dictionary, IndexKind, IndexMeta, TableBuilder, TableMeta, PRIMARY_INDEX};
pub use error::{StoreError, StoreResult};
pub use filter::{column_cmp, FilterNode, ScanFilterBuilder};
pub use operation::{
    AbortOption, BinaryCondition, BoundType, ExecType, FilterGroup, IndexScanOperation, LockMode,
    Operation, OperationKind, PostExecuteCallback, ResultRow, ScanFilter, ScanOperation,
};
pub use partition::PartitionKey;
