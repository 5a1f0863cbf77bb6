//! Transactions for Clusterbind
//!
//! This crate implements the transactional side of the engine surface:
//! - RowOperation / TableScan / IndexScan: concrete operations implementing
//!   the `clusterbind-storage` operation traits
//! - FetchedRow: a row returned by a read or scan
//! - PostExecuteQueue: FIFO of deferred actions attached to a transaction
//! - Transaction: buffers operations, runs them on `execute`, and publishes
//!   its writes to the cluster on commit
//!
//! Transactions are synchronous and owned by one thread. Writes are held in
//! a private overlay until commit, so a transaction sees its own changes and
//! other transactions see only committed rows.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod callback;
pub mod operation;
pub mod row;
pub mod transaction;

pub use callback::PostExecuteQueue;
pub use operation::{IndexScan, OpId, RowOperation, TableScan};
pub use row::FetchedRow;
pub use transaction::{Transaction, TransactionStatus};
