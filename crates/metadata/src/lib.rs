//! Metadata and dispatch for Clusterbind
//!
//! This crate is the field/type dispatch engine:
//! - handler: the operation handler registry, one stateless strategy per
//!   (field type x nullability x key role x lob-ness), chosen once per field
//! - field: FieldHandler, binding one domain field to its column(s)
//! - index: IndexHandler, one index with its columns resolved to fields
//! - candidate / predicate: access path selection for queries
//! - domain: DomainTypeHandler, all fields and indexes of one mapped type
//! - value: ValueHandler containers (live, key-only, batched parameters)
//!
//! The field number is the single addressing key shared by field handlers,
//! value containers and result row readers. It is fixed when the domain
//! type handler is built.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bitset;
pub mod candidate;
pub mod domain;
pub mod field;
pub mod handler;
pub mod index;
pub mod predicate;
pub mod value;

#[cfg(test)]
mod test_support;

pub use bitset::FieldSet;
pub use candidate::{choose_access_path, AccessPath, CandidateIndex, ScanType};
pub use domain::{DomainTypeHandler, HandlerState, TypeMapping};
pub use field::{FieldHandler, FieldMapping, NullValue};
pub use handler::{decode_year, encode_year, select, HandlerSelection, OperationHandler};
pub use index::IndexHandler;
pub use predicate::{Comparison, Operand, Parameters, Predicate};
pub use value::{
    BatchValueHandler, KeyValueHandler, LiveValueHandler, ModificationObserver, ValueHandler,
};
