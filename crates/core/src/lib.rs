//! Core types for Clusterbind
//!
//! This crate defines the foundational types shared by every layer:
//! - Value: the boxed value stored in containers and engine rows
//! - ColumnType / ColumnDescriptor: normalized dictionary column metadata
//! - FieldKind / FieldType: declared type of a mapped domain field
//! - Error: the error taxonomy (user, mapping, datastore, fatal)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod column;
pub mod error;
pub mod field_type;
pub mod value;

pub use column::{ColumnDescriptor, ColumnType, StorageClass};
pub use error::{Error, Result};
pub use field_type::{FieldKind, FieldType};
pub use value::Value;
