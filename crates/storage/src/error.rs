//! Error types for the storage engine surface
//!
//! Every failure the engine reports carries a numeric code in the style of
//! clustered row stores, so callers can branch on e.g. "duplicate key"
//! without string matching.

use clusterbind_core::{Error, StorageClass};
use thiserror::Error;

/// Result type alias for engine operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors reported by the storage engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// Table is not in the dictionary
    #[error("No such table: {0}")]
    NoSuchTable(String),

    /// Column is not part of the table
    #[error("No such column {column} in table {table}")]
    NoSuchColumn {
        /// Table name
        table: String,
        /// Column name
        column: String,
    },

    /// Index is not defined on the table
    #[error("No such index {index} on table {table}")]
    NoSuchIndex {
        /// Table name
        table: String,
        /// Index name
        index: String,
    },

    /// Table definition is inconsistent
    #[error("Invalid table definition for {table}: {reason}")]
    InvalidTable {
        /// Table name
        table: String,
        /// What is wrong
        reason: String,
    },

    /// Insert of a row whose primary key already exists
    #[error("Duplicate primary key in table {table}")]
    DuplicateKey {
        /// Table name
        table: String,
    },

    /// Update or delete of a row that does not exist
    #[error("Tuple did not exist in table {table}")]
    RowNotFound {
        /// Table name
        table: String,
    },

    /// Typed accessor does not match the column's storage class
    #[error("Type mismatch for column {column}: column stores {expected:?}, got {actual}")]
    TypeMismatch {
        /// Column name
        column: String,
        /// Storage class of the column
        expected: StorageClass,
        /// Type name of the supplied value
        actual: &'static str,
    },

    /// NULL written to a NOT NULL column
    #[error("Column {column} cannot be null")]
    NullNotAllowed {
        /// Column name
        column: String,
    },

    /// Not every primary key (or unique index) column was given an equal value
    #[error("Incomplete key for {target}: missing {missing}")]
    IncompleteKey {
        /// Table or index name
        target: String,
        /// First missing column
        missing: String,
    },

    /// Operation is not valid for this operation kind
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Blob handle used before the defining operation executed
    #[error("Blob handle for column {column} is not active")]
    BlobNotActive {
        /// Column name
        column: String,
    },

    /// Transaction is not in a state that allows the call
    #[error("Transaction is not active: {state}")]
    TransactionNotActive {
        /// Current state
        state: String,
    },

    /// Scan filter definition is malformed
    #[error("Invalid scan filter: {0}")]
    InvalidFilter(String),

    /// A post-execute callback failed
    #[error("Post-execute callback failed: {0}")]
    Callback(String),
}

impl StoreError {
    /// Numeric engine error code
    pub fn code(&self) -> i32 {
        match self {
            StoreError::NoSuchTable(_) => 723,
            StoreError::NoSuchColumn { .. } => 4004,
            StoreError::NoSuchIndex { .. } => 4243,
            StoreError::InvalidTable { .. } => 4251,
            StoreError::DuplicateKey { .. } => 630,
            StoreError::RowNotFound { .. } => 626,
            StoreError::TypeMismatch { .. } => 4217,
            StoreError::NullNotAllowed { .. } => 839,
            StoreError::IncompleteKey { .. } => 4276,
            StoreError::InvalidOperation(_) => 4200,
            StoreError::BlobNotActive { .. } => 4265,
            StoreError::TransactionNotActive { .. } => 4264,
            StoreError::InvalidFilter(_) => 4260,
            StoreError::Callback(_) => 4000,
        }
    }

    /// Whether this error means "the row is not there"
    pub fn is_row_not_found(&self) -> bool {
        matches!(self, StoreError::RowNotFound { .. })
    }

    /// Whether this error means "the row is already there"
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, StoreError::DuplicateKey { .. })
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        let code = e.code();
        Error::datastore_with(e.to_string(), Some(code), e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(StoreError::DuplicateKey { table: "t".into() }.code(), 630);
        assert_eq!(StoreError::RowNotFound { table: "t".into() }.code(), 626);
    }

    #[test]
    fn test_conversion_to_datastore_error() {
        let err: Error = StoreError::NoSuchTable("employee".into()).into();
        assert!(err.is_datastore());
        assert_eq!(err.code(), Some(723));
        assert!(err.to_string().contains("employee"));
    }

    #[test]
    fn test_type_mismatch_display() {
        let err = StoreError::TypeMismatch {
            column: "name".into(),
            expected: StorageClass::String,
            actual: "Int",
        };
        let msg = err.to_string();
        assert!(msg.contains("name"));
        assert!(msg.contains("String"));
        assert!(msg.contains("Int"));
    }
}
