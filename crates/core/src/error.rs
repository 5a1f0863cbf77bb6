//! Error types for Clusterbind
//!
//! The taxonomy has four kinds:
//! - **User**: bad mapping, bad key type, null in a field whose policy
//!   forbids it, unsupported column type for a field. Never retried.
//! - **Mapping**: every field error found while analysing one domain type,
//!   reported together.
//! - **Datastore**: any failure surfaced by the storage engine, wrapped
//!   with context. Never retried by this layer.
//! - **Fatal**: an invariant violation (a defect, not a data problem).
//!
//! We use `thiserror` for automatic `Display` and `Error` implementations.

use thiserror::Error;

/// Result type alias for Clusterbind operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the binding layer
#[derive(Debug, Error)]
pub enum Error {
    /// Caller or mapping error
    #[error("{0}")]
    User(String),

    /// All field errors found while analysing a type
    #[error("Error mapping type {type_name}: {}", .errors.join("; "))]
    Mapping {
        /// Mapped type name
        type_name: String,
        /// One message per problem, in field order
        errors: Vec<String>,
    },

    /// Failure reported by the storage engine
    #[error("Datastore error: {message}")]
    Datastore {
        /// Context added by the binding layer
        message: String,
        /// Engine error code, when one was reported
        code: Option<i32>,
        /// Underlying engine error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Invariant violation inside the binding layer
    #[error("Fatal internal error: {0}")]
    Fatal(String),
}

impl Error {
    /// Create a user error
    pub fn user(message: impl Into<String>) -> Self {
        Error::User(message.into())
    }

    /// Create a fatal internal error
    pub fn fatal(message: impl Into<String>) -> Self {
        Error::Fatal(message.into())
    }

    /// Create a datastore error with no underlying source
    pub fn datastore(message: impl Into<String>) -> Self {
        Error::Datastore {
            message: message.into(),
            code: None,
            source: None,
        }
    }

    /// Wrap an engine error, adding context
    pub fn datastore_with<E>(message: impl Into<String>, code: Option<i32>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Datastore {
            message: message.into(),
            code,
            source: Some(Box::new(source)),
        }
    }

    /// Add context to a datastore error; other kinds are returned unchanged
    pub fn context(self, context: impl AsRef<str>) -> Self {
        match self {
            Error::Datastore {
                message,
                code,
                source,
            } => Error::Datastore {
                message: format!("{}: {}", context.as_ref(), message),
                code,
                source,
            },
            other => other,
        }
    }

    /// An operation a container or handler does not support
    pub fn unsupported_operation(operation: &str, on: &str) -> Self {
        Error::Fatal(format!("Operation {} is not supported for {}", operation, on))
    }

    /// Whether this error signals a defect rather than a data problem
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Fatal(_))
    }

    /// Whether this error came from the storage engine
    pub fn is_datastore(&self) -> bool {
        matches!(self, Error::Datastore { .. })
    }

    /// Engine error code, if any
    pub fn code(&self) -> Option<i32> {
        match self {
            Error::Datastore { code, .. } => *code,
            _ => None,
        }
    }
}
