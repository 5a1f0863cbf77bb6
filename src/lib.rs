//! Clusterbind - object-relational binding for clustered row stores
//!
//! Clusterbind maps domain types onto tables of a partitioned cluster and
//! routes simple SQL statements straight to the cluster instead of through
//! a SQL front end.
//!
//! # Quick Start
//!
//! ```ignore
//! use clusterbind::{FieldMapping, FieldType, SessionFactory, SessionFactoryConfig, TypeMapping, Value};
//!
//! let factory = SessionFactory::open(SessionFactoryConfig::for_cluster("local"))?;
//! factory.register(
//!     TypeMapping::new("Employee", "employee")
//!         .field(FieldMapping::new("id", FieldType::INT))
//!         .field(FieldMapping::new("name", FieldType::STRING)),
//! )?;
//!
//! let mut session = factory.open_session();
//! let mut ada = session.new_instance("Employee")?;
//! ada.set("id", 1)?;
//! ada.set("name", "Ada")?;
//! session.persist(&mut ada)?;
//!
//! let found = session.find("Employee", &[Value::Int(1)])?;
//! ```
//!
//! # Architecture
//!
//! | Layer | Crate |
//! |-------|-------|
//! | Values, column and field types, errors | `clusterbind-core` |
//! | Tables, rows, operations, blobs | `clusterbind-storage` |
//! | Transactions over pending operations | `clusterbind-concurrency` |
//! | Field, index and domain type handlers | `clusterbind-metadata` |
//! | Session factory and sessions | `clusterbind-engine` |
//! | SQL statement routing | `clusterbind-executor` |

pub use clusterbind_core::{ColumnDescriptor, ColumnType, Error, FieldKind, FieldType, Result, Value};
pub use clusterbind_engine::{DynamicObject, Session, SessionFactory, SessionFactoryConfig};
pub use clusterbind_executor::{
    build_executor, CompareOp, Executor, ExecutorResult, Interceptor, ResultRows, SqlOperand, SqlPredicate,
    StatementFacts, StatementKind,
};
pub use clusterbind_metadata::{
    Comparison, DomainTypeHandler, FieldMapping, NullValue, Operand, Parameters, Predicate, TypeMapping,
};
pub use clusterbind_storage::{Cluster, TableBuilder};

/// Layer crates, for callers that need more than the re-exported surface
pub mod layers {
    pub use clusterbind_concurrency as concurrency;
    pub use clusterbind_core as core;
    pub use clusterbind_engine as engine;
    pub use clusterbind_executor as executor;
    pub use clusterbind_metadata as metadata;
    pub use clusterbind_storage as storage;
}
