//! Sessions for Clusterbind
//!
//! This crate is the object path of the binding layer:
//! - SessionFactory: one per cluster, owns the domain type handler cache
//! - Session: persistence operations inside automatic or explicit
//!   transactions
//! - DynamicObject: a mapped instance addressed by field name or number
//! - query: access path planning and row fetching shared with the SQL
//!   bridge
//!
//! Configuration is read from `clusterbind.toml` (see
//! [`SessionFactoryConfig`]).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod factory;
pub mod object;
pub mod query;
pub mod session;

pub use factory::{SessionFactory, SessionFactoryConfig, CONFIG_FILE_NAME, OPEN_FACTORIES};
pub use object::DynamicObject;
pub use query::{fetch_rows, plan};
pub use session::Session;
