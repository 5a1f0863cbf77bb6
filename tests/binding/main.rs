//! Binding layer integration tests
//!
//! Exercises sessions, large objects and the SQL bridge together over an
//! in-process cluster.

#[path = "../common/mod.rs"]
mod common;

mod employee;
mod lob;
mod sql_bridge;
