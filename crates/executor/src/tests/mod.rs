//! Test modules for the executor crate.


use clusterbind_core::{ColumnDescriptor, ColumnType};
use clusterbind_engine::{SessionFactory, SessionFactoryConfig};
use clusterbind_storage::{Cluster, TableBuilder};
use std::sync::Arc;

/// Factory over a fresh cluster with an `employee` table
///
/// Columns: id INT (pk), name VARCHAR, salary DECIMAL(10,2), age INT with
/// an ordered index, notes TEXT.
pub(crate) fn factory(autocommit: bool) -> Arc<SessionFactory> {
    let cluster = Arc::new(Cluster::new("sql-bridge", 2));
    cluster
        .create_table(
            TableBuilder::new("employee")
                .column(ColumnDescriptor::new("id", ColumnType::Int))
                .column(ColumnDescriptor::new("name", ColumnType::Varchar).with_length(32))
                .column(ColumnDescriptor::new("salary", ColumnType::Decimal).with_precision(10, 2))
                .column(ColumnDescriptor::new("age", ColumnType::Int))
                .column(ColumnDescriptor::new("notes", ColumnType::Text))
                .primary_key(&["id"])
                .ordered_index("idx_age", &["age"])
                .build()
                .unwrap(),
        )
        .unwrap();
    let config = SessionFactoryConfig {
        autocommit,
        ..SessionFactoryConfig::for_cluster("sql-bridge")
    };
    SessionFactory::with_cluster(config, cluster).unwrap()
}
