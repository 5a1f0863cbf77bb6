//! Shared fixtures for the integration suites.
//!
//! Import via `mod common;` from a suite's main.rs.

#![allow(dead_code)]

use clusterbind::{
    Cluster, ColumnDescriptor, ColumnType, FieldMapping, FieldType, SessionFactory, SessionFactoryConfig,
    TableBuilder, TypeMapping,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Once};

static TRACING: Once = Once::new();
static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Install a test subscriber once; `RUST_LOG` style filtering is not needed here
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

/// Unique cluster name per fixture so factories never collide
pub fn cluster_name(prefix: &str) -> String {
    format!("{}-{}", prefix, COUNTER.fetch_add(1, Ordering::Relaxed))
}

// ============================================================================
// Schema
// ============================================================================

/// `employee(id INT pk, name VARCHAR(64), salary DECIMAL(10,2) nullable)`
/// and `document(id BIGINT pk, title VARCHAR(64), body TEXT, scan BLOB)`
pub fn cluster() -> Arc<Cluster> {
    let cluster = Arc::new(Cluster::new(cluster_name("it"), 4));
    cluster
        .create_table(
            TableBuilder::new("employee")
                .column(ColumnDescriptor::new("id", ColumnType::Int))
                .column(ColumnDescriptor::new("name", ColumnType::Varchar).with_length(64))
                .column(ColumnDescriptor::new("salary", ColumnType::Decimal).with_precision(10, 2))
                .primary_key(&["id"])
                .build()
                .unwrap(),
        )
        .unwrap();
    cluster
        .create_table(
            TableBuilder::new("document")
                .column(ColumnDescriptor::new("id", ColumnType::Bigint))
                .column(ColumnDescriptor::new("title", ColumnType::Varchar).with_length(64))
                .column(ColumnDescriptor::new("body", ColumnType::Text))
                .column(ColumnDescriptor::new("scan", ColumnType::Blob))
                .primary_key(&["id"])
                .build()
                .unwrap(),
        )
        .unwrap();
    cluster
}

/// Factory over a fresh cluster with `Employee` and `Document` registered
pub fn factory(autocommit: bool) -> Arc<SessionFactory> {
    init_tracing();
    let cluster = cluster();
    let config = SessionFactoryConfig {
        autocommit,
        ..SessionFactoryConfig::for_cluster(cluster.name())
    };
    let factory = SessionFactory::with_cluster(config, cluster).unwrap();
    factory
        .register(
            TypeMapping::new("Employee", "employee")
                .field(FieldMapping::new("id", FieldType::INT))
                .field(FieldMapping::new("name", FieldType::STRING))
                .field(FieldMapping::new("salary", FieldType::DECIMAL)),
        )
        .unwrap();
    factory
        .register(
            TypeMapping::new("Document", "document")
                .field(FieldMapping::new("id", FieldType::LONG))
                .field(FieldMapping::new("title", FieldType::STRING))
                .field(FieldMapping::new("body", FieldType::STRING).lob())
                .field(FieldMapping::new("scan", FieldType::BYTES).lob()),
        )
        .unwrap();
    factory
}
