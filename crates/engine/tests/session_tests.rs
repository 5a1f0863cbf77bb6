//! Session factory and session integration tests
//!
//! Factories opened from `clusterbind.toml`, sessions on several threads
//! sharing one handler cache, and handler invalidation after a schema
//! change.

use clusterbind_core::{ColumnDescriptor, ColumnType, Error, FieldType, Value};
use clusterbind_engine::{SessionFactory, SessionFactoryConfig, CONFIG_FILE_NAME};
use clusterbind_metadata::{FieldMapping, NullValue, TypeMapping};
use clusterbind_storage::{Cluster, LockMode, TableBuilder};
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

fn employee_table() -> clusterbind_storage::TableMeta {
    TableBuilder::new("employee")
        .column(ColumnDescriptor::new("id", ColumnType::Int))
        .column(ColumnDescriptor::new("name", ColumnType::Varchar).with_length(32))
        .column(ColumnDescriptor::new("age", ColumnType::Int))
        .primary_key(&["id"])
        .build()
        .unwrap()
}

fn employee_mapping() -> TypeMapping {
    TypeMapping::new("Employee", "employee")
        .field(FieldMapping::new("id", FieldType::INT))
        .field(FieldMapping::new("name", FieldType::STRING))
        .field(FieldMapping::new("age", FieldType::OBJECT_INT))
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_open_from_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(
        &path,
        "cluster_name = \"from-file\"\npartition_count = 2\nlock_mode = \"shared\"\nnull_value = \"exception\"\n",
    )
    .unwrap();

    let factory = SessionFactory::open_file(&path).unwrap();
    assert_eq!(factory.cluster().name(), "from-file");
    assert_eq!(factory.cluster().partition_count(), 2);
    assert_eq!(factory.lock_mode(), LockMode::Shared);

    factory.cluster().create_table(employee_table()).unwrap();
    let handler = factory.register(employee_mapping()).unwrap();
    assert_eq!(handler.field(1).unwrap().null_value(), NullValue::Exception);

    let mut session = factory.open_session();
    let mut nameless = session.new_instance("Employee").unwrap();
    nameless.set("id", 1).unwrap();
    let err = session.persist(&mut nameless).unwrap_err();
    assert!(err.to_string().contains("name"));
}

#[test]
fn test_invalid_config_file_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, "lock_mode = \"optimistic\"\n").unwrap();
    assert!(SessionFactory::open_file(&path).is_err());
}

// ============================================================================
// Multi-threaded sessions
// ============================================================================

#[test]
fn test_sessions_on_many_threads() {
    let factory = SessionFactory::open(SessionFactoryConfig::for_cluster("threads")).unwrap();
    factory.cluster().create_table(employee_table()).unwrap();
    factory.register(employee_mapping()).unwrap();

    let threads = 4;
    let per_thread = 25;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let factory = Arc::clone(&factory);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut session = factory.open_session();
                barrier.wait();
                for i in 0..per_thread {
                    let id = (t * per_thread + i) as i32;
                    let mut e = session.new_instance("Employee").unwrap();
                    e.set("id", id).unwrap();
                    e.set("name", format!("e{}", id)).unwrap();
                    session.persist(&mut e).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(factory.cluster().row_count("employee").unwrap(), threads * per_thread);
    let mut session = factory.open_session();
    let e = session.find("Employee", &[Value::Int(57)]).unwrap().unwrap();
    assert_eq!(e.get_string("name").unwrap().as_deref(), Some("e57"));
}

#[test]
fn test_table_handler_built_once_across_threads() {
    let factory = SessionFactory::open(SessionFactoryConfig::for_cluster("handler-race")).unwrap();
    factory.cluster().create_table(employee_table()).unwrap();

    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let factory = Arc::clone(&factory);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                factory.table_handler("employee").unwrap()
            })
        })
        .collect();
    let handlers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(handlers.iter().all(|h| Arc::ptr_eq(h, &handlers[0])));
    assert_eq!(factory.cached_handlers(), 1);
}

// ============================================================================
// Schema change
// ============================================================================

#[test]
fn test_invalidate_after_schema_change() {
    let cluster = Arc::new(Cluster::new("schema-change", 1));
    cluster.create_table(employee_table()).unwrap();
    let factory = SessionFactory::with_cluster(SessionFactoryConfig::for_cluster("schema-change"), Arc::clone(&cluster)).unwrap();
    let before = factory.table_handler("employee").unwrap();
    assert_eq!(before.number_of_fields(), 3);

    cluster.drop_table("employee").unwrap();
    cluster
        .create_table(
            TableBuilder::new("employee")
                .column(ColumnDescriptor::new("id", ColumnType::Int))
                .column(ColumnDescriptor::new("name", ColumnType::Varchar).with_length(32))
                .column(ColumnDescriptor::new("age", ColumnType::Int))
                .column(ColumnDescriptor::new("born", ColumnType::Year))
                .primary_key(&["id"])
                .build()
                .unwrap(),
        )
        .unwrap();

    // Stale until invalidated
    assert!(Arc::ptr_eq(&before, &factory.table_handler("employee").unwrap()));
    assert!(factory.invalidate("employee"));
    let after = factory.table_handler("employee").unwrap();
    assert_eq!(after.number_of_fields(), 4);
    assert_eq!(after.field(3).unwrap().field_type(), &FieldType::OBJECT_SHORT);
}

// ============================================================================
// Composite keys
// ============================================================================

#[test]
fn test_delete_by_composite_key() {
    let cluster = Arc::new(Cluster::new("composite-key", 2));
    cluster
        .create_table(
            TableBuilder::new("line")
                .column(ColumnDescriptor::new("order_id", ColumnType::Bigint))
                .column(ColumnDescriptor::new("line_no", ColumnType::Int))
                .column(ColumnDescriptor::new("qty", ColumnType::Int))
                .primary_key(&["order_id", "line_no"])
                .build()
                .unwrap(),
        )
        .unwrap();
    let factory = SessionFactory::with_cluster(SessionFactoryConfig::for_cluster("composite-key"), cluster).unwrap();
    factory
        .register(
            TypeMapping::new("Line", "line")
                .field(FieldMapping::new("order_id", FieldType::LONG))
                .field(FieldMapping::new("line_no", FieldType::INT))
                .field(FieldMapping::new("qty", FieldType::OBJECT_INT)),
        )
        .unwrap();

    let mut session = factory.open_session();
    for line_no in [7, 8] {
        let mut line = session.new_instance("Line").unwrap();
        line.set("order_id", 7i64).unwrap();
        line.set("line_no", line_no).unwrap();
        line.set("qty", 1).unwrap();
        session.persist(&mut line).unwrap();
    }

    // One value does not stand for the whole key
    let err = session.delete_by_key("Line", &[Value::Long(7)]).unwrap_err();
    assert!(matches!(err, Error::User(_)));
    assert!(session.find("Line", &[Value::Long(7), Value::Int(7)]).unwrap().is_some());

    assert!(session.delete_by_key("Line", &[Value::Long(7), Value::Int(7)]).unwrap());
    assert!(session.find("Line", &[Value::Long(7), Value::Int(7)]).unwrap().is_none());
    assert!(session.find("Line", &[Value::Long(7), Value::Int(8)]).unwrap().is_some());
}
