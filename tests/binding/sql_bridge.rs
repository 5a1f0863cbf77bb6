//! SQL statements routed through the binding layer
//!
//! Statement facts arrive as JSON, the way an out-of-process parser would
//! hand them over. Objects written through a session and rows written
//! through the bridge are the same rows.

use crate::common::factory;
use clusterbind::{ExecutorResult, Interceptor, StatementFacts, Value};
use rust_decimal::Decimal;

const INSERT: &str = "INSERT INTO employee (id, name, salary) VALUES (?, ?, ?)";
const SELECT_BY_ID: &str = "SELECT name, salary FROM employee WHERE id = ?";
const DELETE_POOR: &str = "DELETE FROM employee WHERE salary < ? OR salary IS NULL";

fn facts(json: &str) -> StatementFacts {
    StatementFacts::from_json(json).unwrap()
}

fn insert_facts() -> StatementFacts {
    facts(
        r#"{
            "kind": "insert",
            "table": "employee",
            "columns": ["id", "name", "salary"],
            "values": [{ "parameter": 0 }, { "parameter": 1 }, { "parameter": 2 }]
        }"#,
    )
}

fn select_facts() -> StatementFacts {
    facts(
        r#"{
            "kind": "select",
            "table": "employee",
            "columns": ["name", "salary"],
            "where_clause": { "compare": { "column": "id", "op": "eq", "operand": { "parameter": 0 } } }
        }"#,
    )
}

fn delete_facts() -> StatementFacts {
    facts(
        r#"{
            "kind": "delete",
            "table": "employee",
            "where_clause": { "or": [
                { "compare": { "column": "salary", "op": "lt", "operand": { "parameter": 0 } } },
                { "is_null": "salary" }
            ] }
        }"#,
    )
}

#[test]
fn sql_and_session_share_rows() {
    let factory = factory(true);
    let mut interceptor = Interceptor::new(&factory);

    let inserted = interceptor
        .execute(
            INSERT,
            &insert_facts(),
            &[Value::Int(1), Value::from("Ann"), Value::Decimal(Decimal::new(5000, 2))],
        )
        .unwrap()
        .and_then(|r| r.update_count());
    assert_eq!(inserted, Some(1));

    // written by SQL, read as an object
    let mut session = factory.open_session();
    let ann = session.find("Employee", &[Value::Int(1)]).unwrap().unwrap();
    assert_eq!(ann.get_decimal("salary").unwrap(), Some(Decimal::new(50, 0)));

    // written as an object, read by SQL
    let mut bob = session.new_instance("Employee").unwrap();
    bob.set("id", 2).unwrap();
    bob.set("name", "Bob").unwrap();
    session.persist(&mut bob).unwrap();

    let mut rows = interceptor
        .execute(SELECT_BY_ID, &select_facts(), &[Value::Int(2)])
        .unwrap()
        .and_then(ExecutorResult::into_rows)
        .unwrap();
    assert!(rows.next());
    assert_eq!(rows.get_by_name("name").unwrap(), &Value::from("Bob"));
    assert_eq!(rows.get_by_name("salary").unwrap(), &Value::Null);
}

#[test]
fn sql_delete_with_or_predicate() {
    let factory = factory(true);
    let mut interceptor = Interceptor::new(&factory);
    let rows = vec![
        vec![Value::Int(1), Value::from("Ann"), Value::Decimal(Decimal::new(40, 0))],
        vec![Value::Int(2), Value::from("Bob"), Value::Decimal(Decimal::new(140, 0))],
        vec![Value::Int(3), Value::from("Cy"), Value::Null],
    ];
    let inserted = interceptor.execute_batch(INSERT, &insert_facts(), rows).unwrap();
    assert_eq!(inserted.and_then(|r| r.update_count()), Some(3));

    let deleted = interceptor
        .execute(DELETE_POOR, &delete_facts(), &[Value::Decimal(Decimal::new(100, 0))])
        .unwrap()
        .and_then(|r| r.update_count());
    assert_eq!(deleted, Some(2));
    assert_eq!(factory.cluster().row_count("employee").unwrap(), 1);
}

#[test]
fn sql_unknown_statements_fall_back() {
    let factory = factory(false);
    let mut interceptor = Interceptor::new(&factory);
    let update = facts(r#"{ "kind": "other", "table": "employee" }"#);
    assert!(interceptor
        .execute("UPDATE employee SET name = ?", &update, &[Value::from("x")])
        .unwrap()
        .is_none());
    let lob_filter = facts(
        r#"{
            "kind": "select",
            "table": "document",
            "columns": ["id"],
            "where_clause": { "compare": { "column": "body", "op": "like", "operand": { "literal": { "String": "%x%" } } } }
        }"#,
    );
    // large objects cannot be filtered on
    assert!(interceptor
        .execute("SELECT id FROM document WHERE body LIKE '%x%'", &lob_filter, &[])
        .unwrap()
        .is_none());
    assert!(!interceptor.session().is_active());
}
