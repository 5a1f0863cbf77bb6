//! Employee round trip through a session
//!
//! Insert with a null salary, read it back as null, raise the salary,
//! delete, and find nothing.

use crate::common::factory;
use clusterbind::{Comparison, Error, Operand, Parameters, Predicate, Value};
use rust_decimal::Decimal;

#[test]
fn employee_lifecycle() {
    let factory = factory(true);
    let mut session = factory.open_session();

    let mut ann = session.new_instance("Employee").unwrap();
    ann.set("id", 1).unwrap();
    ann.set("name", "Ann").unwrap();
    ann.set("salary", Value::Null).unwrap();
    session.persist(&mut ann).unwrap();

    let mut found = session.find("Employee", &[Value::Int(1)]).unwrap().unwrap();
    assert_eq!(found.get_string("name").unwrap().as_deref(), Some("Ann"));
    // a null decimal stays null rather than reading back as zero
    assert_eq!(found.get("salary").unwrap(), Value::Null);
    assert_eq!(found.get_decimal("salary").unwrap(), None);

    found.set("salary", Decimal::new(10000, 2)).unwrap();
    session.update(&mut found).unwrap();
    let found = session.find("Employee", &[Value::Int(1)]).unwrap().unwrap();
    assert_eq!(found.get_decimal("salary").unwrap(), Some(Decimal::new(100, 0)));
    assert_eq!(found.get_string("name").unwrap().as_deref(), Some("Ann"));

    assert!(session.delete_by_key("Employee", &[Value::Int(1)]).unwrap());
    assert!(session.find("Employee", &[Value::Int(1)]).unwrap().is_none());
    assert!(!session.delete_by_key("Employee", &[Value::Int(1)]).unwrap());
}

#[test]
fn employee_key_type_is_checked() {
    let factory = factory(true);
    let mut session = factory.open_session();
    let err = session.find("Employee", &[Value::from("one")]).unwrap_err();
    assert!(matches!(err, Error::User(_)));
}

#[test]
fn employee_query_by_salary() {
    let factory = factory(true);
    let mut session = factory.open_session();
    for (id, name, salary) in [(1, "Ann", Some(90)), (2, "Bob", Some(120)), (3, "Cy", None)] {
        let mut e = session.new_instance("Employee").unwrap();
        e.set("id", id).unwrap();
        e.set("name", name).unwrap();
        e.set("salary", salary.map_or(Value::Null, |s| Value::Decimal(Decimal::new(s, 0))))
            .unwrap();
        session.persist(&mut e).unwrap();
    }

    let salary = factory.handler("Employee").unwrap().field_number("salary").unwrap();
    let mut params = Parameters::new();
    params.insert("floor".into(), Value::Decimal(Decimal::new(100, 0)));
    let rich = session
        .query(
            "Employee",
            Some(&Predicate::compare(salary, Comparison::Ge, Operand::param("floor"))),
            &params,
        )
        .unwrap();
    assert_eq!(rich.len(), 1);
    assert_eq!(rich[0].get_int("id").unwrap(), Some(2));

    let unpaid = session
        .query("Employee", Some(&Predicate::IsNull(salary)), &Parameters::new())
        .unwrap();
    assert_eq!(unpaid.len(), 1);
    assert_eq!(unpaid[0].get_string("name").unwrap().as_deref(), Some("Cy"));
}

#[test]
fn employee_changes_roll_back() {
    let factory = factory(true);
    let mut session = factory.open_session();
    session.begin().unwrap();
    let mut e = session.new_instance("Employee").unwrap();
    e.set("id", 9).unwrap();
    e.set("name", "Dee").unwrap();
    session.persist(&mut e).unwrap();
    session.rollback().unwrap();
    assert!(session.find("Employee", &[Value::Int(9)]).unwrap().is_none());
}
