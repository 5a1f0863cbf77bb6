//! Large object fields
//!
//! Text and binary LOB fields are written in two phases: the row carries a
//! placeholder until the transaction executes, then the content lands.

use crate::common::factory;
use clusterbind::Value;

fn long_text() -> String {
    "lorem ipsum ".repeat(2_000)
}

#[test]
fn lob_round_trip() {
    let factory = factory(true);
    let mut session = factory.open_session();
    let mut doc = session.new_instance("Document").unwrap();
    doc.set("id", 1i64).unwrap();
    doc.set("title", "notes").unwrap();
    doc.set("body", long_text()).unwrap();
    doc.set("scan", vec![0u8, 1, 2, 254, 255]).unwrap();
    session.persist(&mut doc).unwrap();

    let found = session.find("Document", &[Value::Long(1)]).unwrap().unwrap();
    assert_eq!(found.get_string("body").unwrap(), Some(long_text()));
    assert_eq!(found.get("scan").unwrap(), Value::Bytes(vec![0, 1, 2, 254, 255]));
}

#[test]
fn lob_content_lands_at_commit() {
    let factory = factory(true);
    let mut session = factory.open_session();
    session.begin().unwrap();
    let mut doc = session.new_instance("Document").unwrap();
    doc.set("id", 2i64).unwrap();
    doc.set("body", "draft").unwrap();
    session.persist(&mut doc).unwrap();
    assert_eq!(factory.cluster().row_count("document").unwrap(), 0);
    session.commit().unwrap();

    let found = session.find("Document", &[Value::Int(2)]).unwrap().unwrap();
    assert_eq!(found.get_string("body").unwrap().as_deref(), Some("draft"));
    // unset LOB fields stay null
    assert_eq!(found.get("scan").unwrap(), Value::Null);
}

#[test]
fn lob_update_replaces_and_clears() {
    let factory = factory(true);
    let mut session = factory.open_session();
    let mut doc = session.new_instance("Document").unwrap();
    doc.set("id", 3i64).unwrap();
    doc.set("body", "first").unwrap();
    doc.set("scan", vec![9u8; 16]).unwrap();
    session.persist(&mut doc).unwrap();

    let mut doc = session.find("Document", &[Value::Long(3)]).unwrap().unwrap();
    doc.set("body", "second").unwrap();
    doc.set("scan", Value::Null).unwrap();
    session.update(&mut doc).unwrap();

    let doc = session.find("Document", &[Value::Long(3)]).unwrap().unwrap();
    assert_eq!(doc.get_string("body").unwrap().as_deref(), Some("second"));
    assert_eq!(doc.get("scan").unwrap(), Value::Null);
}

#[test]
fn lob_is_rejected_in_predicates() {
    use clusterbind::{Operand, Parameters, Predicate};

    let factory = factory(true);
    let mut session = factory.open_session();
    let body = factory.handler("Document").unwrap().field_number("body").unwrap();
    let result = session.query(
        "Document",
        Some(&Predicate::equal(body, Operand::literal("x"))),
        &Parameters::new(),
    );
    assert!(result.is_err());
}
