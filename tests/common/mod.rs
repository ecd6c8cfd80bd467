//! Shared test support: tracing init and the seeded movie graph every
//! suite runs against.
#![allow(dead_code)]

use cyphera::{MemoryGraph, PropertyMap, Value};

pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn props(entries: &[(&str, Value)]) -> PropertyMap {
    entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

pub fn s(text: &str) -> Value {
    Value::Str(text.to_string())
}

/// Alice(1,Person), Bob(2,Person), Matrix(3,Movie,1999), JohnWick(4,Movie,2014),
/// Carol(5,Person+Actor), Action(6,Genre), ACTED_IN(7: 1->3 role Neo),
/// ACTED_IN(8: 1->4 role John), ACTED_IN(9: 2->4 role Buddy), IN_GENRE(10: 3->6).
pub fn seeded_store() -> MemoryGraph {
    init_tracing();
    let g = MemoryGraph::new();
    g.insert_node_with_id(Value::Int(1), ["Person"], props(&[("name", s("Alice"))])).unwrap();
    g.insert_node_with_id(Value::Int(2), ["Person"], props(&[("name", s("Bob"))])).unwrap();
    g.insert_node_with_id(
        Value::Int(3),
        ["Movie"],
        props(&[("title", s("The Matrix")), ("released", Value::Int(1999))]),
    )
    .unwrap();
    g.insert_node_with_id(
        Value::Int(4),
        ["Movie"],
        props(&[("title", s("John Wick")), ("released", Value::Int(2014))]),
    )
    .unwrap();
    g.insert_node_with_id(Value::Int(5), ["Person", "Actor"], props(&[("name", s("Carol"))]))
        .unwrap();
    g.insert_node_with_id(Value::Int(6), ["Genre"], props(&[("name", s("Action"))])).unwrap();
    g.insert_rel_with_id(Value::Int(7), "ACTED_IN", Value::Int(1), Value::Int(3), props(&[("role", s("Neo"))]))
        .unwrap();
    g.insert_rel_with_id(Value::Int(8), "ACTED_IN", Value::Int(1), Value::Int(4), props(&[("role", s("John"))]))
        .unwrap();
    g.insert_rel_with_id(Value::Int(9), "ACTED_IN", Value::Int(2), Value::Int(4), props(&[("role", s("Buddy"))]))
        .unwrap();
    g.insert_rel_with_id(Value::Int(10), "IN_GENRE", Value::Int(3), Value::Int(6), PropertyMap::new())
        .unwrap();
    g
}

/// Collect one column of string values, in row order.
pub fn strings(store: &MemoryGraph, query: &str, column: &str) -> Vec<String> {
    let engine = cyphera::Engine::new(store);
    engine
        .run(query)
        .collect_rows()
        .expect("query failed")
        .into_iter()
        .map(|row| match row.get(column) {
            Some(Value::Str(s)) => s.clone(),
            other => panic!("expected string in '{}', got {:?}", column, other),
        })
        .collect()
}

/// Run and collect, panicking on error.
pub fn rows(store: &MemoryGraph, query: &str) -> Vec<cyphera::Row> {
    cyphera::Engine::new(store).run(query).collect_rows().expect("query failed")
}
