mod common;

use common::{rows, seeded_store, strings};
use cyphera::{Engine, Value};

#[test]
fn scan_totality() {
    let g = seeded_store();
    assert_eq!(rows(&g, "MATCH (n) RETURN n").len(), 6);
    assert_eq!(rows(&g, "MATCH (n:Person) RETURN n").len(), 3);
    assert_eq!(rows(&g, "MATCH (n:Movie) RETURN n").len(), 2);
    // Multi-label means all-of.
    let both = rows(&g, "MATCH (n:Person:Actor) RETURN n.name AS name");
    assert_eq!(both.len(), 1);
    assert_eq!(both[0].get("name"), Some(&Value::Str("Carol".into())));
}

#[test]
fn ordered_projection_scenario() {
    let g = seeded_store();
    let names = strings(&g, "MATCH (n:Person) RETURN n.name AS name ORDER BY name DESC", "name");
    assert_eq!(names, vec!["Carol", "Bob", "Alice"]);
}

#[test]
fn where_filter_scenario() {
    let g = seeded_store();
    let titles = strings(&g, "MATCH (m:Movie) WHERE m.released > 2000 RETURN m.title AS t", "t");
    assert_eq!(titles, vec!["John Wick"]);
}

#[test]
fn literal_filter_equals_where_filter() {
    let g = seeded_store();
    let by_props = strings(&g, "MATCH (m:Movie {released: 1999}) RETURN m.title AS t", "t");
    let by_where = strings(&g, "MATCH (m:Movie) WHERE m.released = 1999 RETURN m.title AS t", "t");
    assert_eq!(by_props, by_where);
    assert_eq!(by_props, vec!["The Matrix"]);
}

#[test]
fn enabling_an_index_does_not_change_results() {
    let g = seeded_store();
    let query = "MATCH (n:Person {name: 'Alice'}) RETURN n.name AS name";
    let before = strings(&g, query, "name");
    g.create_index(Some("Person"), "name");
    let after = strings(&g, query, "name");
    assert_eq!(before, after);
    assert_eq!(after, vec!["Alice"]);
}

#[test]
fn missing_property_filter_matches_nothing() {
    let g = seeded_store();
    assert!(rows(&g, "MATCH (n) WHERE n.missing = 1 RETURN n").is_empty());
    assert!(rows(&g, "MATCH (n) WHERE n.missing = n.alsomissing RETURN n").is_empty());
    // IS NULL flips it around.
    assert_eq!(rows(&g, "MATCH (n:Person) WHERE n.salary IS NULL RETURN n").len(), 3);
}

#[test]
fn chain_matching_scenario() {
    let g = seeded_store();
    let pairs = rows(&g, "MATCH (p:Person)-[:ACTED_IN]->(m:Movie) RETURN p.name AS p, m.title AS m");
    let mut seen: Vec<(String, String)> = pairs
        .iter()
        .map(|r| {
            let p = r.get("p").and_then(|v| v.as_str()).unwrap().to_string();
            let m = r.get("m").and_then(|v| v.as_str()).unwrap().to_string();
            (p, m)
        })
        .collect();
    seen.sort();
    assert_eq!(
        seen,
        vec![
            ("Alice".to_string(), "John Wick".to_string()),
            ("Alice".to_string(), "The Matrix".to_string()),
            ("Bob".to_string(), "John Wick".to_string()),
        ]
    );
}

#[test]
fn two_hop_chain_scenario() {
    let g = seeded_store();
    let genres = strings(
        &g,
        "MATCH (p:Person {name:\"Alice\"})-[:ACTED_IN]->(m)-[:IN_GENRE]->(g) RETURN g.name AS g",
        "g",
    );
    assert_eq!(genres, vec!["Action"]);
}

#[test]
fn incoming_and_undirected_hops() {
    let g = seeded_store();
    let actors = strings(
        &g,
        "MATCH (m:Movie {title:'John Wick'})<-[:ACTED_IN]-(p) RETURN p.name AS name ORDER BY name",
        "name",
    );
    assert_eq!(actors, vec!["Alice", "Bob"]);

    // Undirected: the ACTED_IN edge is found from its end node too.
    let either = strings(
        &g,
        "MATCH (m:Movie {title:'The Matrix'})-[:ACTED_IN]-(p:Person) RETURN p.name AS name",
        "name",
    );
    assert_eq!(either, vec!["Alice"]);
}

#[test]
fn relationship_scan_and_properties() {
    let g = seeded_store();
    let all = rows(&g, "MATCH ()-[r]->() RETURN r");
    assert_eq!(all.len(), 4);
    let roles = strings(&g, "MATCH ()-[r:ACTED_IN]->() WHERE r.role = 'Neo' RETURN r.role AS role", "role");
    assert_eq!(roles, vec!["Neo"]);
    let types = strings(&g, "MATCH ()-[r:IN_GENRE]->() RETURN type(r) AS t", "t");
    assert_eq!(types, vec!["IN_GENRE"]);
}

#[test]
fn optional_match_preserves_one_null_row() {
    let g = seeded_store();
    let empty = rows(&g, "OPTIONAL MATCH (n:Absent) RETURN n");
    assert_eq!(empty.len(), 1);
    assert_eq!(empty[0].get("n"), Some(&Value::Null));

    // With matches it behaves exactly like MATCH, never padded.
    let found = rows(&g, "OPTIONAL MATCH (n:Person) RETURN n");
    assert_eq!(found.len(), 3);
}

#[test]
fn multi_pattern_cartesian_product() {
    let g = seeded_store();
    let product = rows(&g, "MATCH (p:Person), (m:Movie) RETURN p.name AS p, m.title AS m");
    assert_eq!(product.len(), 6);
    let filtered = rows(
        &g,
        "MATCH (p:Person), (m:Movie) WHERE p.name = 'Bob' AND m.released = 2014 RETURN p, m",
    );
    assert_eq!(filtered.len(), 1);
}

#[test]
fn id_labels_and_functions() {
    let g = seeded_store();
    let row = &rows(&g, "MATCH (n:Person {name:'Alice'}) RETURN id(n), labels(n)")[0];
    assert_eq!(row.get("id"), Some(&Value::Int(1)));
    assert_eq!(row.get("labels"), Some(&Value::List(vec![Value::Str("Person".into())])));
}

#[test]
fn string_predicates() {
    let g = seeded_store();
    assert_eq!(
        strings(&g, "MATCH (m:Movie) WHERE m.title STARTS WITH 'John' RETURN m.title AS t", "t"),
        vec!["John Wick"]
    );
    assert_eq!(
        strings(&g, "MATCH (m:Movie) WHERE m.title ENDS WITH 'Matrix' RETURN m.title AS t", "t"),
        vec!["The Matrix"]
    );
    assert_eq!(
        strings(&g, "MATCH (m:Movie) WHERE m.title CONTAINS 'Wick' RETURN m.title AS t", "t"),
        vec!["John Wick"]
    );
    assert_eq!(
        strings(&g, "MATCH (m:Movie) WHERE m.released IN [1999, 2005] RETURN m.title AS t", "t"),
        vec!["The Matrix"]
    );
}

#[test]
fn skip_limit_and_distinct() {
    let g = seeded_store();
    let names = strings(&g, "MATCH (n:Person) RETURN n.name AS name ORDER BY name SKIP 1 LIMIT 1", "name");
    assert_eq!(names, vec!["Bob"]);

    let distinct = strings(
        &g,
        "MATCH (p:Person)-[:ACTED_IN]->(m:Movie) RETURN DISTINCT m.title AS t ORDER BY t",
        "t",
    );
    assert_eq!(distinct, vec!["John Wick", "The Matrix"]);
}

#[test]
fn return_star_emits_bound_variables() {
    let g = seeded_store();
    let star = rows(&g, "MATCH (n:Genre) RETURN *");
    assert_eq!(star.len(), 1);
    match star[0].get("n") {
        Some(Value::Node(node)) => assert_eq!(node.id, Value::Int(6)),
        other => panic!("expected node under 'n', got {:?}", other),
    }
}

#[test]
fn alias_inference_fallbacks() {
    let g = seeded_store();
    let row = &rows(&g, "RETURN 1 + 1")[0];
    assert_eq!(row.get("value"), Some(&Value::Int(2)));
    let row = &rows(&g, "RETURN 1, 2")[0];
    assert_eq!(row.get("value0"), Some(&Value::Int(1)));
    assert_eq!(row.get("value1"), Some(&Value::Int(2)));
}

#[test]
fn parameters_bind_by_name() {
    let g = seeded_store();
    let engine = Engine::new(&g);
    let params = common::props(&[("who", common::s("Alice"))]);
    let found = engine
        .run_with_params("MATCH (n:Person {name: $who}) RETURN n.name AS name", params)
        .collect_rows()
        .unwrap();
    assert_eq!(found.len(), 1);
    // Unknown parameters evaluate to Null, which never equality-matches.
    let missing = engine
        .run_with_params("MATCH (n:Person {name: $nobody}) RETURN n", Default::default())
        .collect_rows()
        .unwrap();
    assert!(missing.is_empty());
}

#[test]
fn syntax_errors_surface_on_first_poll() {
    let g = seeded_store();
    let engine = Engine::new(&g);
    let mut stream = engine.run("MATCH (n RETURN n");
    match stream.next() {
        Some(Err(e)) => assert!(e.is_parse_error(), "unexpected error kind: {:?}", e),
        other => panic!("expected a syntax error, got {:?}", other.map(|r| r.map(|r| r.to_json()))),
    }
    assert!(stream.next().is_none());
}
