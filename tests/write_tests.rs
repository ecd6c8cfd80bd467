mod common;

use common::{props, rows, s, seeded_store};
use cyphera::{Engine, Value};

#[test]
fn create_binds_and_returns_the_node() {
    let g = seeded_store();
    let created = rows(&g, "CREATE (n:Tmp {x: 1}) RETURN n");
    assert_eq!(created.len(), 1);
    match created[0].get("n") {
        Some(Value::Node(node)) => {
            assert!(node.has_label("Tmp"));
            assert_eq!(node.properties.get("x"), Some(&Value::Int(1)));
        }
        other => panic!("expected node, got {:?}", other),
    }
    assert_eq!(g.node_count(), 7);
}

#[test]
fn create_with_trailing_set() {
    let g = seeded_store();
    let created = rows(&g, "CREATE (n:Tmp {x: 1}) SET n.y = 2 RETURN n");
    match created[0].get("n") {
        Some(Value::Node(node)) => {
            assert_eq!(node.properties.get("x"), Some(&Value::Int(1)));
            assert_eq!(node.properties.get("y"), Some(&Value::Int(2)));
        }
        other => panic!("expected node, got {:?}", other),
    }
}

#[test]
fn create_relationship_between_carried_bindings() {
    let g = seeded_store();
    let script = "MATCH (a:Person {name:'Alice'}) RETURN a; \
                  MATCH (b:Person {name:'Bob'}) RETURN b; \
                  CREATE (a)-[r:KNOWS {since: 1999}]->(b) RETURN r";
    let out = rows(&g, script);
    // One row per statement: a, b, then r.
    assert_eq!(out.len(), 3);
    match out[2].get("r") {
        Some(Value::Rel(rel)) => {
            assert_eq!(rel.rel_type, "KNOWS");
            assert_eq!(rel.start, Value::Int(1));
            assert_eq!(rel.end, Value::Int(2));
            assert_eq!(rel.properties.get("since"), Some(&Value::Int(1999)));
        }
        other => panic!("expected relationship, got {:?}", other),
    }
    assert_eq!(g.rel_count(), 5);
}

#[test]
fn create_relationship_creates_unbound_endpoints() {
    let g = seeded_store();
    rows(&g, "CREATE (a:City {name:'Oslo'})-[r:NEAR]->(b:City {name:'Bergen'}) RETURN r");
    assert_eq!(g.node_count(), 8);
    assert_eq!(g.rel_count(), 5);
}

#[test]
fn merge_is_idempotent() {
    let g = seeded_store();
    let first = rows(&g, "MERGE (n:Tag {k: 'v'}) RETURN id(n) AS id");
    let second = rows(&g, "MERGE (n:Tag {k: 'v'}) RETURN id(n) AS id");
    assert_eq!(first[0].get("id"), second[0].get("id"));
    assert_eq!(g.node_count(), 7);
}

#[test]
fn merge_on_create_and_on_match() {
    let g = seeded_store();
    let created = rows(
        &g,
        "MERGE (n:Tag {k:'v'}) ON CREATE SET n.created = true ON MATCH SET n.matched = true RETURN n",
    );
    match created[0].get("n") {
        Some(Value::Node(node)) => {
            assert_eq!(node.properties.get("created"), Some(&Value::Bool(true)));
            assert_eq!(node.properties.get("matched"), None);
        }
        other => panic!("expected node, got {:?}", other),
    }
    let matched = rows(
        &g,
        "MERGE (n:Tag {k:'v'}) ON CREATE SET n.created2 = true ON MATCH SET n.matched = true RETURN n",
    );
    match matched[0].get("n") {
        Some(Value::Node(node)) => {
            assert_eq!(node.properties.get("matched"), Some(&Value::Bool(true)));
            assert_eq!(node.properties.get("created2"), None);
        }
        other => panic!("expected node, got {:?}", other),
    }
}

#[test]
fn merge_relationship_between_bound_nodes() {
    let g = seeded_store();
    let script = "MATCH (a:Person {name:'Alice'}) RETURN a; \
                  MATCH (b:Person {name:'Bob'}) RETURN b; \
                  MERGE (a)-[r:KNOWS]->(b) ON CREATE SET r.fresh = true RETURN r";
    rows(&g, script);
    assert_eq!(g.rel_count(), 5);
    // Second run matches the existing relationship instead of creating.
    rows(&g, script);
    assert_eq!(g.rel_count(), 5);
}

#[test]
fn merge_relationship_requires_bound_endpoints() {
    let g = seeded_store();
    let engine = Engine::new(&g);
    let err = engine
        .run("MERGE (a)-[r:KNOWS]->(b) RETURN r")
        .collect_rows()
        .unwrap_err();
    assert!(matches!(err, cyphera::EngineError::Semantic { .. }));
    // The failed script rolled back; nothing was created.
    assert_eq!(g.rel_count(), 4);
}

#[test]
fn set_updates_every_match() {
    let g = seeded_store();
    let updated = rows(&g, "MATCH (m:Movie) SET m.archived = true RETURN m");
    assert_eq!(updated.len(), 2);
    let archived = rows(&g, "MATCH (m:Movie) WHERE m.archived = true RETURN m");
    assert_eq!(archived.len(), 2);
}

#[test]
fn set_with_expression_over_existing_property() {
    let g = seeded_store();
    let updated = rows(&g, "MATCH (m:Movie {title:'The Matrix'}) SET m.released = m.released + 1 RETURN m");
    match updated[0].get("m") {
        Some(Value::Node(node)) => {
            assert_eq!(node.properties.get("released"), Some(&Value::Int(2000)));
        }
        other => panic!("expected node, got {:?}", other),
    }
}

#[test]
fn delete_removes_first_match_and_cascades() {
    let g = seeded_store();
    rows(&g, "MATCH (n:Person {name:'Alice'}) DELETE n");
    assert_eq!(g.node_count(), 5);
    // Alice's two ACTED_IN relationships went with her.
    assert_eq!(g.rel_count(), 2);
    let remaining = rows(&g, "MATCH ()-[r:ACTED_IN]->() RETURN r");
    assert_eq!(remaining.len(), 1);
}

#[test]
fn delete_relationship_only() {
    let g = seeded_store();
    rows(&g, "MATCH ()-[r:IN_GENRE]->() DELETE r");
    assert_eq!(g.rel_count(), 3);
    assert_eq!(g.node_count(), 6);
}

#[test]
fn delete_variable_must_match_pattern() {
    let g = seeded_store();
    let engine = Engine::new(&g);
    let err = engine.run("MATCH (n:Person) DELETE q").collect_rows().unwrap_err();
    assert!(matches!(err, cyphera::EngineError::Semantic { .. }));
    assert_eq!(g.node_count(), 6);
}

#[test]
fn foreach_runs_its_body_per_element() {
    let g = seeded_store();
    let script = "FOREACH x IN [1, 2, 3] CREATE (n:Num {v: x}); \
                  MATCH (n:Num) RETURN COUNT(n) AS c";
    let out = rows(&g, script);
    assert_eq!(out[0].get("c"), Some(&Value::Int(3)));
    let values = rows(&g, "MATCH (n:Num) RETURN n.v AS v ORDER BY v");
    assert_eq!(values[2].get("v"), Some(&Value::Int(3)));
}

#[test]
fn create_then_set_script_scenario() {
    let g = seeded_store();
    let out = rows(&g, "CREATE (n:Tmp {x:1}) RETURN n; MATCH (n:Tmp {x:1}) SET n.x = 2 RETURN n");
    let last = out.last().unwrap();
    match last.get("n") {
        Some(Value::Node(node)) => assert_eq!(node.properties.get("x"), Some(&Value::Int(2))),
        other => panic!("expected node, got {:?}", other),
    }
}

#[test]
fn unsupported_write_capability_is_reported() {
    use cyphera::{GraphStore, NodeRecord, NodeScan};

    // An adapter that only implements the required read surface.
    struct ReadOnly(cyphera::MemoryGraph);
    impl GraphStore for ReadOnly {
        fn get_node_by_id(&self, id: &Value) -> cyphera::EngineResult<Option<NodeRecord>> {
            self.0.get_node_by_id(id)
        }
        fn scan_nodes(
            &self,
            scan: &NodeScan,
        ) -> cyphera::EngineResult<cyphera::storage::RecordIter<'_, NodeRecord>> {
            self.0.scan_nodes(scan)
        }
    }

    let store = ReadOnly(seeded_store());
    let engine = Engine::new(&store);
    // Reads still work.
    assert_eq!(engine.run("MATCH (n:Person) RETURN n").collect_rows().unwrap().len(), 3);
    // Writes fail with the capability error, not a crash.
    let err = engine.run("CREATE (n:Tmp) RETURN n").collect_rows().unwrap_err();
    assert_eq!(err.to_string(), "adapter does not support create_node");
}

#[test]
fn create_with_parameters() {
    let g = seeded_store();
    let engine = Engine::new(&g);
    let out = engine
        .run_with_params(
            "CREATE (n:Tmp {name: $name}) RETURN n.name AS name",
            props(&[("name", s("from-param"))]),
        )
        .collect_rows()
        .unwrap();
    assert_eq!(out[0].get("name"), Some(&Value::Str("from-param".into())));
}
