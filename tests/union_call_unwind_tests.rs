mod common;

use common::{props, rows, seeded_store, strings};
use cyphera::{Engine, Value};

#[test]
fn union_deduplicates_unless_all() {
    let g = seeded_store();
    assert_eq!(rows(&g, "RETURN 1 AS x UNION RETURN 1 AS x").len(), 1);
    assert_eq!(rows(&g, "RETURN 1 AS x UNION ALL RETURN 1 AS x").len(), 2);
}

#[test]
fn union_left_rows_precede_right_rows() {
    let g = seeded_store();
    let names = strings(
        &g,
        "MATCH (p:Person {name:'Bob'}) RETURN p.name AS name UNION MATCH (g:Genre) RETURN g.name AS name",
        "name",
    );
    assert_eq!(names, vec!["Bob", "Action"]);
}

#[test]
fn union_level_order_and_limit() {
    let g = seeded_store();
    let names = strings(
        &g,
        "MATCH (p:Person) RETURN p.name AS name UNION MATCH (m:Movie) RETURN m.title AS name ORDER BY name LIMIT 3",
        "name",
    );
    assert_eq!(names, vec!["Alice", "Bob", "Carol"]);
}

#[test]
fn unwind_binds_each_element() {
    let g = seeded_store();
    let out = rows(&g, "UNWIND [1, 2, 3] AS x RETURN x");
    let values: Vec<&Value> = out.iter().map(|r| r.get("x").unwrap()).collect();
    assert_eq!(values, vec![&Value::Int(1), &Value::Int(2), &Value::Int(3)]);
}

#[test]
fn unwind_expression_per_element() {
    let g = seeded_store();
    let out = rows(&g, "UNWIND [1, 2] AS x RETURN x * 10");
    assert_eq!(out[0].get("value"), Some(&Value::Int(10)));
    assert_eq!(out[1].get("value"), Some(&Value::Int(20)));
}

#[test]
fn unwind_of_a_non_list_yields_nothing() {
    let g = seeded_store();
    assert!(rows(&g, "UNWIND 5 AS x RETURN x").is_empty());
    assert!(rows(&g, "UNWIND null AS x RETURN x").is_empty());
}

#[test]
fn unwind_parameter_list() {
    let g = seeded_store();
    let engine = Engine::new(&g);
    let out = engine
        .run_with_params(
            "UNWIND $names AS name RETURN name",
            props(&[(
                "names",
                Value::List(vec![Value::Str("x".into()), Value::Str("y".into())]),
            )]),
        )
        .collect_rows()
        .unwrap();
    assert_eq!(out.len(), 2);
}

#[test]
fn bare_return_with_skip_and_limit() {
    let g = seeded_store();
    assert_eq!(rows(&g, "RETURN 1 AS x").len(), 1);
    assert!(rows(&g, "RETURN 1 AS x SKIP 1").is_empty());
    assert!(rows(&g, "RETURN 1 AS x LIMIT 0").is_empty());
}

#[test]
fn call_projects_rows_of_the_last_inner_statement() {
    let g = seeded_store();
    let names = strings(
        &g,
        "CALL { MATCH (p:Person) RETURN p } RETURN p.name AS name ORDER BY name",
        "name",
    );
    assert_eq!(names, vec!["Alice", "Bob", "Carol"]);
}

#[test]
fn call_merges_intermediate_bindings_last_row_wins() {
    let g = seeded_store();
    let out = rows(
        &g,
        "CALL { MATCH (m:Movie {title:'The Matrix'}) RETURN m; RETURN 1 AS one } RETURN m.title AS t, one",
    );
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].get("t"), Some(&Value::Str("The Matrix".into())));
    assert_eq!(out[0].get("one"), Some(&Value::Int(1)));
}

#[test]
fn call_supports_outer_aggregation() {
    let g = seeded_store();
    let out = rows(&g, "CALL { MATCH (p:Person) RETURN p } RETURN COUNT(p) AS c");
    assert_eq!(out[0].get("c"), Some(&Value::Int(3)));
}

#[test]
fn length_and_string_arithmetic() {
    let g = seeded_store();
    let row = &rows(&g, "RETURN length('abc') AS l, 'v' + 2 AS s, 1 + 2.5 AS n")[0];
    assert_eq!(row.get("l"), Some(&Value::Int(3)));
    assert_eq!(row.get("s"), Some(&Value::Str("v2".into())));
    assert_eq!(row.get("n"), Some(&Value::Float(3.5)));
}

#[test]
fn null_handling_in_bare_returns() {
    let g = seeded_store();
    let row = &rows(&g, "RETURN null + 1 AS a, 2 AS b")[0];
    assert_eq!(row.get("a"), Some(&Value::Null));
    assert_eq!(row.get("b"), Some(&Value::Int(2)));
}
