use crate::ast::*;
use crate::parser::{parse_script, parse_statement};
use crate::value::Value;

#[test]
fn single_node_match() {
    let stmt = parse_statement("MATCH (n:Person) RETURN n").expect("parse failed");
    match stmt {
        Statement::MatchReturn { optional, target: MatchTarget::Node(node), where_clause, ret } => {
            assert!(!optional);
            assert_eq!(node.var.as_deref(), Some("n"));
            assert_eq!(node.labels, vec!["Person".to_string()]);
            assert!(where_clause.is_none());
            assert_eq!(ret.items.len(), 1);
        }
        other => panic!("expected MatchReturn, got {:?}", other),
    }
}

#[test]
fn multi_label_and_property_filter() {
    let stmt = parse_statement("MATCH (n:A:B {k: 1}) RETURN n").expect("parse failed");
    match stmt {
        Statement::MatchReturn { target: MatchTarget::Node(node), .. } => {
            assert_eq!(node.labels, vec!["A".to_string(), "B".to_string()]);
            assert_eq!(node.props.len(), 1);
            assert_eq!(node.props[0].0, "k");
        }
        other => panic!("expected MatchReturn, got {:?}", other),
    }
}

#[test]
fn optional_match_flag() {
    let stmt = parse_statement("OPTIONAL MATCH (n:Absent) RETURN n").expect("parse failed");
    match stmt {
        Statement::MatchReturn { optional, .. } => assert!(optional),
        other => panic!("expected MatchReturn, got {:?}", other),
    }
}

#[test]
fn where_precedence_or_over_and() {
    let stmt =
        parse_statement("MATCH (n) WHERE n.a = 1 AND n.b = 2 OR n.c = 3 RETURN n").expect("parse");
    let clause = match stmt {
        Statement::MatchReturn { where_clause: Some(w), .. } => w,
        other => panic!("expected where clause, got {:?}", other),
    };
    // OR binds loosest: (a AND b) OR c
    match clause {
        WhereClause::Or(left, _) => match *left {
            WhereClause::And(_, _) => {}
            other => panic!("expected AND under OR, got {:?}", other),
        },
        other => panic!("expected OR at top, got {:?}", other),
    }
}

#[test]
fn where_postfix_and_infix_operators() {
    let stmt = parse_statement(
        "MATCH (n) WHERE n.a IS NOT NULL AND n.b STARTS WITH 'x' AND n.c IN [1, 2] RETURN n",
    )
    .expect("parse failed");
    match stmt {
        Statement::MatchReturn { where_clause: Some(_), .. } => {}
        other => panic!("expected where clause, got {:?}", other),
    }
}

#[test]
fn chain_of_two_hops() {
    let stmt = parse_statement(
        "MATCH (p:Person {name:\"Alice\"})-[:ACTED_IN]->(m)-[:IN_GENRE]->(g) RETURN g.name AS g",
    )
    .expect("parse failed");
    match stmt {
        Statement::MatchChain { start, hops, path_var, .. } => {
            assert_eq!(start.var.as_deref(), Some("p"));
            assert_eq!(hops.len(), 2);
            assert_eq!(hops[0].0.rel_type.as_deref(), Some("ACTED_IN"));
            assert_eq!(hops[1].0.rel_type.as_deref(), Some("IN_GENRE"));
            assert!(path_var.is_none());
        }
        other => panic!("expected MatchChain, got {:?}", other),
    }
}

#[test]
fn chain_directions() {
    let stmt = parse_statement("MATCH (a)<-[r:KNOWS]-(b) RETURN a.name").expect("parse failed");
    match stmt {
        Statement::MatchChain { hops, .. } => assert_eq!(hops[0].0.dir, RelDir::In),
        other => panic!("expected MatchChain, got {:?}", other),
    }
    let stmt = parse_statement("MATCH (a)-[r]-(b) RETURN a.name").expect("parse failed");
    match stmt {
        Statement::MatchChain { hops, .. } => assert_eq!(hops[0].0.dir, RelDir::Either),
        other => panic!("expected MatchChain, got {:?}", other),
    }
}

#[test]
fn single_hop_rolls_back_to_relationship_scan() {
    // RETURN touches only the relationship variable and the endpoints are
    // unconstrained, so this parses as a relationship pattern.
    let stmt = parse_statement("MATCH (a)-[r:ACTED_IN]->(b) RETURN r").expect("parse failed");
    match stmt {
        Statement::MatchReturn { target: MatchTarget::Rel(rel), .. } => {
            assert_eq!(rel.var.as_deref(), Some("r"));
            assert_eq!(rel.rel_type.as_deref(), Some("ACTED_IN"));
        }
        other => panic!("expected relationship MatchReturn, got {:?}", other),
    }
}

#[test]
fn single_hop_with_used_endpoint_stays_a_chain() {
    let stmt = parse_statement("MATCH (a)-[r:ACTED_IN]->(b) RETURN r, b").expect("parse failed");
    assert!(matches!(stmt, Statement::MatchChain { .. }));
    // Labeled endpoints also keep the chain even if RETURN only uses r.
    let stmt = parse_statement("MATCH (a:Person)-[r:ACTED_IN]->(b) RETURN r").expect("parse failed");
    assert!(matches!(stmt, Statement::MatchChain { .. }));
}

#[test]
fn comma_separated_patterns() {
    let stmt = parse_statement("MATCH (a:Person), (b:Movie) RETURN a, b").expect("parse failed");
    match stmt {
        Statement::MatchMultiReturn { patterns, .. } => assert_eq!(patterns.len(), 2),
        other => panic!("expected MatchMultiReturn, got {:?}", other),
    }
}

#[test]
fn variable_length_path() {
    let stmt = parse_statement("MATCH p = (a {name:'Alice'})-[*]->(b) RETURN p").expect("parse");
    match stmt {
        Statement::MatchPath { path_var, start, end, ret, .. } => {
            assert_eq!(path_var, "p");
            assert_eq!(start.props.len(), 1);
            assert_eq!(end.var.as_deref(), Some("b"));
            assert!(ret.is_some());
        }
        other => panic!("expected MatchPath, got {:?}", other),
    }
}

#[test]
fn variable_length_without_path_variable_is_rejected() {
    assert!(parse_statement("MATCH (a)-[*]->(b) RETURN b").is_err());
}

#[test]
fn path_variable_on_a_fixed_chain() {
    let stmt = parse_statement("MATCH p = (a)-[:KNOWS]->(b) RETURN p, b").expect("parse failed");
    match stmt {
        Statement::MatchChain { path_var, .. } => assert_eq!(path_var.as_deref(), Some("p")),
        other => panic!("expected MatchChain, got {:?}", other),
    }
}

#[test]
fn return_clause_trailers() {
    let stmt = parse_statement(
        "MATCH (n) RETURN DISTINCT n.name AS name, n.age ORDER BY name DESC, n.age SKIP 1 LIMIT 2",
    )
    .expect("parse failed");
    match stmt {
        Statement::MatchReturn { ret, .. } => {
            assert!(ret.distinct);
            assert_eq!(ret.items.len(), 2);
            assert_eq!(ret.items[0].alias.as_deref(), Some("name"));
            assert_eq!(ret.order_by.len(), 2);
            assert!(!ret.order_by[0].1);
            assert!(ret.order_by[1].1);
            assert_eq!(ret.skip, Some(Expression::Literal(Value::Int(1))));
            assert_eq!(ret.limit, Some(Expression::Literal(Value::Int(2))));
        }
        other => panic!("expected MatchReturn, got {:?}", other),
    }
}

#[test]
fn aggregates_and_arithmetic_over_them() {
    let stmt = parse_statement("MATCH (m) RETURN m.year AS y, COUNT(m) + 1 AS c").expect("parse");
    match stmt {
        Statement::MatchReturn { ret, .. } => {
            assert!(!ret.items[0].expr.has_aggregate());
            assert!(ret.items[1].expr.has_aggregate());
        }
        other => panic!("expected MatchReturn, got {:?}", other),
    }
}

#[test]
fn count_star_and_distinct_argument() {
    let stmt = parse_statement("MATCH (n) RETURN count(*) AS c, count(DISTINCT n.name) AS d")
        .expect("parse failed");
    match stmt {
        Statement::MatchReturn { ret, .. } => {
            match &ret.items[0].expr {
                Expression::Aggregate { func: AggFunc::Count, distinct: false, arg: None } => {}
                other => panic!("expected count(*), got {:?}", other),
            }
            match &ret.items[1].expr {
                Expression::Aggregate { func: AggFunc::Count, distinct: true, arg: Some(_) } => {}
                other => panic!("expected count(DISTINCT ..), got {:?}", other),
            }
        }
        other => panic!("expected MatchReturn, got {:?}", other),
    }
}

#[test]
fn create_forms() {
    let stmt = parse_statement("CREATE (n:Tmp {x: 1}) RETURN n").expect("parse failed");
    match stmt {
        Statement::Create { node, set, ret } => {
            assert_eq!(node.labels, vec!["Tmp".to_string()]);
            assert!(set.is_empty());
            assert!(ret.is_some());
        }
        other => panic!("expected Create, got {:?}", other),
    }

    let stmt = parse_statement("CREATE (a)-[r:KNOWS {since: 2020}]->(b) RETURN r").expect("parse");
    match stmt {
        Statement::CreateRel { rel, .. } => {
            assert_eq!(rel.rel_type.as_deref(), Some("KNOWS"));
            assert_eq!(rel.props.len(), 1);
        }
        other => panic!("expected CreateRel, got {:?}", other),
    }

    let stmt = parse_statement("CREATE (n:Tmp) SET n.x = 2, n.y = 3").expect("parse failed");
    match stmt {
        Statement::Create { set, ret, .. } => {
            assert_eq!(set.len(), 2);
            assert!(ret.is_none());
        }
        other => panic!("expected Create, got {:?}", other),
    }
}

#[test]
fn merge_with_trailers() {
    let stmt = parse_statement(
        "MERGE (n:Person {name: 'Ada'}) ON CREATE SET n.created = true ON MATCH SET n.seen = true RETURN n",
    )
    .expect("parse failed");
    match stmt {
        Statement::Merge { on_create, on_match, ret, .. } => {
            assert_eq!(on_create.len(), 1);
            assert_eq!(on_match.len(), 1);
            assert!(ret.is_some());
        }
        other => panic!("expected Merge, got {:?}", other),
    }

    let stmt = parse_statement("MERGE (a)-[r:KNOWS]->(b) ON CREATE SET r.w = 1 RETURN r")
        .expect("parse failed");
    assert!(matches!(stmt, Statement::MergeRel { .. }));
}

#[test]
fn delete_and_set_tails() {
    let stmt = parse_statement("MATCH (n:Tmp) WHERE n.x = 1 DELETE n").expect("parse failed");
    match stmt {
        Statement::MatchDelete { delete_var, target: MatchTarget::Node(_), .. } => {
            assert_eq!(delete_var, "n");
        }
        other => panic!("expected MatchDelete, got {:?}", other),
    }

    let stmt = parse_statement("MATCH ()-[r:KNOWS]->() DELETE r").expect("parse failed");
    assert!(matches!(stmt, Statement::MatchDelete { target: MatchTarget::Rel(_), .. }));

    let stmt = parse_statement("MATCH (n:Tmp {x:1}) SET n.x = 2 RETURN n").expect("parse failed");
    match stmt {
        Statement::MatchSet { sets, ret, .. } => {
            assert_eq!(sets.len(), 1);
            assert!(ret.is_some());
        }
        other => panic!("expected MatchSet, got {:?}", other),
    }
}

#[test]
fn unwind_and_foreach() {
    let stmt = parse_statement("UNWIND [1, 2, 3] AS x RETURN x").expect("parse failed");
    match stmt {
        Statement::Unwind { var, ret, .. } => {
            assert_eq!(var, "x");
            assert_eq!(ret.items.len(), 1);
        }
        other => panic!("expected Unwind, got {:?}", other),
    }

    let stmt = parse_statement("FOREACH x IN [1, 2] CREATE (n:Num {v: 1})").expect("parse failed");
    match stmt {
        Statement::Foreach { var, body, .. } => {
            assert_eq!(var, "x");
            assert!(matches!(*body, Statement::Create { .. }));
        }
        other => panic!("expected Foreach, got {:?}", other),
    }
}

#[test]
fn bare_return() {
    let stmt = parse_statement("RETURN 1 + 2 AS three").expect("parse failed");
    match stmt {
        Statement::Return { ret } => assert_eq!(ret.items[0].alias.as_deref(), Some("three")),
        other => panic!("expected Return, got {:?}", other),
    }
}

#[test]
fn union_folds_left_associatively() {
    let stmt = parse_statement("RETURN 1 AS x UNION RETURN 2 AS x UNION ALL RETURN 3 AS x")
        .expect("parse failed");
    match stmt {
        Statement::Union { left, all, .. } => {
            assert!(all);
            assert!(matches!(*left, Statement::Union { all: false, .. }));
        }
        other => panic!("expected Union, got {:?}", other),
    }
}

#[test]
fn union_lifts_trailing_order_from_final_arm() {
    let stmt = parse_statement("RETURN 2 AS x UNION RETURN 1 AS x ORDER BY x LIMIT 5")
        .expect("parse failed");
    match stmt {
        Statement::Union { right, order_by, limit, .. } => {
            assert_eq!(order_by.len(), 1);
            assert!(limit.is_some());
            // The lifted trailers are gone from the arm itself.
            match *right {
                Statement::Return { ref ret } => {
                    assert!(ret.order_by.is_empty());
                    assert!(ret.limit.is_none());
                }
                ref other => panic!("expected Return arm, got {:?}", other),
            }
        }
        other => panic!("expected Union, got {:?}", other),
    }
}

#[test]
fn call_subquery_with_inner_script() {
    let stmt = parse_statement("CALL { MATCH (n:Person) RETURN n; RETURN 1 AS one } RETURN one")
        .expect("parse failed");
    match stmt {
        Statement::Call { subquery, ret } => {
            assert_eq!(subquery.len(), 2);
            assert_eq!(ret.items.len(), 1);
        }
        other => panic!("expected Call, got {:?}", other),
    }
}

#[test]
fn scripts_split_on_semicolons() {
    let stmts = parse_script("CREATE (n:Tmp {x:1}) RETURN n; MATCH (n:Tmp {x:1}) SET n.x = 2 RETURN n;")
        .expect("parse failed");
    assert_eq!(stmts.len(), 2);
    assert!(matches!(stmts[0], Statement::Create { .. }));
    assert!(matches!(stmts[1], Statement::MatchSet { .. }));
}

#[test]
fn semicolons_inside_call_do_not_split() {
    let stmts = parse_script("CALL { RETURN 1 AS a; RETURN 2 AS a } RETURN a").expect("parse");
    assert_eq!(stmts.len(), 1);
}

#[test]
fn parameters_parse_in_patterns_and_predicates() {
    let stmt = parse_statement("MATCH (n:Person {name: $who}) WHERE n.age > $min RETURN n")
        .expect("parse failed");
    match stmt {
        Statement::MatchReturn { target: MatchTarget::Node(node), where_clause, .. } => {
            assert_eq!(node.props[0].1, Expression::Parameter("who".into()));
            assert!(where_clause.is_some());
        }
        other => panic!("expected MatchReturn, got {:?}", other),
    }
}

#[test]
fn syntax_errors_name_the_offending_token() {
    let err = parse_statement("MATCH (n RETURN n").unwrap_err();
    assert!(err.to_string().contains("syntax error"));

    assert!(parse_statement("MATCH (n)").is_err());
    assert!(parse_statement("RETURN").is_err());
    assert!(parse_statement("MATCH (n) RETURN n EXTRA").is_err());
}

#[test]
fn writer_detection_recurses() {
    let stmt = parse_statement("FOREACH x IN [1] CREATE (n:T {v: 1})").expect("parse failed");
    assert!(stmt.writes());
    let stmt = parse_statement("CALL { MATCH (n) RETURN n } RETURN n").expect("parse failed");
    assert!(!stmt.writes());
    let stmt = parse_statement("MATCH (n) RETURN n").expect("parse failed");
    assert!(!stmt.writes());
}
