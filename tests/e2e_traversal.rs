//! End-to-end tests for pattern traversal: expansions in every direction,
//! OPTIONAL MATCH, variable-length paths, and path bindings.

use graphforge::{Graph, PathValue, Value};

fn seed_friends(graph: &Graph<graphforge::MemoryStore>) {
    graph.execute("CREATE (:Person {name: 'Ada'})").unwrap();
    graph.execute("CREATE (:Person {name: 'Bob'})").unwrap();
    graph.execute("CREATE (:Person {name: 'Cyd'})").unwrap();
    graph
        .execute(
            "MATCH (a:Person {name: 'Ada'}), (b:Person {name: 'Bob'}) \
             CREATE (a)-[:KNOWS {since: 2019}]->(b)",
        )
        .unwrap();
    graph
        .execute(
            "MATCH (b:Person {name: 'Bob'}), (c:Person {name: 'Cyd'}) \
             CREATE (b)-[:KNOWS {since: 2021}]->(c)",
        )
        .unwrap();
}

fn column(result: &graphforge::QueryResult, name: &str) -> Vec<String> {
    result
        .rows
        .iter()
        .map(|row| row.get::<String>(name).unwrap())
        .collect()
}

// ============================================================================
// 1. Directed expansion
// ============================================================================

#[test]
fn test_outgoing_expansion() {
    let graph = Graph::open_memory();
    seed_friends(&graph);

    let result = graph
        .execute("MATCH (a:Person {name: 'Ada'})-[:KNOWS]->(b) RETURN b.name")
        .unwrap();
    assert_eq!(column(&result, "b.name"), vec!["Bob"]);
}

#[test]
fn test_incoming_expansion() {
    let graph = Graph::open_memory();
    seed_friends(&graph);

    let result = graph
        .execute("MATCH (b:Person {name: 'Bob'})<-[:KNOWS]-(a) RETURN a.name")
        .unwrap();
    assert_eq!(column(&result, "a.name"), vec!["Ada"]);
}

#[test]
fn test_undirected_expansion() {
    let graph = Graph::open_memory();
    seed_friends(&graph);

    let result = graph
        .execute("MATCH (b:Person {name: 'Bob'})-[:KNOWS]-(x) RETURN x.name ORDER BY x.name")
        .unwrap();
    assert_eq!(column(&result, "x.name"), vec!["Ada", "Cyd"]);
}

#[test]
fn test_edge_variable_and_properties() {
    let graph = Graph::open_memory();
    seed_friends(&graph);

    let result = graph
        .execute("MATCH (:Person {name: 'Ada'})-[r:KNOWS]->(b) RETURN r.since, b.name")
        .unwrap();
    assert_eq!(result.rows[0].get::<i64>("r.since").unwrap(), 2019);
}

#[test]
fn test_edge_inline_property_filter() {
    let graph = Graph::open_memory();
    seed_friends(&graph);

    let result = graph
        .execute("MATCH (a)-[:KNOWS {since: 2021}]->(b) RETURN a.name, b.name")
        .unwrap();
    assert_eq!(column(&result, "a.name"), vec!["Bob"]);
    assert_eq!(column(&result, "b.name"), vec!["Cyd"]);
}

#[test]
fn test_two_hop_chain() {
    let graph = Graph::open_memory();
    seed_friends(&graph);

    let result = graph
        .execute("MATCH (a:Person)-[:KNOWS]->()-[:KNOWS]->(c) RETURN a.name, c.name")
        .unwrap();
    assert_eq!(column(&result, "a.name"), vec!["Ada"]);
    assert_eq!(column(&result, "c.name"), vec!["Cyd"]);
}

#[test]
fn test_type_alternation() {
    let graph = Graph::open_memory();
    graph.execute("CREATE (:A {id: 1})").unwrap();
    graph.execute("CREATE (:A {id: 2})").unwrap();
    graph.execute("CREATE (:A {id: 3})").unwrap();
    graph
        .execute("MATCH (a:A {id: 1}), (b:A {id: 2}) CREATE (a)-[:LIKES]->(b)")
        .unwrap();
    graph
        .execute("MATCH (a:A {id: 1}), (b:A {id: 3}) CREATE (a)-[:HATES]->(b)")
        .unwrap();

    let result = graph
        .execute("MATCH (a:A {id: 1})-[:LIKES|HATES]->(x) RETURN x.id ORDER BY x.id")
        .unwrap();
    let ids: Vec<i64> = result.rows.iter().map(|r| r.get("x.id").unwrap()).collect();
    assert_eq!(ids, vec![2, 3]);
}

// ============================================================================
// 2. OPTIONAL MATCH preserves rows
// ============================================================================

#[test]
fn test_optional_match_preserves_rows() {
    let graph = Graph::open_memory();
    graph.execute("CREATE (:Person {name: 'Alice'})").unwrap();

    let result = graph
        .execute("MATCH (p:Person) OPTIONAL MATCH (p)-[:KNOWS]->(f) RETURN p.name, f")
        .unwrap();
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].get::<String>("p.name").unwrap(), "Alice");
    assert_eq!(result.rows[0].get_value("f"), Some(&Value::Null));
}

#[test]
fn test_optional_match_mixed() {
    let graph = Graph::open_memory();
    seed_friends(&graph);

    let result = graph
        .execute(
            "MATCH (p:Person) OPTIONAL MATCH (p)-[:KNOWS]->(f) \
             RETURN p.name, f.name ORDER BY p.name",
        )
        .unwrap();
    assert_eq!(result.rows.len(), 3);
    // Cyd has no outgoing KNOWS; property access on NULL yields NULL.
    assert_eq!(result.rows[2].get::<String>("p.name").unwrap(), "Cyd");
    assert_eq!(result.rows[2].get_value("f.name"), Some(&Value::Null));
}

#[test]
fn test_optional_scan_on_empty_store() {
    let graph = Graph::open_memory();
    graph.execute("CREATE (:Anchor)").unwrap();

    let result = graph
        .execute("MATCH (a:Anchor) OPTIONAL MATCH (m:Missing) RETURN a, m")
        .unwrap();
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].get_value("m"), Some(&Value::Null));
}

// ============================================================================
// 3. Variable-length paths
// ============================================================================

#[test]
fn test_variable_length_range() {
    let graph = Graph::open_memory();
    seed_friends(&graph);

    let result = graph
        .execute(
            "MATCH (a:Person {name: 'Ada'})-[:KNOWS*1..2]->(x) \
             RETURN x.name ORDER BY x.name",
        )
        .unwrap();
    assert_eq!(column(&result, "x.name"), vec!["Bob", "Cyd"]);
}

#[test]
fn test_variable_length_zero_hops_includes_source() {
    let graph = Graph::open_memory();
    seed_friends(&graph);

    let result = graph
        .execute(
            "MATCH (a:Person {name: 'Ada'})-[:KNOWS*0..1]->(x) \
             RETURN x.name ORDER BY x.name",
        )
        .unwrap();
    assert_eq!(column(&result, "x.name"), vec!["Ada", "Bob"]);
}

// Edge-uniqueness forbids revisiting an edge within a path, but the same
// destination may be reached along different paths.
#[test]
fn test_variable_length_edge_uniqueness_on_triangle() {
    let graph = Graph::open_memory();
    for id in ["A", "B", "C"] {
        graph.execute(&format!("CREATE (:N {{id: '{id}'}})")).unwrap();
    }
    for (src, dst) in [("A", "B"), ("B", "C"), ("C", "A")] {
        graph
            .execute(&format!(
                "MATCH (s:N {{id: '{src}'}}), (d:N {{id: '{dst}'}}) CREATE (s)-[:R]->(d)"
            ))
            .unwrap();
    }

    let result = graph
        .execute("MATCH (a {id: 'A'})-[:R*1..3]-(x) RETURN x.id ORDER BY x.id")
        .unwrap();
    assert_eq!(column(&result, "x.id"), vec!["A", "A", "B", "B", "C", "C"]);
}

#[test]
fn test_variable_length_binds_edge_list() {
    let graph = Graph::open_memory();
    seed_friends(&graph);

    let result = graph
        .execute("MATCH (:Person {name: 'Ada'})-[rs:KNOWS*2]->(x) RETURN rs, x.name")
        .unwrap();
    assert_eq!(result.rows.len(), 1);
    let edges: Vec<Value> = result.rows[0].get("rs").unwrap();
    assert_eq!(edges.len(), 2);
}

// ============================================================================
// 4. Path bindings and path functions
// ============================================================================

#[test]
fn test_path_binding_fixed_length() {
    let graph = Graph::open_memory();
    seed_friends(&graph);

    let result = graph
        .execute("MATCH p = (:Person {name: 'Ada'})-[:KNOWS]->(b) RETURN p")
        .unwrap();
    assert_eq!(result.rows.len(), 1);
    let path: PathValue = result.rows[0].get("p").unwrap();
    assert_eq!(path.len(), 1);
    assert_eq!(path.nodes().len(), 2);
}

#[test]
fn test_path_functions() {
    let graph = Graph::open_memory();
    seed_friends(&graph);

    let result = graph
        .execute(
            "MATCH p = (:Person {name: 'Ada'})-[:KNOWS*2]->(:Person) \
             RETURN length(p) AS len, size(nodes(p)) AS n, size(relationships(p)) AS r",
        )
        .unwrap();
    assert_eq!(result.rows[0].get::<i64>("len").unwrap(), 2);
    assert_eq!(result.rows[0].get::<i64>("n").unwrap(), 3);
    assert_eq!(result.rows[0].get::<i64>("r").unwrap(), 2);
}

// The path invariant: length(p) = size(nodes(p)) - 1 = size(relationships(p)),
// and every adjacent triple is incident.
#[test]
fn test_path_invariant_holds_for_all_produced_paths() {
    let graph = Graph::open_memory();
    seed_friends(&graph);

    let result = graph
        .execute("MATCH p = (:Person {name: 'Ada'})-[:KNOWS*1..2]->(x) RETURN p")
        .unwrap();
    assert!(!result.rows.is_empty());
    for row in &result.rows {
        let path: PathValue = row.get("p").unwrap();
        assert_eq!(path.len(), path.nodes().len() - 1);
        assert_eq!(path.len(), path.edges().len());
        for (from, edge, to) in path.triples() {
            let incident = (edge.src == from.id && edge.dst == to.id)
                || (edge.src == to.id && edge.dst == from.id);
            assert!(incident);
        }
    }
}

// ============================================================================
// 5. Joins on bound variables
// ============================================================================

#[test]
fn test_cycle_pattern_joins_on_bound_variable() {
    let graph = Graph::open_memory();
    graph.execute("CREATE (:N {id: 1})").unwrap();
    graph.execute("CREATE (:N {id: 2})").unwrap();
    graph
        .execute("MATCH (a:N {id: 1}), (b:N {id: 2}) CREATE (a)-[:R]->(b)")
        .unwrap();
    graph
        .execute("MATCH (a:N {id: 2}), (b:N {id: 1}) CREATE (a)-[:R]->(b)")
        .unwrap();

    // (a)-[r1]->(b)-[r2]->(a) closes the cycle on the bound `a`.
    let result = graph
        .execute("MATCH (a:N {id: 1})-[r1:R]->(b)-[r2:R]->(a) RETURN b.id")
        .unwrap();
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].get::<i64>("b.id").unwrap(), 2);
}

#[test]
fn test_cartesian_product_of_disconnected_patterns() {
    let graph = Graph::open_memory();
    graph.execute("CREATE (:X {i: 1})").unwrap();
    graph.execute("CREATE (:X {i: 2})").unwrap();
    graph.execute("CREATE (:Y {j: 10})").unwrap();

    let result = graph
        .execute("MATCH (x:X), (y:Y) RETURN x.i, y.j ORDER BY x.i")
        .unwrap();
    assert_eq!(result.rows.len(), 2);
}
