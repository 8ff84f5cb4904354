//! End-to-end tests for MERGE: match-or-create semantics, idempotence,
//! ON CREATE SET / ON MATCH SET, and the NULL-property rule.

use graphforge::{Graph, Value};

fn count_nodes(graph: &Graph<graphforge::MemoryStore>, query: &str) -> i64 {
    graph.execute(query).unwrap().rows[0].get("c").unwrap()
}

// ============================================================================
// 1. Create-on-miss, match-on-hit
// ============================================================================

#[test]
fn test_merge_creates_when_missing() {
    let graph = Graph::open_memory();

    let result = graph.execute("MERGE (n:Person {name: 'Ada'}) RETURN n.name").unwrap();
    assert_eq!(result.stats.nodes_created, 1);
    assert_eq!(result.rows[0].get::<String>("n.name").unwrap(), "Ada");
}

#[test]
fn test_merge_is_idempotent() {
    let graph = Graph::open_memory();

    graph.execute("MERGE (:Person {name: 'Ada'})").unwrap();
    let second = graph.execute("MERGE (:Person {name: 'Ada'})").unwrap();
    assert_eq!(second.stats.nodes_created, 0);

    assert_eq!(
        count_nodes(&graph, "MATCH (n:Person {name: 'Ada'}) RETURN count(n) AS c"),
        1
    );
}

// The post-condition: after any MERGE, the pattern matches in the store.
#[test]
fn test_merge_postcondition() {
    let graph = Graph::open_memory();
    graph.execute("MERGE (:City {name: 'Oslo', country: 'NO'})").unwrap();

    let found = graph
        .execute("MATCH (c:City {name: 'Oslo', country: 'NO'}) RETURN c")
        .unwrap();
    assert_eq!(found.rows.len(), 1);
}

#[test]
fn test_merge_matches_only_exact_properties() {
    let graph = Graph::open_memory();
    graph.execute("CREATE (:Person {name: 'Ada', age: 36})").unwrap();

    // The pattern {name: 'Ada'} matches the existing node.
    let result = graph.execute("MERGE (n:Person {name: 'Ada'}) RETURN n").unwrap();
    assert_eq!(result.stats.nodes_created, 0);

    // A different value creates a second node.
    graph.execute("MERGE (:Person {name: 'Ada', age: 99})").unwrap();
    assert_eq!(
        count_nodes(&graph, "MATCH (n:Person {name: 'Ada'}) RETURN count(n) AS c"),
        2
    );
}

// ============================================================================
// 2. NULL in a MERGE pattern never matches, so it always creates
// ============================================================================

#[test]
fn test_merge_on_null_property_creates_second_node() {
    let graph = Graph::open_memory();
    graph.execute("CREATE (:Person {name: 'Alice', age: null})").unwrap();

    graph.execute("MERGE (:Person {name: 'Alice', age: null})").unwrap();

    assert_eq!(
        count_nodes(&graph, "MATCH (n:Person {name: 'Alice'}) RETURN count(n) AS c"),
        2
    );
}

// ============================================================================
// 3. ON CREATE SET / ON MATCH SET
// ============================================================================

#[test]
fn test_merge_on_create_set() {
    let graph = Graph::open_memory();

    let result = graph
        .execute(
            "MERGE (n:Person {name: 'Ada'}) \
             ON CREATE SET n.created = true \
             ON MATCH SET n.matched = true \
             RETURN n.created, n.matched",
        )
        .unwrap();
    assert_eq!(result.rows[0].get::<bool>("n.created").unwrap(), true);
    assert_eq!(result.rows[0].get_value("n.matched"), Some(&Value::Null));
}

#[test]
fn test_merge_on_match_set() {
    let graph = Graph::open_memory();
    graph.execute("CREATE (:Person {name: 'Ada'})").unwrap();

    let result = graph
        .execute(
            "MERGE (n:Person {name: 'Ada'}) \
             ON CREATE SET n.created = true \
             ON MATCH SET n.matched = true \
             RETURN n.created, n.matched",
        )
        .unwrap();
    assert_eq!(result.rows[0].get_value("n.created"), Some(&Value::Null));
    assert_eq!(result.rows[0].get::<bool>("n.matched").unwrap(), true);
}

// ============================================================================
// 4. MERGE with bound endpoints
// ============================================================================

#[test]
fn test_merge_edge_between_bound_nodes() {
    let graph = Graph::open_memory();
    graph.execute("CREATE (:Person {name: 'Ada'})").unwrap();
    graph.execute("CREATE (:Person {name: 'Bob'})").unwrap();

    let merge = "MATCH (a:Person {name: 'Ada'}), (b:Person {name: 'Bob'}) \
                 MERGE (a)-[:KNOWS]->(b)";
    let first = graph.execute(merge).unwrap();
    assert_eq!(first.stats.edges_created, 1);

    // Re-running is a no-op for the edge count.
    let second = graph.execute(merge).unwrap();
    assert_eq!(second.stats.edges_created, 0);
    assert_eq!(
        count_nodes(&graph, "MATCH ()-[r:KNOWS]->() RETURN count(r) AS c"),
        1
    );
}

#[test]
fn test_merge_emits_every_match() {
    let graph = Graph::open_memory();
    graph.execute("CREATE (:Tag {kind: 'x'})").unwrap();
    graph.execute("CREATE (:Tag {kind: 'x'})").unwrap();

    // Both existing nodes match; MERGE emits one row per match.
    let result = graph.execute("MERGE (t:Tag {kind: 'x'}) RETURN t").unwrap();
    assert_eq!(result.rows.len(), 2);
    assert_eq!(result.stats.nodes_created, 0);
}

#[test]
fn test_merge_after_with_per_row() {
    let graph = Graph::open_memory();
    graph.execute("CREATE (:Person {name: 'Ada'})").unwrap();
    graph.execute("CREATE (:Person {name: 'Bob'})").unwrap();

    // One merged city, linked from both people.
    graph
        .execute("MATCH (p:Person) MERGE (c:City {name: 'Oslo'}) MERGE (p)-[:LIVES_IN]->(c)")
        .unwrap();

    assert_eq!(count_nodes(&graph, "MATCH (c:City) RETURN count(c) AS c"), 1);
    assert_eq!(
        count_nodes(&graph, "MATCH ()-[r:LIVES_IN]->() RETURN count(r) AS c"),
        2
    );
}
