//! End-to-end tests for aggregation: grouping, the aggregate functions,
//! DISTINCT aggregates, and empty-input behavior.

use graphforge::{Graph, Value};

fn seed_people(graph: &Graph<graphforge::MemoryStore>) {
    for (name, city, age) in [
        ("Ada", "London", 36),
        ("Bob", "London", 30),
        ("Cyd", "Oslo", 28),
        ("Dan", "Oslo", 40),
        ("Eve", "Oslo", 28),
    ] {
        graph
            .execute(&format!(
                "CREATE (:Person {{name: '{name}', city: '{city}', age: {age}}})"
            ))
            .unwrap();
    }
}

// ============================================================================
// 1. count
// ============================================================================

#[test]
fn test_count_star_vs_count_expr() {
    let graph = Graph::open_memory();
    graph.execute("CREATE (:P {v: 1})").unwrap();
    graph.execute("CREATE (:P)").unwrap();

    let result = graph
        .execute("MATCH (n:P) RETURN count(*) AS rows, count(n.v) AS vals")
        .unwrap();
    // count(*) counts rows regardless of NULL; count(expr) skips NULLs.
    assert_eq!(result.rows[0].get::<i64>("rows").unwrap(), 2);
    assert_eq!(result.rows[0].get::<i64>("vals").unwrap(), 1);
}

#[test]
fn test_aggregate_on_empty_input() {
    let graph = Graph::open_memory();

    let result = graph
        .execute("MATCH (n:Nope) RETURN count(n) AS c, avg(n.age) AS a")
        .unwrap();
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].get::<i64>("c").unwrap(), 0);
    assert_eq!(result.rows[0].get_value("a"), Some(&Value::Null));
}

// ============================================================================
// 2. Grouping
// ============================================================================

#[test]
fn test_group_by_city() {
    let graph = Graph::open_memory();
    seed_people(&graph);

    let result = graph
        .execute("MATCH (n:Person) RETURN n.city AS city, count(*) AS c ORDER BY city")
        .unwrap();
    assert_eq!(result.rows.len(), 2);
    assert_eq!(result.rows[0].get::<String>("city").unwrap(), "London");
    assert_eq!(result.rows[0].get::<i64>("c").unwrap(), 2);
    assert_eq!(result.rows[1].get::<String>("city").unwrap(), "Oslo");
    assert_eq!(result.rows[1].get::<i64>("c").unwrap(), 3);
}

#[test]
fn test_null_groups_together() {
    let graph = Graph::open_memory();
    graph.execute("CREATE (:P {k: 'a'})").unwrap();
    graph.execute("CREATE (:P)").unwrap();
    graph.execute("CREATE (:P)").unwrap();

    // NULL equals NULL for grouping purposes only.
    let result = graph
        .execute("MATCH (n:P) RETURN n.k AS k, count(*) AS c ORDER BY c")
        .unwrap();
    assert_eq!(result.rows.len(), 2);
    assert_eq!(result.rows[1].get_value("k"), Some(&Value::Null));
    assert_eq!(result.rows[1].get::<i64>("c").unwrap(), 2);
}

#[test]
fn test_order_by_aggregate_alias() {
    let graph = Graph::open_memory();
    seed_people(&graph);

    let result = graph
        .execute("MATCH (n:Person) RETURN n.city AS city, count(*) AS c ORDER BY c DESC")
        .unwrap();
    assert_eq!(result.rows[0].get::<String>("city").unwrap(), "Oslo");
}

// ============================================================================
// 3. The aggregate functions
// ============================================================================

#[test]
fn test_sum_avg_min_max() {
    let graph = Graph::open_memory();
    seed_people(&graph);

    let result = graph
        .execute(
            "MATCH (n:Person) \
             RETURN sum(n.age) AS s, avg(n.age) AS a, min(n.age) AS lo, max(n.age) AS hi",
        )
        .unwrap();
    assert_eq!(result.rows[0].get::<i64>("s").unwrap(), 162);
    assert_eq!(result.rows[0].get::<f64>("a").unwrap(), 32.4);
    assert_eq!(result.rows[0].get::<i64>("lo").unwrap(), 28);
    assert_eq!(result.rows[0].get::<i64>("hi").unwrap(), 40);
}

#[test]
fn test_collect() {
    let graph = Graph::open_memory();
    seed_people(&graph);

    let result = graph
        .execute(
            "MATCH (n:Person) WHERE n.city = 'London' \
             WITH n ORDER BY n.name RETURN collect(n.name) AS names",
        )
        .unwrap();
    let names: Vec<Value> = result.rows[0].get("names").unwrap();
    assert_eq!(names, vec![Value::from("Ada"), Value::from("Bob")]);
}

#[test]
fn test_collect_skips_nulls() {
    let graph = Graph::open_memory();
    graph.execute("CREATE (:P {v: 1})").unwrap();
    graph.execute("CREATE (:P)").unwrap();

    let result = graph.execute("MATCH (n:P) RETURN collect(n.v) AS vs").unwrap();
    let values: Vec<Value> = result.rows[0].get("vs").unwrap();
    assert_eq!(values, vec![Value::Int(1)]);
}

#[test]
fn test_distinct_aggregates() {
    let graph = Graph::open_memory();
    seed_people(&graph);

    let result = graph
        .execute(
            "MATCH (n:Person) \
             RETURN count(DISTINCT n.city) AS cities, count(DISTINCT n.age) AS ages",
        )
        .unwrap();
    assert_eq!(result.rows[0].get::<i64>("cities").unwrap(), 2);
    // Ages 36, 30, 28, 40 (28 repeats).
    assert_eq!(result.rows[0].get::<i64>("ages").unwrap(), 4);
}

#[test]
fn test_standard_deviations() {
    let graph = Graph::open_memory();
    for v in [2, 4, 4, 4, 5, 5, 7, 9] {
        graph.execute(&format!("CREATE (:S {{v: {v}}})")).unwrap();
    }

    let result = graph
        .execute("MATCH (n:S) RETURN stDev(n.v) AS sample, stDevP(n.v) AS population")
        .unwrap();
    let sample: f64 = result.rows[0].get("sample").unwrap();
    let population: f64 = result.rows[0].get("population").unwrap();
    assert!((population - 2.0).abs() < 1e-9);
    assert!(sample > population);
}

#[test]
fn test_percentiles() {
    let graph = Graph::open_memory();
    for v in [10, 20, 30, 40] {
        graph.execute(&format!("CREATE (:S {{v: {v}}})")).unwrap();
    }

    let result = graph
        .execute(
            "MATCH (n:S) \
             RETURN percentileDisc(n.v, 0.5) AS disc, percentileCont(n.v, 0.5) AS cont",
        )
        .unwrap();
    assert_eq!(result.rows[0].get::<i64>("disc").unwrap(), 20);
    assert_eq!(result.rows[0].get::<f64>("cont").unwrap(), 25.0);
}

#[test]
fn test_percentile_out_of_range_is_error() {
    let graph = Graph::open_memory();
    graph.execute("CREATE (:S {v: 1})").unwrap();
    assert!(matches!(
        graph.execute("MATCH (n:S) RETURN percentileDisc(n.v, 1.5) AS p"),
        Err(graphforge::Error::Value(_))
    ));
}

// ============================================================================
// 4. Aggregates combined with expressions
// ============================================================================

#[test]
fn test_aggregate_inside_expression() {
    let graph = Graph::open_memory();
    seed_people(&graph);

    let result = graph
        .execute("MATCH (n:Person) RETURN count(*) + 1 AS extra")
        .unwrap();
    assert_eq!(result.rows[0].get::<i64>("extra").unwrap(), 6);
}

#[test]
fn test_aggregate_in_where_is_plan_error() {
    let graph = Graph::open_memory();
    assert!(matches!(
        graph.execute("MATCH (n) WHERE count(n) > 1 RETURN n"),
        Err(graphforge::Error::Plan(_))
    ));
}

#[test]
fn test_aggregate_in_with_feeds_filter() {
    let graph = Graph::open_memory();
    seed_people(&graph);

    let result = graph
        .execute(
            "MATCH (n:Person) WITH n.city AS city, count(*) AS c \
             WHERE c > 2 RETURN city",
        )
        .unwrap();
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].get::<String>("city").unwrap(), "Oslo");
}
