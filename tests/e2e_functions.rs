//! End-to-end tests for expression semantics: three-valued logic, NULL
//! propagation, coercions, built-in functions, comprehensions, quantifiers
//! and CASE.

use graphforge::{Graph, Value};

fn single(graph: &Graph<graphforge::MemoryStore>, query: &str) -> graphforge::ResultRow {
    let result = graph.execute(query).unwrap();
    assert_eq!(result.rows.len(), 1, "expected one row from {query}");
    result.rows[0].clone()
}

// ============================================================================
// 1. Three-valued logic
// ============================================================================

#[test]
fn test_three_valued_and() {
    let graph = Graph::open_memory();
    let row = single(
        &graph,
        "RETURN true AND null AS x, false AND null AS y, null AND null AS z",
    );
    assert_eq!(row.get_value("x"), Some(&Value::Null));
    assert_eq!(row.get_value("y"), Some(&Value::Bool(false)));
    assert_eq!(row.get_value("z"), Some(&Value::Null));
}

#[test]
fn test_three_valued_or() {
    let graph = Graph::open_memory();
    let row = single(
        &graph,
        "RETURN true OR null AS x, false OR null AS y, null OR null AS z",
    );
    assert_eq!(row.get_value("x"), Some(&Value::Bool(true)));
    assert_eq!(row.get_value("y"), Some(&Value::Null));
    assert_eq!(row.get_value("z"), Some(&Value::Null));
}

#[test]
fn test_not_null_is_null() {
    let graph = Graph::open_memory();
    let row = single(&graph, "RETURN NOT null AS x");
    assert_eq!(row.get_value("x"), Some(&Value::Null));
}

#[test]
fn test_null_comparison_is_null() {
    let graph = Graph::open_memory();
    let row = single(
        &graph,
        "RETURN null = null AS eq, null <> 1 AS ne, 1 < null AS lt",
    );
    assert_eq!(row.get_value("eq"), Some(&Value::Null));
    assert_eq!(row.get_value("ne"), Some(&Value::Null));
    assert_eq!(row.get_value("lt"), Some(&Value::Null));
}

#[test]
fn test_null_filtered_out() {
    let graph = Graph::open_memory();
    graph.execute("CREATE (:P {age: 30})").unwrap();
    graph.execute("CREATE (:P)").unwrap();

    // NULL and false are both filtered; only true passes.
    let result = graph.execute("MATCH (n:P) WHERE n.age > 10 RETURN n").unwrap();
    assert_eq!(result.rows.len(), 1);
}

// ============================================================================
// 2. Arithmetic and coercions
// ============================================================================

#[test]
fn test_mixed_arithmetic_promotes_to_float() {
    let graph = Graph::open_memory();
    let row = single(&graph, "RETURN 1 + 2 AS i, 1 + 2.5 AS f, 2 * 3 AS m");
    assert_eq!(row.get_value("i"), Some(&Value::Int(3)));
    assert_eq!(row.get_value("f"), Some(&Value::Float(3.5)));
    assert_eq!(row.get_value("m"), Some(&Value::Int(6)));
}

#[test]
fn test_division_always_float() {
    let graph = Graph::open_memory();
    let row = single(&graph, "RETURN 6 / 3 AS d");
    assert_eq!(row.get_value("d"), Some(&Value::Float(2.0)));
}

#[test]
fn test_division_by_zero_is_null() {
    let graph = Graph::open_memory();
    let row = single(&graph, "RETURN 1 / 0 AS d, 1 % 0 AS m, 1.0 / 0.0 AS f");
    assert_eq!(row.get_value("d"), Some(&Value::Null));
    assert_eq!(row.get_value("m"), Some(&Value::Null));
    assert_eq!(row.get_value("f"), Some(&Value::Null));
}

#[test]
fn test_string_concatenation_coerces() {
    let graph = Graph::open_memory();
    let row = single(&graph, "RETURN 'v' + 1 AS a, 1 + 'v' AS b, 'a' + 'b' AS c");
    assert_eq!(row.get_value("a"), Some(&Value::from("v1")));
    assert_eq!(row.get_value("b"), Some(&Value::from("1v")));
    assert_eq!(row.get_value("c"), Some(&Value::from("ab")));
}

#[test]
fn test_arithmetic_with_null_is_null() {
    let graph = Graph::open_memory();
    let row = single(&graph, "RETURN 1 + null AS a, null * 2 AS b, -null AS c");
    assert_eq!(row.get_value("a"), Some(&Value::Null));
    assert_eq!(row.get_value("b"), Some(&Value::Null));
    assert_eq!(row.get_value("c"), Some(&Value::Null));
}

// ============================================================================
// 3. IN and list operations
// ============================================================================

#[test]
fn test_in_list() {
    let graph = Graph::open_memory();
    let row = single(
        &graph,
        "RETURN 2 IN [1, 2, 3] AS yes, 5 IN [1, 2, 3] AS no, 5 IN [] AS empty",
    );
    assert_eq!(row.get_value("yes"), Some(&Value::Bool(true)));
    assert_eq!(row.get_value("no"), Some(&Value::Bool(false)));
    assert_eq!(row.get_value("empty"), Some(&Value::Bool(false)));
}

#[test]
fn test_in_with_null_element_and_no_match_is_null() {
    let graph = Graph::open_memory();
    let row = single(
        &graph,
        "RETURN 5 IN [1, null, 3] AS open, 1 IN [1, null] AS found",
    );
    assert_eq!(row.get_value("open"), Some(&Value::Null));
    assert_eq!(row.get_value("found"), Some(&Value::Bool(true)));
}

#[test]
fn test_list_index_and_slice() {
    let graph = Graph::open_memory();
    let row = single(
        &graph,
        "RETURN [10, 20, 30][0] AS first, [10, 20, 30][-1] AS last, \
         [10, 20, 30][9] AS oob, [10, 20, 30][0..2] AS slice",
    );
    assert_eq!(row.get_value("first"), Some(&Value::Int(10)));
    assert_eq!(row.get_value("last"), Some(&Value::Int(30)));
    assert_eq!(row.get_value("oob"), Some(&Value::Null));
    assert_eq!(
        row.get_value("slice"),
        Some(&Value::List(vec![Value::Int(10), Value::Int(20)]))
    );
}

#[test]
fn test_list_comprehension() {
    let graph = Graph::open_memory();
    let row = single(
        &graph,
        "RETURN [x IN [1, 2, 3, 4] WHERE x % 2 = 0 | x * 10] AS l",
    );
    assert_eq!(
        row.get_value("l"),
        Some(&Value::List(vec![Value::Int(20), Value::Int(40)]))
    );
}

#[test]
fn test_reverse_round_trip() {
    let graph = Graph::open_memory();
    let row = single(&graph, "RETURN reverse(reverse([1, 2, 3])) AS l");
    assert_eq!(
        row.get_value("l"),
        Some(&Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]))
    );
}

// ============================================================================
// 4. Quantifiers
// ============================================================================

#[test]
fn test_quantifiers() {
    let graph = Graph::open_memory();
    let row = single(
        &graph,
        "RETURN all(x IN [1, 2] WHERE x > 0) AS a, \
                any(x IN [1, 2] WHERE x > 1) AS b, \
                none(x IN [1, 2] WHERE x > 5) AS c, \
                single(x IN [1, 2] WHERE x = 1) AS d",
    );
    assert_eq!(row.get_value("a"), Some(&Value::Bool(true)));
    assert_eq!(row.get_value("b"), Some(&Value::Bool(true)));
    assert_eq!(row.get_value("c"), Some(&Value::Bool(true)));
    assert_eq!(row.get_value("d"), Some(&Value::Bool(true)));
}

#[test]
fn test_quantifiers_follow_three_valued_logic() {
    let graph = Graph::open_memory();
    // all() with one NULL verdict and no false: the answer stays open.
    let row = single(
        &graph,
        "RETURN all(x IN [1, null] WHERE x > 0) AS open, \
                all(x IN [1, -1] WHERE x > 0) AS closed",
    );
    assert_eq!(row.get_value("open"), Some(&Value::Null));
    assert_eq!(row.get_value("closed"), Some(&Value::Bool(false)));
}

// ============================================================================
// 5. Scalar functions and conversion laws
// ============================================================================

#[test]
fn test_coalesce_laws() {
    let graph = Graph::open_memory();
    let row = single(
        &graph,
        "RETURN coalesce(null, 7) AS a, coalesce(3, 9) AS b, coalesce(null, null) AS c",
    );
    assert_eq!(row.get_value("a"), Some(&Value::Int(7)));
    assert_eq!(row.get_value("b"), Some(&Value::Int(3)));
    assert_eq!(row.get_value("c"), Some(&Value::Null));
}

#[test]
fn test_conversion_round_trips() {
    let graph = Graph::open_memory();
    let row = single(
        &graph,
        "RETURN toString(toInteger('42')) AS s, toInteger(toString(42)) AS i",
    );
    assert_eq!(row.get_value("s"), Some(&Value::from("42")));
    assert_eq!(row.get_value("i"), Some(&Value::Int(42)));
}

#[test]
fn test_graph_introspection_functions() {
    let graph = Graph::open_memory();
    graph.execute("CREATE (:Person {name: 'Ada'})-[:KNOWS {w: 1}]->(:Person)").unwrap();

    let row = single(
        &graph,
        "MATCH (a:Person {name: 'Ada'})-[r:KNOWS]->() \
         RETURN labels(a) AS ls, type(r) AS t, keys(a) AS ks, properties(r) AS ps",
    );
    assert_eq!(
        row.get_value("ls"),
        Some(&Value::List(vec![Value::from("Person")]))
    );
    assert_eq!(row.get_value("t"), Some(&Value::from("KNOWS")));
    assert_eq!(
        row.get_value("ks"),
        Some(&Value::List(vec![Value::from("name")]))
    );
    let Some(Value::Map(props)) = row.get_value("ps") else {
        panic!("expected map of properties");
    };
    assert_eq!(props.get("w"), Some(&Value::Int(1)));
}

#[test]
fn test_string_matching_operators() {
    let graph = Graph::open_memory();
    let row = single(
        &graph,
        "RETURN 'graph' STARTS WITH 'gr' AS s, 'graph' ENDS WITH 'ph' AS e, \
                'graph' CONTAINS 'rap' AS c, null CONTAINS 'x' AS n",
    );
    assert_eq!(row.get_value("s"), Some(&Value::Bool(true)));
    assert_eq!(row.get_value("e"), Some(&Value::Bool(true)));
    assert_eq!(row.get_value("c"), Some(&Value::Bool(true)));
    assert_eq!(row.get_value("n"), Some(&Value::Null));
}

// ============================================================================
// 6. CASE
// ============================================================================

#[test]
fn test_searched_case() {
    let graph = Graph::open_memory();
    graph.execute("CREATE (:P {age: 7})").unwrap();
    graph.execute("CREATE (:P {age: 36})").unwrap();

    let result = graph
        .execute(
            "MATCH (n:P) \
             RETURN CASE WHEN n.age < 18 THEN 'minor' ELSE 'adult' END AS kind \
             ORDER BY kind",
        )
        .unwrap();
    let kinds: Vec<String> = result.rows.iter().map(|r| r.get("kind").unwrap()).collect();
    assert_eq!(kinds, vec!["adult", "minor"]);
}

#[test]
fn test_simple_case_with_default_null() {
    let graph = Graph::open_memory();
    let row = single(
        &graph,
        "RETURN CASE 2 WHEN 1 THEN 'one' WHEN 2 THEN 'two' END AS v, \
                CASE 9 WHEN 1 THEN 'one' END AS missing",
    );
    assert_eq!(row.get_value("v"), Some(&Value::from("two")));
    assert_eq!(row.get_value("missing"), Some(&Value::Null));
}

#[test]
fn test_searched_case_rejects_non_boolean_when() {
    let graph = Graph::open_memory();
    assert!(matches!(
        graph.execute("RETURN CASE WHEN 1 THEN 'x' END AS v"),
        Err(graphforge::Error::Type { .. })
    ));
}

// ============================================================================
// 7. Temporal and spatial
// ============================================================================

#[test]
fn test_temporal_values_in_queries() {
    let graph = Graph::open_memory();
    let row = single(
        &graph,
        "RETURN date('2024-02-29') AS d, year(date('2024-02-29')) AS y, \
                duration('P1DT2H') AS dur, hour(duration('P1DT2H')) AS h",
    );
    assert!(matches!(row.get_value("d"), Some(Value::Date(_))));
    assert_eq!(row.get_value("y"), Some(&Value::Int(2024)));
    assert!(matches!(row.get_value("dur"), Some(Value::Duration(_))));
    assert_eq!(row.get_value("h"), Some(&Value::Int(2)));
}

#[test]
fn test_temporal_component_via_property_access() {
    let graph = Graph::open_memory();
    let row = single(&graph, "RETURN date('2024-02-29').month AS m");
    assert_eq!(row.get_value("m"), Some(&Value::Int(2)));
}

#[test]
fn test_date_arithmetic() {
    let graph = Graph::open_memory();
    let row = single(&graph, "RETURN date('2024-02-28') + duration('P2D') AS d");
    let Some(Value::Date(d)) = row.get_value("d") else {
        panic!("expected a date");
    };
    assert_eq!(d.to_string(), "2024-03-01");
}

#[test]
fn test_bad_date_is_value_error() {
    let graph = Graph::open_memory();
    assert!(matches!(
        graph.execute("RETURN date('tomorrow') AS d"),
        Err(graphforge::Error::Value(_))
    ));
}

#[test]
fn test_point_and_distance_in_query() {
    let graph = Graph::open_memory();
    let row = single(
        &graph,
        "RETURN distance(point({x: 0, y: 0}), point({x: 3, y: 4})) AS d",
    );
    assert_eq!(row.get_value("d"), Some(&Value::Distance(5.0)));
}

#[test]
fn test_point_stored_as_property() {
    let graph = Graph::open_memory();
    graph
        .execute("CREATE (:Place {loc: point({longitude: 12.57, latitude: 55.68})})")
        .unwrap();

    let row = single(&graph, "MATCH (p:Place) RETURN p.loc.latitude AS lat");
    assert_eq!(row.get_value("lat"), Some(&Value::Float(55.68)));
}
