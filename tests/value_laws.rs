//! Property-based tests for the value system's quantified laws: equality
//! reflexivity, NULL propagation, round-trip identities, and the path
//! shape invariant.

use graphforge::{Graph, Truth, Value};
use proptest::prelude::*;

/// Scalar values of the comparable kinds (no NULL, no containers).
fn scalar_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        // Finite floats only: NaN breaks reflexivity by design.
        (-1.0e12..1.0e12f64).prop_map(Value::Float),
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::from),
    ]
}

proptest! {
    // For every value v of a scalar kind: v = v is true and v = NULL is
    // NULL.
    #[test]
    fn equality_is_reflexive_and_null_contagious(v in scalar_value()) {
        prop_assert_eq!(v.equals(&v), Truth::True);
        prop_assert_eq!(v.equals(&Value::Null), Truth::Unknown);
        prop_assert_eq!(Value::Null.equals(&v), Truth::Unknown);
    }

    // Replacing either operand of a comparison with NULL yields NULL.
    #[test]
    fn comparison_with_null_is_null(v in scalar_value()) {
        prop_assert!(v.compare(&Value::Null).is_none());
        prop_assert!(Value::Null.compare(&v).is_none());
    }

    // reverse(reverse(L)) = L for any list L.
    #[test]
    fn reverse_is_an_involution(values in prop::collection::vec(scalar_value(), 0..8)) {
        let list = Value::List(values);
        let graph = Graph::open_memory();
        let mut params = graphforge::PropertyMap::new();
        params.insert("l".into(), list.clone());
        let result = graph
            .execute_with("RETURN reverse(reverse($l)) AS out", params)
            .unwrap();
        prop_assert!(result.rows[0].get_value("out").unwrap().same_value(&list));
    }

    // toInteger(toString(i)) = i for any integer.
    #[test]
    fn integer_stringification_round_trips(i in any::<i64>()) {
        let graph = Graph::open_memory();
        let mut params = graphforge::PropertyMap::new();
        params.insert("i".into(), Value::Int(i));
        let result = graph
            .execute_with("RETURN toInteger(toString($i)) AS out", params)
            .unwrap();
        prop_assert_eq!(result.rows[0].get_value("out"), Some(&Value::Int(i)));
    }

    // coalesce(NULL, x) = x and coalesce(x, ...) = x for non-NULL x.
    #[test]
    fn coalesce_laws(v in scalar_value()) {
        let graph = Graph::open_memory();
        let mut params = graphforge::PropertyMap::new();
        params.insert("v".into(), v.clone());
        let result = graph
            .execute_with("RETURN coalesce(null, $v) AS a, coalesce($v, 'other') AS b", params)
            .unwrap();
        prop_assert!(result.rows[0].get_value("a").unwrap().same_value(&v));
        prop_assert!(result.rows[0].get_value("b").unwrap().same_value(&v));
    }

    // Arithmetic with a NULL operand yields NULL.
    #[test]
    fn arithmetic_null_propagation(i in -1000i64..1000) {
        let graph = Graph::open_memory();
        let mut params = graphforge::PropertyMap::new();
        params.insert("i".into(), Value::Int(i));
        let result = graph
            .execute_with(
                "RETURN $i + null AS a, $i * null AS b, $i - null AS c, $i / null AS d",
                params,
            )
            .unwrap();
        for column in ["a", "b", "c", "d"] {
            prop_assert_eq!(result.rows[0].get_value(column), Some(&Value::Null));
        }
    }
}

// ============================================================================
// Path shape invariant over generated chains
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    // Every path produced by a variable-length match satisfies
    // length(p) = size(nodes(p)) - 1 = size(relationships(p)).
    #[test]
    fn produced_paths_keep_the_shape_invariant(chain_len in 1usize..5) {
        let graph = Graph::open_memory();
        graph.execute("CREATE (:N {i: 0})").unwrap();
        for i in 1..=chain_len {
            graph.execute(&format!("CREATE (:N {{i: {i}}})")).unwrap();
            graph
                .execute(&format!(
                    "MATCH (a:N {{i: {}}}), (b:N {{i: {i}}}) CREATE (a)-[:NEXT]->(b)",
                    i - 1
                ))
                .unwrap();
        }

        let result = graph
            .execute(
                "MATCH p = (:N {i: 0})-[:NEXT*1..6]->(:N) \
                 RETURN length(p) AS len, size(nodes(p)) AS n, size(relationships(p)) AS r",
            )
            .unwrap();
        prop_assert_eq!(result.rows.len(), chain_len);
        for row in &result.rows {
            let len: i64 = row.get("len").unwrap();
            let n: i64 = row.get("n").unwrap();
            let r: i64 = row.get("r").unwrap();
            prop_assert_eq!(len, n - 1);
            prop_assert_eq!(len, r);
        }
    }
}
