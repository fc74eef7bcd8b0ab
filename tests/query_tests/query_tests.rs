//! Query Tests
//!
//! Tests verify:
//! - Predicate matching over integer and string columns
//! - Creation-order results and the max_keys cap
//! - Type errors failing the whole query

use tablekv::engine::Engine;
use tablekv::error::KvError;
use tablekv::query::{parse_predicates, Operator, Predicate};
use tablekv::store::{ColumnDef, ColumnValue, SetRequest, TableSchema, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_engine() -> Engine {
    Engine::new(vec![TableSchema::new(
        "stations",
        vec![
            ColumnDef::string("line", Some(20)),
            ColumnDef::integer("col"),
        ],
    )])
    .unwrap()
}

fn put(engine: &Engine, key: &str, line: &str, col: i64) {
    engine
        .set(
            "stations",
            key,
            &SetRequest::Upsert {
                values: vec![
                    ColumnValue::new("line", Value::Str(line.to_string())),
                    ColumnValue::new("col", Value::Int(col)),
                ],
                expected_counter: 0,
            },
        )
        .unwrap();
}

fn query(engine: &Engine, text: &str, max_keys: usize) -> tablekv::Result<(Vec<String>, usize)> {
    let predicates = parse_predicates(text)?;
    engine
        .query("stations", &predicates, max_keys)
        .map(|r| (r.keys, r.total))
}

fn setup_with_rows() -> Engine {
    let engine = setup_engine();
    put(&engine, "a", "Yonge University", 5);
    put(&engine, "b", "Bloor Danforth", 15);
    put(&engine, "c", "Bloor Danforth", 20);
    engine
}

// =============================================================================
// Matching Tests
// =============================================================================

#[test]
fn test_greater_than() {
    let engine = setup_with_rows();
    let (keys, total) = query(&engine, "col>10", 10).unwrap();
    assert_eq!(keys, vec!["b", "c"]);
    assert_eq!(total, 2);
}

#[test]
fn test_less_than_and_equality() {
    let engine = setup_with_rows();
    assert_eq!(query(&engine, "col < 15", 10).unwrap().0, vec!["a"]);
    assert_eq!(query(&engine, "col = 20", 10).unwrap().0, vec!["c"]);
    assert_eq!(query(&engine, "col=-1", 10).unwrap().1, 0);
}

#[test]
fn test_string_equality_with_spaces() {
    let engine = setup_with_rows();
    let (keys, _) = query(&engine, "line = Bloor Danforth", 10).unwrap();
    assert_eq!(keys, vec!["b", "c"]);

    let (keys, _) = query(&engine, "line Bloor Danforth, col > 16", 10).unwrap();
    assert_eq!(keys, vec!["c"]);
}

#[test]
fn test_empty_predicates_match_all() {
    let engine = setup_with_rows();
    let (keys, total) = query(&engine, "", 10).unwrap();
    assert_eq!(keys, vec!["a", "b", "c"]);
    assert_eq!(total, 3);
}

#[test]
fn test_unknown_column_matches_nothing() {
    let engine = setup_with_rows();
    let (keys, total) = query(&engine, "depth > 1", 10).unwrap();
    assert!(keys.is_empty());
    assert_eq!(total, 0);
}

#[test]
fn test_max_keys_caps_list_but_not_total() {
    let engine = setup_with_rows();
    let (keys, total) = query(&engine, "col > 0", 2).unwrap();
    assert_eq!(keys, vec!["a", "b"]);
    assert_eq!(total, 3);

    let (keys, total) = query(&engine, "col > 0", 0).unwrap();
    assert!(keys.is_empty());
    assert_eq!(total, 3);
}

#[test]
fn test_results_follow_creation_order() {
    let engine = setup_with_rows();

    // Modifying keeps position; delete + create moves to the end
    put(&engine, "a", "Yonge University", 30);
    engine.set("stations", "b", &SetRequest::Delete).unwrap();
    put(&engine, "b", "Sheppard", 40);

    let (keys, _) = query(&engine, "col > 10", 10).unwrap();
    assert_eq!(keys, vec!["a", "c", "b"]);
}

// =============================================================================
// Error Tests
// =============================================================================

#[test]
fn test_ordering_on_string_column_fails() {
    let engine = setup_with_rows();
    let predicates = vec![Predicate::new("line", Operator::Lt, "5").unwrap()];
    assert!(matches!(
        engine.query("stations", &predicates, 10),
        Err(KvError::QueryType(_))
    ));

    // Even with nothing to scan
    let empty = setup_engine();
    assert!(matches!(
        empty.query("stations", &predicates, 10),
        Err(KvError::QueryType(_))
    ));
}

#[test]
fn test_malformed_predicate_fails() {
    let engine = setup_with_rows();
    let predicates = vec![Predicate {
        column: "col".to_string(),
        op: Operator::Gt,
        literal: "ten".to_string(),
    }];
    assert!(matches!(
        engine.query("stations", &predicates, 10),
        Err(KvError::InvalidPredicate(_))
    ));
}
