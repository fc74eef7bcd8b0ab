//! Tests for Engine
//!
//! These tests verify:
//! - Create / modify / delete semantics of SET
//! - Version counter rules
//! - Schema enforcement never mutating rows
//! - Concurrent access patterns

use std::sync::{Arc, Barrier};
use std::thread;

use tablekv::config::Config;
use tablekv::engine::Engine;
use tablekv::error::KvError;
use tablekv::store::{ColumnDef, ColumnValue, SetOutcome, SetRequest, TableSchema, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_engine() -> Engine {
    Engine::new(vec![
        TableSchema::new("marks", vec![ColumnDef::integer("grade")]),
        TableSchema::new(
            "census",
            vec![
                ColumnDef::string("city", Some(10)),
                ColumnDef::integer("pop"),
            ],
        ),
    ])
    .unwrap()
}

fn grade(n: i64) -> Vec<ColumnValue> {
    vec![ColumnValue::new("grade", Value::Int(n))]
}

fn upsert(values: Vec<ColumnValue>, expected_counter: u64) -> SetRequest {
    SetRequest::Upsert {
        values,
        expected_counter,
    }
}

// =============================================================================
// Construction Tests
// =============================================================================

#[test]
fn test_open_from_config() {
    let config = Config::builder()
        .credentials("admin", "xxsecret")
        .table(TableSchema::new("b", vec![ColumnDef::integer("n")]))
        .table(TableSchema::new("a", vec![ColumnDef::integer("n")]))
        .build();

    let engine = Engine::open(&config).unwrap();
    assert_eq!(engine.table_names(), vec!["a", "b"]);
    assert_eq!(engine.row_count("a").unwrap(), 0);
}

#[test]
fn test_duplicate_table_rejected() {
    let result = Engine::new(vec![
        TableSchema::new("t", vec![ColumnDef::integer("n")]),
        TableSchema::new("t", vec![ColumnDef::integer("m")]),
    ]);
    assert!(matches!(result, Err(KvError::Config(_))));
}

// =============================================================================
// SET Semantics Tests
// =============================================================================

#[test]
fn test_create_starts_at_counter_one() {
    let engine = setup_engine();

    let outcome = engine.set("marks", "alice", &upsert(grade(90), 0)).unwrap();
    assert_eq!(outcome, SetOutcome::Created { counter: 1 });

    let row = engine.lookup("marks", "alice").unwrap();
    assert_eq!(row.counter, 1);
    assert_eq!(row.values, vec![Value::Int(90)]);
}

#[test]
fn test_counter_ignored_on_create() {
    let engine = setup_engine();
    let outcome = engine.set("marks", "bob", &upsert(grade(70), 42)).unwrap();
    assert_eq!(outcome, SetOutcome::Created { counter: 1 });
}

#[test]
fn test_modify_increments_counter() {
    let engine = setup_engine();
    engine.set("marks", "alice", &upsert(grade(90), 0)).unwrap();

    // Unconditional
    assert_eq!(
        engine.set("marks", "alice", &upsert(grade(91), 0)).unwrap(),
        SetOutcome::Modified { counter: 2 }
    );
    // Conditional on the current counter
    assert_eq!(
        engine.set("marks", "alice", &upsert(grade(92), 2)).unwrap(),
        SetOutcome::Modified { counter: 3 }
    );

    assert_eq!(engine.lookup("marks", "alice").unwrap().values, vec![Value::Int(92)]);
}

#[test]
fn test_stale_counter_rejected_and_row_unchanged() {
    let engine = setup_engine();
    engine.set("marks", "alice", &upsert(grade(90), 0)).unwrap();
    engine.set("marks", "alice", &upsert(grade(91), 0)).unwrap();

    let result = engine.set("marks", "alice", &upsert(grade(0), 1));
    assert!(matches!(
        result,
        Err(KvError::VersionConflict {
            expected: 1,
            actual: 2
        })
    ));

    let row = engine.lookup("marks", "alice").unwrap();
    assert_eq!(row.counter, 2);
    assert_eq!(row.values, vec![Value::Int(91)]);
}

#[test]
fn test_counter_checked_before_schema() {
    let engine = setup_engine();
    engine.set("marks", "alice", &upsert(grade(90), 0)).unwrap();

    let bad_values = vec![ColumnValue::new("grade", Value::Str("A".to_string()))];
    assert!(matches!(
        engine.set("marks", "alice", &upsert(bad_values.clone(), 5)),
        Err(KvError::VersionConflict { .. })
    ));
    assert!(matches!(
        engine.set("marks", "alice", &upsert(bad_values, 1)),
        Err(KvError::SchemaMismatch(_))
    ));
}

#[test]
fn test_schema_mismatch_never_mutates() {
    let engine = setup_engine();
    engine
        .set(
            "census",
            "ajax",
            &upsert(
                vec![
                    ColumnValue::new("city", Value::Str("Ajax".to_string())),
                    ColumnValue::new("pop", Value::Int(120_000)),
                ],
                0,
            ),
        )
        .unwrap();

    let bad_requests = vec![
        // Too few columns
        vec![ColumnValue::new("city", Value::Str("Ajax".to_string()))],
        // Wrong order
        vec![
            ColumnValue::new("pop", Value::Int(1)),
            ColumnValue::new("city", Value::Str("Ajax".to_string())),
        ],
        // Wrong kind
        vec![
            ColumnValue::new("city", Value::Int(7)),
            ColumnValue::new("pop", Value::Int(1)),
        ],
        // Too long for char[10]
        vec![
            ColumnValue::new("city", Value::Str("Scarborough".to_string())),
            ColumnValue::new("pop", Value::Int(1)),
        ],
    ];

    for values in bad_requests {
        assert!(matches!(
            engine.set("census", "ajax", &upsert(values.clone(), 0)),
            Err(KvError::SchemaMismatch(_))
        ));
        assert!(matches!(
            engine.set("census", "oshawa", &upsert(values, 0)),
            Err(KvError::SchemaMismatch(_))
        ));
    }

    let row = engine.lookup("census", "ajax").unwrap();
    assert_eq!(row.counter, 1);
    assert_eq!(
        row.values,
        vec![Value::Str("Ajax".to_string()), Value::Int(120_000)]
    );
    assert!(matches!(
        engine.lookup("census", "oshawa"),
        Err(KvError::KeyNotFound(_))
    ));
}

#[test]
fn test_delete_semantics() {
    let engine = setup_engine();

    assert!(matches!(
        engine.set("marks", "ghost", &SetRequest::Delete),
        Err(KvError::KeyNotFound(_))
    ));

    engine.set("marks", "alice", &upsert(grade(90), 0)).unwrap();
    engine.set("marks", "alice", &upsert(grade(95), 0)).unwrap();
    assert_eq!(
        engine.set("marks", "alice", &SetRequest::Delete).unwrap(),
        SetOutcome::Deleted
    );
    assert!(matches!(
        engine.lookup("marks", "alice"),
        Err(KvError::KeyNotFound(_))
    ));

    // Re-creating starts a fresh version history
    assert_eq!(
        engine.set("marks", "alice", &upsert(grade(50), 0)).unwrap(),
        SetOutcome::Created { counter: 1 }
    );
}

#[test]
fn test_unknown_table() {
    let engine = setup_engine();
    assert!(matches!(
        engine.lookup("nosuch", "k"),
        Err(KvError::NoSuchTable(_))
    ));
    assert!(matches!(
        engine.set("nosuch", "k", &SetRequest::Delete),
        Err(KvError::NoSuchTable(_))
    ));
    assert!(matches!(
        engine.query("nosuch", &[], 10),
        Err(KvError::NoSuchTable(_))
    ));
}

#[test]
fn test_insert_and_modify_helpers() {
    let engine = setup_engine();
    engine.insert("marks", "carol", &grade(60)).unwrap();
    assert!(matches!(
        engine.insert("marks", "carol", &grade(61)),
        Err(KvError::KeyExists(_))
    ));

    assert_eq!(engine.modify("marks", "carol", &grade(62), 1).unwrap(), 2);
    assert!(matches!(
        engine.modify("marks", "dave", &grade(1), 0),
        Err(KvError::KeyNotFound(_))
    ));

    engine.delete("marks", "carol").unwrap();
    assert_eq!(engine.row_count("marks").unwrap(), 0);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_stale_modify_exactly_one_wins() {
    let engine = Arc::new(setup_engine());
    engine.set("marks", "alice", &upsert(grade(90), 0)).unwrap();

    let writers = 8;
    let barrier = Arc::new(Barrier::new(writers));
    let handles: Vec<_> = (0..writers)
        .map(|i| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                engine.set("marks", "alice", &upsert(grade(i as i64), 1))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(KvError::VersionConflict { .. })))
        .count();

    assert_eq!(winners, 1);
    assert_eq!(conflicts, writers - 1);
    assert_eq!(engine.lookup("marks", "alice").unwrap().counter, 2);
}

#[test]
fn test_concurrent_creates_of_distinct_keys() {
    let engine = Arc::new(setup_engine());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..50 {
                    let key = format!("k{}x{}", t, i);
                    engine.set("marks", &key, &upsert(grade(i), 0)).unwrap();
                    let _ = engine.query("marks", &[], 5).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(engine.row_count("marks").unwrap(), 200);
}
