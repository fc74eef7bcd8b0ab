//! Codec Tests
//!
//! Tests for command and response encoding/decoding.

use tablekv::error::KvError;
use tablekv::protocol::{
    Command, CommandKind, FailReason, Record, Response,
    encode_command, decode_command,
    encode_response, decode_response,
};
use tablekv::query::{Operator, Predicate, QueryResult};
use tablekv::store::{ColumnValue, SetOutcome, SetRequest, Value};

fn upsert(values: Vec<ColumnValue>, expected_counter: u64) -> SetRequest {
    SetRequest::Upsert {
        values,
        expected_counter,
    }
}

// =============================================================================
// Command Encoding Tests
// =============================================================================

#[test]
fn test_encode_auth() {
    let cmd = Command::Auth {
        username: "admin".to_string(),
        password: "xxabc=".to_string(),
    };
    assert_eq!(encode_command(&cmd).unwrap(), "&AUTH&^admin^*xxabc=*?");
}

#[test]
fn test_encode_set_values() {
    let cmd = Command::Set {
        table: "census".to_string(),
        key: "ajax".to_string(),
        request: upsert(
            vec![
                ColumnValue::new("city", Value::Str("Ajax Town".to_string())),
                ColumnValue::new("pop", Value::Int(-5)),
            ],
            0,
        ),
    };
    assert_eq!(
        encode_command(&cmd).unwrap(),
        "&SET&^census^*ajax*@city@$Ajax Town$!@pop@#-5#!?"
    );
}

#[test]
fn test_encode_set_with_counter_and_delete() {
    let modify = Command::Set {
        table: "marks".to_string(),
        key: "alice".to_string(),
        request: upsert(vec![ColumnValue::new("grade", Value::Int(95))], 3),
    };
    assert_eq!(
        encode_command(&modify).unwrap(),
        "&SET&^marks^*alice*@grade@#95#!?~3~"
    );

    let delete = Command::Set {
        table: "marks".to_string(),
        key: "alice".to_string(),
        request: SetRequest::Delete,
    };
    assert_eq!(encode_command(&delete).unwrap(), "&SET&^marks^*alice*@NULL@?");
}

#[test]
fn test_encode_query() {
    let cmd = Command::Query {
        table: "census".to_string(),
        max_keys: 5,
        predicates: vec![
            Predicate::new("pop", Operator::Gt, "10").unwrap(),
            Predicate::new("city", Operator::Eq, "Ajax").unwrap(),
        ],
    };
    assert_eq!(
        encode_command(&cmd).unwrap(),
        "&QUERY&^census^#5#@pop@&>&$10$!@city@&=&$Ajax$!"
    );
}

#[test]
fn test_encode_rejects_reserved_characters() {
    let cmd = Command::Set {
        table: "t".to_string(),
        key: "k".to_string(),
        request: upsert(vec![ColumnValue::new("c", Value::Str("a$b".to_string()))], 0),
    };
    assert!(matches!(encode_command(&cmd), Err(KvError::Validation(_))));

    let cmd = Command::Get {
        table: "t".to_string(),
        key: "k?".to_string(),
    };
    assert!(matches!(encode_command(&cmd), Err(KvError::Validation(_))));
}

// =============================================================================
// Command Decoding Tests
// =============================================================================

#[test]
fn test_decode_get_with_and_without_terminator() {
    let expected = Command::Get {
        table: "marks".to_string(),
        key: "alice".to_string(),
    };
    assert_eq!(decode_command("&GET&^marks^*alice*?").unwrap(), expected);
    assert_eq!(decode_command("&GET&^marks^*alice*").unwrap(), expected);
    assert_eq!(decode_command("&GET&^marks^*alice*?\r\n").unwrap(), expected);
}

#[test]
fn test_decode_set_counter_defaults_to_zero() {
    let cmd = decode_command("&SET&^marks^*alice*@grade@#90#!?").unwrap();
    assert_eq!(
        cmd,
        Command::Set {
            table: "marks".to_string(),
            key: "alice".to_string(),
            request: upsert(vec![ColumnValue::new("grade", Value::Int(90))], 0),
        }
    );
}

#[test]
fn test_decode_set_with_counter() {
    let cmd = decode_command("&SET&^marks^*alice*@grade@#90#!?~7~").unwrap();
    match cmd {
        Command::Set {
            request: SetRequest::Upsert { expected_counter, .. },
            ..
        } => assert_eq!(expected_counter, 7),
        other => panic!("Expected SET upsert, got {:?}", other),
    }
}

#[test]
fn test_decode_delete() {
    let cmd = decode_command("&SET&^marks^*alice*@NULL@?").unwrap();
    match cmd {
        Command::Set { request, .. } => assert_eq!(request, SetRequest::Delete),
        other => panic!("Expected SET, got {:?}", other),
    }
}

#[test]
fn test_decode_query_keeps_bad_literals_for_the_engine() {
    // An ordering operator with a text literal is a query failure, not a framing error
    let cmd = decode_command("&QUERY&^census^#3#@pop@&<&$many$!").unwrap();
    match cmd {
        Command::Query {
            table,
            max_keys,
            predicates,
        } => {
            assert_eq!(table, "census");
            assert_eq!(max_keys, 3);
            assert_eq!(predicates.len(), 1);
            assert_eq!(predicates[0].op, Operator::Lt);
            assert!(predicates[0].check().is_err());
        }
        other => panic!("Expected QUERY, got {:?}", other),
    }
}

#[test]
fn test_decode_query_without_predicates() {
    let cmd = decode_command("&QUERY&^census^#10#").unwrap();
    assert_eq!(
        cmd,
        Command::Query {
            table: "census".to_string(),
            max_keys: 10,
            predicates: Vec::new(),
        }
    );
}

#[test]
fn test_decode_protocol_errors() {
    let bad = [
        "",
        "GET marks alice",
        "&FETCH&^marks^*alice*?",
        "&GET&^marks^",
        "&GET&^marks^*alice",
        "&GET&^marks^*alice*?junk",
        "&GET&^marks^*alice*??",
        "&SET&^marks^*alice*@grade@#ninety#!?",
        "&SET&^marks^*alice*@grade@#90#?",
        "&SET&^marks^*alice*@grade@#90#!",
        "&SET&^marks^*alice*@grade@#90#!?~-1~",
        "&QUERY&^census^#x#",
        "&QUERY&^census^#1#@pop@&>=&$1$!",
        "&QUERY&^census^#1#@pop@&>&$1$",
    ];
    for line in bad {
        assert!(
            matches!(decode_command(line), Err(KvError::Protocol(_))),
            "expected protocol error for {:?}",
            line
        );
    }
}

#[test]
fn test_command_round_trip() {
    let commands = vec![
        Command::Auth {
            username: "admin".to_string(),
            password: "xxQn1+/=".to_string(),
        },
        Command::Set {
            table: "census".to_string(),
            key: "toronto".to_string(),
            request: upsert(
                vec![
                    ColumnValue::new("city", Value::Str("Toronto, ON".to_string())),
                    ColumnValue::new("pop", Value::Int(2_731_571)),
                ],
                12,
            ),
        },
        Command::Query {
            table: "census".to_string(),
            max_keys: 0,
            predicates: vec![Predicate::new("pop", Operator::Lt, "-3").unwrap()],
        },
    ];

    for cmd in commands {
        let line = encode_command(&cmd).unwrap();
        assert_eq!(decode_command(&line).unwrap(), cmd, "line: {}", line);
    }
}

// =============================================================================
// Response Tests
// =============================================================================

#[test]
fn test_encode_responses() {
    assert_eq!(encode_response(&Response::AuthOk).unwrap(), "AUTH SUCCESS");
    assert_eq!(
        encode_response(&Response::Set(SetOutcome::Created { counter: 1 })).unwrap(),
        "SET SUCCESS CREATE COUNTER 1"
    );
    assert_eq!(
        encode_response(&Response::Set(SetOutcome::Deleted)).unwrap(),
        "SET SUCCESS DELETE"
    );
    assert_eq!(
        encode_response(&Response::fail(CommandKind::Set, FailReason::Counter)).unwrap(),
        "SET FAIL COUNTER"
    );
    assert_eq!(
        encode_response(&Response::fail(CommandKind::Query, FailReason::Table)).unwrap(),
        "&QUERY&$FAIL$^TABLE^"
    );
    assert_eq!(
        encode_response(&Response::Query(QueryResult {
            keys: vec!["a".to_string(), "b".to_string()],
            total: 5,
        }))
        .unwrap(),
        "&QUERY&$SUCCESS$#5#@a@!@b@!"
    );
}

#[test]
fn test_record_response_round_trip() {
    let response = Response::Record(Record {
        values: vec![
            ColumnValue::new("city", Value::Str("Bloor Danforth COUNTER 9".to_string())),
            ColumnValue::new("pop", Value::Int(42)),
        ],
        counter: 3,
    });

    let line = encode_response(&response).unwrap();
    assert_eq!(
        line,
        "GET SUCCESS @city@$Bloor Danforth COUNTER 9$!@pop@#42#!? COUNTER 3"
    );
    assert_eq!(decode_response(&line).unwrap(), response);
}

#[test]
fn test_decode_fail_responses() {
    for reason in [
        FailReason::Auth,
        FailReason::Table,
        FailReason::Key,
        FailReason::Column,
        FailReason::Counter,
        FailReason::Invalid,
        FailReason::Predicate,
    ] {
        for kind in [CommandKind::Auth, CommandKind::Get, CommandKind::Set, CommandKind::Query] {
            let response = Response::fail(kind, reason);
            let line = encode_response(&response).unwrap();
            assert_eq!(decode_response(&line).unwrap(), response, "line: {}", line);
        }
    }
}

#[test]
fn test_decode_unknown_responses() {
    for line in ["OK", "GET SUCCESS", "SET SUCCESS UPSERT", "GET FAIL NOPE", "&QUERY&$MAYBE$"] {
        assert!(
            matches!(decode_response(line), Err(KvError::Protocol(_))),
            "expected protocol error for {:?}",
            line
        );
    }
}
