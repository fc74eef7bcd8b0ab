//! Store Module
//!
//! In-memory rows for every configured table.
//!
//! ## Responsibilities
//! - Keep rows keyed by a unique row key
//! - Enforce the table schema on every write
//! - Track per-row version counters for optimistic concurrency
//! - Preserve creation order for queries
//!
//! ## Data Structure Choice
//! HashMap from key to row plus a BTreeMap insertion-order index,
//! both behind one RwLock per table:
//! - O(1) lookup/insert/delete by key
//! - Creation-order iteration for QUERY

mod schema;
mod table;

pub use schema::{is_valid_name, validate_name, ColumnDef, ColumnKind, TableSchema};
pub use table::{Table, TableRows};

use std::fmt;

/// A stored column value; its kind is fixed by the schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
    Int(i64),
}

impl Value {
    pub fn kind(&self) -> ColumnKind {
        match self {
            Value::Str(_) => ColumnKind::String,
            Value::Int(_) => ColumnKind::Integer,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{}", s),
            Value::Int(i) => write!(f, "{}", i),
        }
    }
}

/// A value tagged with its column name, as carried on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnValue {
    pub name: String,
    pub value: Value,
}

impl ColumnValue {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// One keyed record of a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub key: String,

    /// Version counter: 1 on creation, +1 per modification
    pub counter: u64,

    /// Values in schema order
    pub values: Vec<Value>,
}

/// Payload of a SET command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetRequest {
    /// The `@NULL@` sentinel
    Delete,

    /// Create or modify; `expected_counter == 0` means unconditional
    Upsert {
        values: Vec<ColumnValue>,
        expected_counter: u64,
    },
}

/// Successful result of a SET
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    Created { counter: u64 },
    Modified { counter: u64 },
    Deleted,
}
