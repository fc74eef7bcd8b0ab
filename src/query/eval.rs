//! Predicate evaluation
//!
//! Matches rows of one table against a conjunction of predicates.

use crate::error::{KvError, Result};
use crate::store::{ColumnKind, Row, Table, TableSchema, Value};
use super::{Operator, Predicate};

/// Keys found by a query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    /// Matching keys in creation order, at most `max_keys`
    pub keys: Vec<String>,

    /// Number of matching rows, even beyond `max_keys`
    pub total: usize,
}

impl QueryResult {
    /// True if more rows matched than were returned
    pub fn is_truncated(&self) -> bool {
        self.total > self.keys.len()
    }
}

/// Reject predicates whose operator cannot apply to their column's kind
///
/// Unknown columns pass: they simply never match.
pub fn check_against_schema(predicates: &[Predicate], schema: &TableSchema) -> Result<()> {
    for predicate in predicates {
        predicate.check()?;
        if let Some((_, column)) = schema.column(&predicate.column) {
            if column.kind == ColumnKind::String && predicate.op != Operator::Eq {
                return Err(KvError::QueryType(format!(
                    "operator '{}' cannot be applied to string column '{}'",
                    predicate.op, column.name
                )));
            }
        }
    }
    Ok(())
}

/// True if `row` satisfies every predicate
pub fn evaluate(predicates: &[Predicate], schema: &TableSchema, row: &Row) -> Result<bool> {
    for predicate in predicates {
        if !evaluate_one(predicate, schema, row)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn evaluate_one(predicate: &Predicate, schema: &TableSchema, row: &Row) -> Result<bool> {
    let value = match schema
        .column(&predicate.column)
        .and_then(|(idx, _)| row.values.get(idx))
    {
        Some(value) => value,
        None => return Ok(false),
    };

    match value {
        Value::Str(text) => match predicate.op {
            Operator::Eq => Ok(*text == predicate.literal),
            op => Err(KvError::QueryType(format!(
                "operator '{}' cannot be applied to string column '{}'",
                op, predicate.column
            ))),
        },
        Value::Int(n) => match (predicate.op, predicate.integer_literal()) {
            (Operator::Eq, Some(lit)) => Ok(*n == lit),
            (Operator::Eq, None) => Ok(false),
            (Operator::Lt, Some(lit)) => Ok(*n < lit),
            (Operator::Gt, Some(lit)) => Ok(*n > lit),
            (op, None) => Err(KvError::QueryType(format!(
                "operator '{}' needs an integer value, got '{}'",
                op, predicate.literal
            ))),
        },
    }
}

/// Scan `table` in creation order and collect matching keys
///
/// The predicates are checked against the schema before scanning, so a
/// type/operator mismatch fails the whole query even on an empty table.
pub fn run_query(table: &Table, predicates: &[Predicate], max_keys: usize) -> Result<QueryResult> {
    let schema = table.schema();
    check_against_schema(predicates, schema)?;

    let mut result = QueryResult::default();
    table.scan(|row| {
        if evaluate(predicates, schema, row)? {
            result.total += 1;
            if result.keys.len() < max_keys {
                result.keys.push(row.key.clone());
            }
        }
        Ok(())
    })?;

    tracing::trace!(
        "query on '{}' matched {} rows ({} returned)",
        table.name(),
        result.total,
        result.keys.len()
    );
    Ok(result)
}
