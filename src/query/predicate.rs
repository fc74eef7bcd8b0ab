//! Predicate parsing
//!
//! Turns `col>10, name = Bloor Danforth` into a list of predicates.

use std::fmt;

use crate::error::{KvError, Result};
use crate::protocol::contains_reserved;
use crate::store::is_valid_name;

/// Comparison operator of a predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Lt,
    Gt,
    Eq,
}

impl Operator {
    pub fn as_char(self) -> char {
        match self {
            Operator::Lt => '<',
            Operator::Gt => '>',
            Operator::Eq => '=',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '<' => Some(Operator::Lt),
            '>' => Some(Operator::Gt),
            '=' => Some(Operator::Eq),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A single `column operator literal` comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub column: String,
    pub op: Operator,

    /// Literal exactly as written; integer-ness is decided per comparison
    pub literal: String,
}

impl Predicate {
    /// Build a predicate, enforcing the operator/literal rules
    pub fn new(column: impl Into<String>, op: Operator, literal: impl Into<String>) -> Result<Self> {
        let predicate = Self {
            column: column.into(),
            op,
            literal: literal.into(),
        };
        predicate.check()?;
        Ok(predicate)
    }

    /// The literal as an integer, if it is one
    pub fn integer_literal(&self) -> Option<i64> {
        parse_integer(&self.literal)
    }

    /// Column must be a valid name, literal non-empty and free of
    /// delimiters, and ordering operators need an integer literal.
    pub fn check(&self) -> Result<()> {
        if !is_valid_name(&self.column) {
            return Err(KvError::InvalidPredicate(format!(
                "column '{}' must contain only letters and digits",
                self.column
            )));
        }
        if self.literal.is_empty() {
            return Err(KvError::InvalidPredicate(format!(
                "missing value for column '{}'",
                self.column
            )));
        }
        if contains_reserved(&self.literal) {
            return Err(KvError::InvalidPredicate(format!(
                "value '{}' contains a reserved character",
                self.literal
            )));
        }
        if self.op != Operator::Eq && self.integer_literal().is_none() {
            return Err(KvError::InvalidPredicate(format!(
                "'{}' only supports '=' with non-integer value '{}'",
                self.op, self.literal
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.column, self.op, self.literal)
    }
}

/// Optional leading '-' followed by ASCII digits only
fn parse_integer(text: &str) -> Option<i64> {
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Parse a comma-separated predicate list
///
/// Each clause is `<column><op><literal>` with optional whitespace around
/// the operator. A clause without an operator is split at its first
/// whitespace and `=` is inferred. Empty input yields no predicates.
pub fn parse_predicates(text: &str) -> Result<Vec<Predicate>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    text.split(',').map(parse_clause).collect()
}

fn parse_clause(clause: &str) -> Result<Predicate> {
    let clause = clause.trim();
    if clause.is_empty() {
        return Err(KvError::InvalidPredicate("empty clause".to_string()));
    }

    let (column, op, literal) = match clause.find(|c| matches!(c, '<' | '>' | '=')) {
        Some(pos) => {
            let op = clause[pos..]
                .chars()
                .next()
                .and_then(Operator::from_char)
                .unwrap_or(Operator::Eq);
            (&clause[..pos], op, &clause[pos + 1..])
        }
        None => match clause.split_once(char::is_whitespace) {
            Some((column, literal)) => (column, Operator::Eq, literal),
            None => {
                return Err(KvError::InvalidPredicate(format!(
                    "clause '{}' has no operator",
                    clause
                )))
            }
        },
    };

    let column = column.trim();
    if column.is_empty() {
        return Err(KvError::InvalidPredicate(format!(
            "clause '{}' has no column",
            clause
        )));
    }

    Predicate::new(column, op, literal.trim())
}
