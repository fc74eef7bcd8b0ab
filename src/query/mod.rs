//! Query Module
//!
//! A small predicate language evaluated against the rows of one table.
//!
//! ## Syntax
//! ```text
//! predicates := clause ( ',' clause )*
//! clause     := column op literal | column WS literal     // '=' inferred
//! op         := '<' | '>' | '='
//! ```
//!
//! ## Semantics
//! - All clauses must hold (AND)
//! - `<` and `>` compare integers only; strings support `=` only
//! - A clause naming an unknown column never matches

mod predicate;
mod eval;

pub use predicate::{parse_predicates, Operator, Predicate};
pub use eval::{check_against_schema, evaluate, run_query, QueryResult};
